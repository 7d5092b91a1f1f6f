//! Client-side view state of one bingo session.
//!
//! All transitions go through [`SessionState::apply`], which is pure: it takes
//! the current state and an [`Event`] and returns the next state together with
//! the [`Effect`]s the caller has to perform (requests, poll control, notices).
//! Server replies are fed back as events, so a request that fails simply never
//! produces the transition its success reply would have caused.

use std::collections::BTreeSet;

use tracing::{
    debug,
    info,
};

use crate::{
    api::{
        BingoVerdict,
        CalledNumber,
        CreatedGame,
        GameId,
        GameStatus,
        UserId,
    },
    card::{
        BingoCard,
        MarkedCard,
    },
};

pub const BET_OPTIONS: [u64; 4] = [10, 50, 100, 200];
pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub game_id: Option<GameId>,
    pub selected_number: Option<u8>,
    pub current_bet: Option<u64>,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            game_id: None,
            selected_number: None,
            current_bet: None,
        }
    }

    /// Forgets the current game. The pick and the bet belong to the game and go
    /// with it.
    pub fn clear_game(&mut self) {
        self.game_id = None;
        self.selected_number = None;
        self.current_bet = None;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveGame {
    pub card: MarkedCard,
    pub status: Option<GameStatus>,
    pub last_call: Option<CalledNumber>,
}

impl ActiveGame {
    /// Every number called so far. Calls only grow, so the longer of the
    /// last poll and the player's own last call is the fresher one.
    pub fn called_numbers(&self) -> &[u8] {
        let polled = self
            .status
            .as_ref()
            .map(|s| s.numbers_called.as_slice())
            .unwrap_or_default();
        let called = self
            .last_call
            .as_ref()
            .map(|c| c.called_numbers.as_slice())
            .unwrap_or_default();
        if polled.len() >= called.len() { polled } else { called }
    }

    /// Numbers already taken by players, as of the last poll.
    pub fn inactive_numbers(&self) -> &[u8] {
        self.status
            .as_ref()
            .map(|s| s.selected_numbers.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    NoSession,
    BetSelection,
    NumberSelection {
        disabled: BTreeSet<u8>,
    },
    CardPreview {
        card: BingoCard,
        disabled: BTreeSet<u8>,
    },
    ActiveGame(ActiveGame),
    PostWin {
        bet_amount: Option<u64>,
        winner: Option<UserId>,
        summary: String,
    },
    Closed,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::NoSession => "no_session",
            Phase::BetSelection => "bet_selection",
            Phase::NumberSelection { .. } => "number_selection",
            Phase::CardPreview { .. } => "card_preview",
            Phase::ActiveGame(_) => "active_game",
            Phase::PostWin { .. } => "post_win",
            Phase::Closed => "closed",
        }
    }

    pub fn is_active_game(&self) -> bool {
        matches!(self, Phase::ActiveGame(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    OpenJoin,
    PickBet(u64),
    SelectNumber(u8),
    AcceptCard,
    CancelCard,
    CallNumber,
    CheckBingo,
    ToggleMark(usize),
    ContinuePlay,
    BackToBetSelection,
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    CreateGame { bet_amount: u64 },
    SelectNumber { game_id: GameId, number: u8 },
    AcceptCard { game_id: GameId },
    CallNumber { game_id: GameId },
    CheckBingo { game_id: GameId },
    GameStatus { game_id: GameId },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::CreateGame { .. } => "create_game",
            Request::SelectNumber { .. } => "select_number",
            Request::AcceptCard { .. } => "accept_card",
            Request::CallNumber { .. } => "call_number",
            Request::CheckBingo { .. } => "check_bingo",
            Request::GameStatus { .. } => "game_status",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// The server answered and refused.
    Rejected(String),
    /// No usable answer.
    Network(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    GameCreated(CreatedGame),
    NumberAccepted {
        game_id: GameId,
        number: u8,
        card: BingoCard,
    },
    CardAccepted {
        game_id: GameId,
        card: BingoCard,
    },
    NumberCalled {
        game_id: GameId,
        call: CalledNumber,
    },
    BingoChecked {
        game_id: GameId,
        verdict: BingoVerdict,
    },
    StatusPolled {
        game_id: GameId,
        status: GameStatus,
    },
    Failed {
        request: Request,
        failure: Failure,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Rejected,
    Network,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn rejected(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Rejected,
            text: text.into(),
        }
    }

    pub fn network(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Network,
            text: text.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Send(Request),
    StartPolling(GameId),
    StopPolling,
    Notice(Notice),
    CloseApp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Intent(Intent),
    Reply(Reply),
}

impl From<Intent> for Event {
    fn from(intent: Intent) -> Self {
        Event::Intent(intent)
    }
}

impl From<Reply> for Event {
    fn from(reply: Reply) -> Self {
        Event::Reply(reply)
    }
}

type Transition = (SessionState, Vec<Effect>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    session: Session,
    phase: Phase,
}

impl SessionState {
    pub fn new(user_id: UserId) -> Self {
        Self {
            session: Session::new(user_id),
            phase: Phase::NoSession,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn game_id(&self) -> Option<&GameId> {
        self.session.game_id.as_ref()
    }

    /// Number selection is shown but no game id has arrived yet.
    pub fn is_awaiting_game(&self) -> bool {
        matches!(self.phase, Phase::NumberSelection { .. }) && self.session.game_id.is_none()
    }

    pub fn apply(self, event: impl Into<Event>) -> Transition {
        let from = self.phase.name();
        let was_active = self.phase.is_active_game();
        let (next, mut effects) = match event.into() {
            Event::Intent(intent) => self.on_intent(intent),
            Event::Reply(reply) => self.on_reply(reply),
        };
        if was_active && !next.phase.is_active_game() && !effects.contains(&Effect::StopPolling)
        {
            effects.insert(0, Effect::StopPolling);
        }
        let to = next.phase.name();
        if from != to {
            info!(from, to, game_id = ?next.session.game_id, "session transition");
        }
        (next, effects)
    }

    fn unchanged(self) -> Transition {
        (self, Vec::new())
    }

    fn with(self, effects: Vec<Effect>) -> Transition {
        (self, effects)
    }

    fn on_intent(mut self, intent: Intent) -> Transition {
        if intent == Intent::Close {
            if self.phase == Phase::Closed {
                return self.unchanged();
            }
            self.session.clear_game();
            self.phase = Phase::Closed;
            return self.with(vec![Effect::CloseApp]);
        }

        let game_id = self.session.game_id.clone();
        match (&mut self.phase, intent) {
            (Phase::NoSession, Intent::OpenJoin) => {
                self.phase = Phase::BetSelection;
                self.unchanged()
            }
            (Phase::BetSelection, Intent::PickBet(0)) => {
                self.with(vec![Effect::Notice(Notice::rejected("Invalid bet amount"))])
            }
            (Phase::BetSelection, Intent::PickBet(bet_amount)) => {
                self.with(vec![Effect::Send(Request::CreateGame { bet_amount })])
            }
            (Phase::NumberSelection { disabled }, Intent::SelectNumber(number)) => {
                if !(MIN_NUMBER..=MAX_NUMBER).contains(&number) {
                    return self.with(vec![Effect::Notice(Notice::rejected(format!(
                        "Choose a number between {MIN_NUMBER} and {MAX_NUMBER}"
                    )))]);
                }
                if disabled.contains(&number) {
                    return self.unchanged();
                }
                match game_id {
                    Some(game_id) => self.with(vec![Effect::Send(Request::SelectNumber {
                        game_id,
                        number,
                    })]),
                    None => self.with(vec![Effect::Notice(Notice::info(
                        "Waiting for a new game...",
                    ))]),
                }
            }
            (Phase::CardPreview { .. }, Intent::AcceptCard) => match game_id {
                Some(game_id) => self.with(vec![Effect::Send(Request::AcceptCard { game_id })]),
                None => self.unchanged(),
            },
            (Phase::CardPreview { disabled, .. }, Intent::CancelCard) => {
                let disabled = std::mem::take(disabled);
                self.session.selected_number = None;
                self.phase = Phase::NumberSelection { disabled };
                self.unchanged()
            }
            (Phase::ActiveGame(_), Intent::CallNumber) => match game_id {
                Some(game_id) => self.with(vec![Effect::Send(Request::CallNumber { game_id })]),
                None => self.unchanged(),
            },
            (Phase::ActiveGame(_), Intent::CheckBingo) => match game_id {
                Some(game_id) => self.with(vec![Effect::Send(Request::CheckBingo { game_id })]),
                None => self.unchanged(),
            },
            (Phase::ActiveGame(game), Intent::ToggleMark(cell)) => {
                game.card.toggle(cell);
                self.unchanged()
            }
            (Phase::PostWin { bet_amount, .. }, Intent::ContinuePlay) => {
                let bet_amount = *bet_amount;
                self.session.clear_game();
                match bet_amount {
                    Some(bet_amount) => {
                        self.session.current_bet = Some(bet_amount);
                        self.phase = Phase::NumberSelection {
                            disabled: BTreeSet::new(),
                        };
                        self.with(vec![Effect::Send(Request::CreateGame { bet_amount })])
                    }
                    None => {
                        self.phase = Phase::BetSelection;
                        self.unchanged()
                    }
                }
            }
            (Phase::PostWin { .. }, Intent::BackToBetSelection) => {
                self.session.clear_game();
                self.phase = Phase::BetSelection;
                self.unchanged()
            }
            (phase, intent) => {
                debug!(phase = phase.name(), ?intent, "intent does not apply");
                self.unchanged()
            }
        }
    }

    fn is_current(&self, game_id: &GameId) -> bool {
        self.session.game_id.as_ref() == Some(game_id)
    }

    fn on_reply(mut self, reply: Reply) -> Transition {
        match reply {
            Reply::GameCreated(created) => {
                let accepts = matches!(self.phase, Phase::BetSelection) || self.is_awaiting_game();
                if !accepts {
                    debug!(phase = self.phase.name(), game_id = %created.game_id, "dropping late game creation");
                    return self.unchanged();
                }
                let disabled = match std::mem::replace(&mut self.phase, Phase::BetSelection) {
                    Phase::NumberSelection { disabled } => disabled,
                    _ => BTreeSet::new(),
                };
                self.session.game_id = Some(created.game_id);
                self.session.current_bet = Some(created.bet_amount);
                self.session.selected_number = None;
                self.phase = Phase::NumberSelection { disabled };
                self.unchanged()
            }
            Reply::NumberAccepted {
                game_id,
                number,
                card,
            } => {
                if !self.is_current(&game_id) {
                    return self.stale("select_number", &game_id);
                }
                let Phase::NumberSelection { disabled } = &mut self.phase else {
                    return self.stale("select_number", &game_id);
                };
                let disabled = std::mem::take(disabled);
                self.session.selected_number = Some(number);
                self.phase = Phase::CardPreview { card, disabled };
                self.unchanged()
            }
            Reply::CardAccepted { game_id, card } => {
                if !self.is_current(&game_id) || !matches!(self.phase, Phase::CardPreview { .. }) {
                    return self.stale("accept_card", &game_id);
                }
                self.phase = Phase::ActiveGame(ActiveGame {
                    card: MarkedCard::new(card),
                    status: None,
                    last_call: None,
                });
                self.with(vec![Effect::StartPolling(game_id)])
            }
            Reply::NumberCalled { game_id, call } => {
                if !self.is_current(&game_id) {
                    return self.stale("call_number", &game_id);
                }
                let Phase::ActiveGame(game) = &mut self.phase else {
                    return self.stale("call_number", &game_id);
                };
                game.card.mark_called(&call.called_numbers);
                if let Some(status) = game.status.as_mut() {
                    status.numbers_called = call.called_numbers.clone();
                }
                game.last_call = Some(call);
                self.unchanged()
            }
            Reply::BingoChecked { game_id, verdict } => {
                if !self.is_current(&game_id) || !self.phase.is_active_game() {
                    return self.stale("check_bingo", &game_id);
                }
                self.on_verdict(game_id, verdict)
            }
            Reply::StatusPolled { game_id, status } => {
                if !self.is_current(&game_id) {
                    return self.stale("game_status", &game_id);
                }
                let Phase::ActiveGame(game) = &mut self.phase else {
                    return self.stale("game_status", &game_id);
                };
                if status.is_won() {
                    let bet_amount = status.bet_amount.or(self.session.current_bet);
                    let notice = Notice::info(format!(
                        "Game over! Winner: {}",
                        status
                            .winner_id
                            .as_ref()
                            .map(ToString::to_string)
                            .unwrap_or_default()
                    ));
                    self.phase = Phase::PostWin {
                        bet_amount,
                        winner: status.winner_id.clone(),
                        summary: status.summary_line(),
                    };
                    self.session.clear_game();
                    return self.with(vec![Effect::StopPolling, Effect::Notice(notice)]);
                }
                if let Some(card) = status.card() {
                    game.card.replace_card(card);
                }
                game.card.mark_called(&status.numbers_called);
                game.status = Some(status);
                self.unchanged()
            }
            Reply::Failed { request, failure } => self.on_failure(request, failure),
        }
    }

    fn on_verdict(mut self, game_id: GameId, verdict: BingoVerdict) -> Transition {
        if verdict.kicked {
            let text = if verdict.message.is_empty() {
                String::from("You have been removed from the game")
            } else {
                verdict.message
            };
            self.session.clear_game();
            self.phase = Phase::Closed;
            return self.with(vec![
                Effect::Notice(Notice::rejected(text)),
                Effect::StopPolling,
                Effect::CloseApp,
            ]);
        }
        let mut effects = Vec::new();
        if !verdict.message.is_empty() {
            effects.push(Effect::Notice(Notice::info(verdict.message)));
        }
        if verdict.won {
            effects.push(Effect::Send(Request::GameStatus { game_id }));
        }
        self.with(effects)
    }

    fn on_failure(mut self, request: Request, failure: Failure) -> Transition {
        let notice = match &failure {
            Failure::Rejected(reason) => Notice::rejected(reason.clone()),
            Failure::Network(detail) => Notice::network(detail.clone()),
        };
        match (&request, &failure) {
            (Request::SelectNumber { game_id, number }, Failure::Rejected(_))
                if self.session.game_id.as_ref() == Some(game_id) =>
            {
                if let Phase::NumberSelection { disabled } = &mut self.phase {
                    disabled.insert(*number);
                }
            }
            (Request::CreateGame { .. }, _) if self.is_awaiting_game() => {
                // a replacement game could not be created; start over from the bet
                self.session.clear_game();
                self.phase = Phase::BetSelection;
            }
            _ => {}
        }
        self.with(vec![Effect::Notice(notice)])
    }

    fn stale(self, endpoint: &'static str, game_id: &GameId) -> Transition {
        debug!(
            endpoint,
            %game_id,
            current = ?self.session.game_id,
            phase = self.phase.name(),
            "dropping stale reply"
        );
        self.unchanged()
    }
}
