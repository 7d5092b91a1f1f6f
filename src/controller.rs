use std::{
    collections::VecDeque,
    time::Duration,
};

use tokio::sync::mpsc;
use tracing::{
    error,
    info,
};

use crate::{
    api::{
        ApiError,
        BingoApi,
        GameId,
        UserId,
    },
    poller::StatusPoller,
    session::{
        Effect,
        Event,
        Failure,
        Intent,
        Notice,
        NoticeKind,
        Reply,
        Request,
        SessionState,
    },
};

const MAX_NOTICES: usize = 50;

/// Runs the session state machine against a backend: performs the requests it
/// asks for, feeds the replies back and owns the status poller.
pub struct SessionController<A: BingoApi> {
    api: A,
    state: SessionState,
    poll_interval: Duration,
    poller: Option<StatusPoller>,
    replies: mpsc::UnboundedSender<Reply>,
    notices: Vec<Notice>,
    close_requested: bool,
}

impl<A: BingoApi> SessionController<A> {
    /// Returns the controller and the receiving end for poll replies, which
    /// the caller hands back through [`SessionController::deliver`].
    pub fn new(
        api: A,
        user_id: UserId,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Reply>) {
        let (replies, replies_rx) = mpsc::unbounded_channel();
        let controller = Self {
            api,
            state: SessionState::new(user_id),
            poll_interval,
            poller: None,
            replies,
            notices: Vec::new(),
            close_requested: false,
        };
        (controller, replies_rx)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user_id(&self) -> &UserId {
        &self.state.session().user_id
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn latest_notice(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn should_close(&self) -> bool {
        self.close_requested
    }

    pub async fn dispatch(&mut self, intent: Intent) {
        self.run(Event::Intent(intent)).await
    }

    pub async fn deliver(&mut self, reply: Reply) {
        self.run(Event::Reply(reply)).await
    }

    async fn run(&mut self, event: Event) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            for effect in self.step(event) {
                match effect {
                    Effect::Send(request) => {
                        let reply = self.perform(request).await;
                        pending.push_back(Event::Reply(reply));
                    }
                    Effect::StartPolling(game_id) => self.start_polling(game_id),
                    Effect::StopPolling => self.stop_polling(),
                    Effect::Notice(notice) => self.push_notice(notice),
                    Effect::CloseApp => {
                        self.stop_polling();
                        self.close_requested = true;
                    }
                }
            }
        }
    }

    fn step(&mut self, event: Event) -> Vec<Effect> {
        let placeholder = SessionState::new(self.user_id().clone());
        let current = std::mem::replace(&mut self.state, placeholder);
        let (next, effects) = current.apply(event);
        self.state = next;
        effects
    }

    async fn perform(&self, request: Request) -> Reply {
        let user = self.user_id();
        info!(request = request.name(), "sending request");
        let result = match &request {
            Request::CreateGame { bet_amount } => self
                .api
                .create_game(user, *bet_amount)
                .await
                .map(Reply::GameCreated),
            Request::SelectNumber { game_id, number } => self
                .api
                .select_number(user, game_id, *number)
                .await
                .map(|card| Reply::NumberAccepted {
                    game_id: game_id.clone(),
                    number: *number,
                    card,
                }),
            Request::AcceptCard { game_id } => {
                self.api
                    .accept_card(user, game_id)
                    .await
                    .map(|card| Reply::CardAccepted {
                        game_id: game_id.clone(),
                        card,
                    })
            }
            Request::CallNumber { game_id } => {
                self.api
                    .call_number(user, game_id)
                    .await
                    .map(|call| Reply::NumberCalled {
                        game_id: game_id.clone(),
                        call,
                    })
            }
            Request::CheckBingo { game_id } => {
                self.api
                    .check_bingo(user, game_id)
                    .await
                    .map(|verdict| Reply::BingoChecked {
                        game_id: game_id.clone(),
                        verdict,
                    })
            }
            Request::GameStatus { game_id } => {
                self.api
                    .game_status(user, game_id)
                    .await
                    .map(|status| Reply::StatusPolled {
                        game_id: game_id.clone(),
                        status,
                    })
            }
        };
        result.unwrap_or_else(|err| {
            error!(request = request.name(), %err, "request failed");
            Reply::Failed {
                failure: failure_of(&err),
                request,
            }
        })
    }

    fn start_polling(&mut self, game_id: GameId) {
        self.stop_polling();
        self.poller = Some(StatusPoller::spawn(
            self.api.clone(),
            self.user_id().clone(),
            game_id,
            self.poll_interval,
            self.replies.clone(),
        ));
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
    }

    fn push_notice(&mut self, notice: Notice) {
        match notice.kind {
            NoticeKind::Info => info!(text = %notice.text, "notice"),
            NoticeKind::Rejected | NoticeKind::Network => error!(text = %notice.text, "notice"),
        }
        self.notices.push(notice);
        if self.notices.len() > MAX_NOTICES {
            let drain = self.notices.len() - MAX_NOTICES;
            self.notices.drain(0..drain);
        }
    }
}

fn failure_of(err: &ApiError) -> Failure {
    match err.rejection() {
        Some(reason) => Failure::Rejected(reason.to_string()),
        None => Failure::Network(err.to_string()),
    }
}
