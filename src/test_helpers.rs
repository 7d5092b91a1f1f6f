use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};

use crate::{
    api::{
        AdminAction,
        AdminOutcome,
        Amount,
        ApiError,
        ApiResult,
        BingoApi,
        BingoVerdict,
        CalledNumber,
        Contact,
        CreatedGame,
        GameId,
        GameState,
        GameStatus,
        InviteReceipt,
        LeaderboardEntry,
        PayoutMethod,
        PendingWithdrawal,
        UserId,
        UserProfile,
        WithdrawalReceipt,
    },
    card::BingoCard,
};

/// Card holding 1..=25 in order.
pub fn sample_card() -> BingoCard {
    BingoCard::from_values((1..=25).collect()).unwrap()
}

pub fn created_game(game_id: &str, bet_amount: u64) -> CreatedGame {
    CreatedGame {
        game_id: GameId::new(game_id),
        state: GameState::Waiting,
        bet_amount,
    }
}

pub fn game_status(state: GameState) -> GameStatus {
    GameStatus {
        state,
        start_time: None,
        end_time: None,
        prize_amount: 0,
        numbers_called: Vec::new(),
        winner_id: None,
        players: Vec::new(),
        card_numbers: Vec::new(),
        selected_numbers: Vec::new(),
        bet_amount: None,
    }
}

pub fn profile(username: Option<&str>, wallet: i64, role: &str) -> UserProfile {
    UserProfile {
        username: username.map(str::to_string),
        wallet: Amount::whole(wallet),
        wins: 0,
        successful_referrals: 0,
        invalid_bingo_count: 0,
        role: role.to_string(),
    }
}

#[derive(Clone, Debug)]
pub enum FakeFailure {
    Rejected(String),
    Unavailable,
}

impl FakeFailure {
    pub fn rejected(reason: &str) -> Self {
        FakeFailure::Rejected(reason.to_string())
    }

    fn into_error(self, endpoint: &'static str) -> ApiError {
        match self {
            FakeFailure::Rejected(reason) => ApiError::rejected(reason),
            FakeFailure::Unavailable => ApiError::Unavailable {
                endpoint: endpoint.to_string(),
                status: String::from("502 Bad Gateway"),
            },
        }
    }
}

pub type Scripted<T> = Result<T, FakeFailure>;

/// Replies for one endpoint: queued replies first, then the sticky fallback.
/// An endpoint with neither answers as unavailable.
struct Script<T> {
    queued: VecDeque<Scripted<T>>,
    fallback: Option<Scripted<T>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queued: VecDeque::new(),
            fallback: None,
        }
    }
}

impl<T: Clone> Script<T> {
    fn next(&mut self, endpoint: &'static str) -> ApiResult<T> {
        self.queued
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or(Err(FakeFailure::Unavailable))
            .map_err(|failure| failure.into_error(endpoint))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    UserData,
    GameStatus(GameId),
    CreateGame(u64),
    SelectNumber(GameId, u8),
    AcceptCard(GameId),
    CallNumber(GameId),
    CheckBingo(GameId),
    RequestWithdrawal(u64, PayoutMethod),
    Leaderboard,
    Contacts,
    SendInvites(Vec<UserId>),
    AddAdmin(UserId),
    PendingWithdrawals,
    AdminAction(AdminAction),
}

impl Call {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Call::UserData => "user_data",
            Call::GameStatus(_) => "game_status",
            Call::CreateGame(_) => "create_game",
            Call::SelectNumber(..) => "select_number",
            Call::AcceptCard(_) => "accept_card",
            Call::CallNumber(_) => "call_number",
            Call::CheckBingo(_) => "check_bingo",
            Call::RequestWithdrawal(..) => "request_withdrawal",
            Call::Leaderboard => "leaderboard",
            Call::Contacts => "get_contacts",
            Call::SendInvites(_) => "send_invites",
            Call::AddAdmin(_) => "add_admin",
            Call::PendingWithdrawals => "pending_withdrawals",
            Call::AdminAction(_) => "admin_actions",
        }
    }
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    user_data: Script<UserProfile>,
    game_status: Script<GameStatus>,
    create_game: Script<CreatedGame>,
    select_number: Script<BingoCard>,
    accept_card: Script<BingoCard>,
    call_number: Script<CalledNumber>,
    check_bingo: Script<BingoVerdict>,
    request_withdrawal: Script<WithdrawalReceipt>,
    leaderboard: Script<Vec<LeaderboardEntry>>,
    contacts: Script<Vec<Contact>>,
    send_invites: Script<InviteReceipt>,
    add_admin: Script<Option<String>>,
    pending_withdrawals: Script<Vec<PendingWithdrawal>>,
    admin_action: Script<AdminOutcome>,
}

/// Scripted in-memory backend that records every call it receives.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
}

macro_rules! scripted_endpoint {
    ($field:ident, $queue:ident, $always:ident, $ty:ty) => {
        pub fn $queue(&self, reply: Scripted<$ty>) -> &Self {
            self.lock().$field.queued.push_back(reply);
            self
        }

        pub fn $always(&self, reply: Scripted<$ty>) -> &Self {
            self.lock().$field.fallback = Some(reply);
            self
        }
    };
}

impl FakeApi {
    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn answer<T: Clone>(
        &self,
        call: Call,
        pick: impl FnOnce(&mut FakeState) -> &mut Script<T>,
    ) -> ApiResult<T> {
        let endpoint = call.endpoint();
        let mut state = self.lock();
        state.calls.push(call);
        pick(&mut *state).next(endpoint)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, endpoint: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.endpoint() == endpoint)
            .count()
    }

    scripted_endpoint!(user_data, queue_user_data, always_user_data, UserProfile);
    scripted_endpoint!(game_status, queue_game_status, always_game_status, GameStatus);
    scripted_endpoint!(create_game, queue_create_game, always_create_game, CreatedGame);
    scripted_endpoint!(
        select_number,
        queue_select_number,
        always_select_number,
        BingoCard
    );
    scripted_endpoint!(accept_card, queue_accept_card, always_accept_card, BingoCard);
    scripted_endpoint!(call_number, queue_call_number, always_call_number, CalledNumber);
    scripted_endpoint!(check_bingo, queue_check_bingo, always_check_bingo, BingoVerdict);
    scripted_endpoint!(
        request_withdrawal,
        queue_request_withdrawal,
        always_request_withdrawal,
        WithdrawalReceipt
    );
    scripted_endpoint!(
        leaderboard,
        queue_leaderboard,
        always_leaderboard,
        Vec<LeaderboardEntry>
    );
    scripted_endpoint!(contacts, queue_contacts, always_contacts, Vec<Contact>);
    scripted_endpoint!(send_invites, queue_send_invites, always_send_invites, InviteReceipt);
    scripted_endpoint!(add_admin, queue_add_admin, always_add_admin, Option<String>);
    scripted_endpoint!(
        pending_withdrawals,
        queue_pending_withdrawals,
        always_pending_withdrawals,
        Vec<PendingWithdrawal>
    );
    scripted_endpoint!(admin_action, queue_admin_action, always_admin_action, AdminOutcome);
}

impl BingoApi for FakeApi {
    async fn user_data(&self, _user_id: &UserId) -> ApiResult<UserProfile> {
        self.answer(Call::UserData, |s| &mut s.user_data)
    }

    async fn game_status(&self, _user_id: &UserId, game_id: &GameId) -> ApiResult<GameStatus> {
        self.answer(Call::GameStatus(game_id.clone()), |s| &mut s.game_status)
    }

    async fn create_game(&self, _user_id: &UserId, bet_amount: u64) -> ApiResult<CreatedGame> {
        self.answer(Call::CreateGame(bet_amount), |s| &mut s.create_game)
    }

    async fn select_number(
        &self,
        _user_id: &UserId,
        game_id: &GameId,
        number: u8,
    ) -> ApiResult<BingoCard> {
        self.answer(Call::SelectNumber(game_id.clone(), number), |s| {
            &mut s.select_number
        })
    }

    async fn accept_card(&self, _user_id: &UserId, game_id: &GameId) -> ApiResult<BingoCard> {
        self.answer(Call::AcceptCard(game_id.clone()), |s| &mut s.accept_card)
    }

    async fn call_number(&self, _user_id: &UserId, game_id: &GameId) -> ApiResult<CalledNumber> {
        self.answer(Call::CallNumber(game_id.clone()), |s| &mut s.call_number)
    }

    async fn check_bingo(&self, _user_id: &UserId, game_id: &GameId) -> ApiResult<BingoVerdict> {
        self.answer(Call::CheckBingo(game_id.clone()), |s| &mut s.check_bingo)
    }

    async fn request_withdrawal(
        &self,
        _user_id: &UserId,
        amount: u64,
        method: PayoutMethod,
    ) -> ApiResult<WithdrawalReceipt> {
        self.answer(Call::RequestWithdrawal(amount, method), |s| {
            &mut s.request_withdrawal
        })
    }

    async fn leaderboard(&self) -> ApiResult<Vec<LeaderboardEntry>> {
        self.answer(Call::Leaderboard, |s| &mut s.leaderboard)
    }

    async fn contacts(&self, _user_id: &UserId) -> ApiResult<Vec<Contact>> {
        self.answer(Call::Contacts, |s| &mut s.contacts)
    }

    async fn send_invites(
        &self,
        _user_id: &UserId,
        friend_ids: &[UserId],
    ) -> ApiResult<InviteReceipt> {
        self.answer(Call::SendInvites(friend_ids.to_vec()), |s| {
            &mut s.send_invites
        })
    }

    async fn add_admin(
        &self,
        _user_id: &UserId,
        target_user_id: &UserId,
    ) -> ApiResult<Option<String>> {
        self.answer(Call::AddAdmin(target_user_id.clone()), |s| &mut s.add_admin)
    }

    async fn pending_withdrawals(&self, _user_id: &UserId) -> ApiResult<Vec<PendingWithdrawal>> {
        self.answer(Call::PendingWithdrawals, |s| &mut s.pending_withdrawals)
    }

    async fn admin_action(
        &self,
        _user_id: &UserId,
        action: &AdminAction,
    ) -> ApiResult<AdminOutcome> {
        self.answer(Call::AdminAction(action.clone()), |s| &mut s.admin_action)
    }
}
