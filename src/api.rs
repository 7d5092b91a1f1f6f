use std::{
    fmt,
    future::Future,
    time::Duration,
};

use chrono::{
    DateTime,
    NaiveDateTime,
};
use reqwest::StatusCode;
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
    de::DeserializeOwned,
};
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::card::{
    BingoCard,
    CardError,
};

pub const DEFAULT_API_URL: &str = "https://bingo-webapp.vercel.app/api";
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{endpoint} answered {status} without a JSON body")]
    Unavailable { endpoint: String, status: String },
    #[error("invalid {endpoint} payload: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{endpoint} response is missing `{field}`")]
    MissingField {
        endpoint: &'static str,
        field: &'static str,
    },
    #[error("{reason}")]
    Rejected { reason: String },
    #[error("invalid card: {0}")]
    InvalidCard(#[from] CardError),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

impl ApiError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        ApiError::Rejected {
            reason: reason.into(),
        }
    }

    /// The request never produced a usable answer.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(_)
                | ApiError::Unavailable { .. }
                | ApiError::Decode { .. }
                | ApiError::MissingField { .. }
                | ApiError::InvalidCard(_)
        )
    }

    pub fn rejection(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { reason } => Some(reason),
            _ => None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Opaque user identifier as handed out by the host container.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // numeric ids go out as numbers, the way the host container reports them
        match self.0.parse::<i64>() {
            Ok(n) if n.to_string() == self.0 => serializer.serialize_i64(n),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(UserId(LooseValue::deserialize(deserializer)?.into_text()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for GameId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(GameId(LooseValue::deserialize(deserializer)?.into_text()))
    }
}

/// The backend mixes JSON numbers and decimal strings for the same fields.
#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
enum LooseValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseValue {
    fn as_i64(&self) -> Option<i64> {
        match self {
            LooseValue::Int(n) => Some(*n),
            LooseValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            LooseValue::Float(_) => None,
            LooseValue::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_number(&self) -> Option<u8> {
        self.as_i64().and_then(|n| u8::try_from(n).ok())
    }

    fn as_amount(&self) -> Option<Amount> {
        let value: f64 = match self {
            LooseValue::Int(n) => return Some(Amount::whole(*n)),
            LooseValue::Float(f) => *f,
            LooseValue::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then(|| Amount::from_f64(value))
    }

    /// Counters and whole-ETB fields; stray fractions are rounded.
    fn as_whole(&self) -> Option<i64> {
        match self {
            LooseValue::Int(n) => Some(*n),
            other => other.as_amount().map(Amount::rounded),
        }
    }

    fn into_text(self) -> String {
        match self {
            LooseValue::Int(n) => n.to_string(),
            LooseValue::Float(f) => f.to_string(),
            LooseValue::Text(s) => s,
        }
    }
}

fn loose_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Amount>, D::Error> {
    Ok(Option::<LooseValue>::deserialize(deserializer)?.and_then(|v| v.as_amount()))
}

fn loose_whole<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    Ok(Option::<LooseValue>::deserialize(deserializer)?
        .and_then(|v| v.as_whole())
        .and_then(|n| T::try_from(n).ok()))
}

/// An ETB figure kept to the cent. Withdrawals are stored as sent, so a
/// wallet can end up fractional even though bets and prizes are whole.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    cents: i64,
}

impl Amount {
    pub const fn whole(birr: i64) -> Self {
        Amount {
            cents: birr.saturating_mul(100),
        }
    }

    fn from_f64(birr: f64) -> Self {
        Amount {
            cents: (birr * 100.0).round() as i64,
        }
    }

    /// Nearest whole birr, halves away from zero.
    pub fn rounded(self) -> i64 {
        let birr = self.cents / 100;
        let rest = self.cents % 100;
        if rest >= 50 {
            birr + 1
        } else if rest <= -50 {
            birr - 1
        } else {
            birr
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let cents = self.cents.unsigned_abs();
        let (birr, rest) = (cents / 100, cents % 100);
        match rest {
            0 => write!(f, "{sign}{birr}"),
            r if r % 10 == 0 => write!(f, "{sign}{birr}.{}", r / 10),
            r => write!(f, "{sign}{birr}.{r:02}"),
        }
    }
}

fn numbers(values: Vec<LooseValue>) -> Vec<u8> {
    values.iter().filter_map(LooseValue::as_number).collect()
}

fn card_from(values: Vec<LooseValue>) -> ApiResult<BingoCard> {
    Ok(BingoCard::from_values(numbers(values))?)
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.naive_local()))
        .or_else(|| DateTime::parse_from_rfc2822(raw).ok().map(|d| d.naive_local()))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameState {
    Waiting,
    Started,
    Finished,
    NotFound,
    Other(String),
}

impl GameState {
    pub fn as_str(&self) -> &str {
        match self {
            GameState::Waiting => "waiting",
            GameState::Started => "started",
            GameState::Finished => "finished",
            GameState::NotFound => "not_found",
            GameState::Other(label) => label,
        }
    }
}

impl From<&str> for GameState {
    fn from(value: &str) -> Self {
        match value {
            "waiting" => GameState::Waiting,
            "started" => GameState::Started,
            "finished" => GameState::Finished,
            "not_found" => GameState::NotFound,
            other => GameState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub username: Option<String>,
    pub wallet: Amount,
    pub wins: i64,
    pub successful_referrals: u32,
    pub invalid_bingo_count: u32,
    pub role: String,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameStatus {
    pub state: GameState,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub prize_amount: i64,
    pub numbers_called: Vec<u8>,
    pub winner_id: Option<UserId>,
    pub players: Vec<UserId>,
    pub card_numbers: Vec<u8>,
    pub selected_numbers: Vec<u8>,
    pub bet_amount: Option<u64>,
}

impl GameStatus {
    pub fn is_won(&self) -> bool {
        self.state == GameState::Finished && self.winner_id.is_some()
    }

    /// The player's card when the snapshot carries a complete one.
    pub fn card(&self) -> Option<BingoCard> {
        BingoCard::from_values(self.card_numbers.clone()).ok()
    }

    pub fn summary_line(&self) -> String {
        let start = self
            .start_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| String::from("Not Started"));
        let end = self
            .end_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| String::from("Not Ended"));
        let winner = self
            .winner_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| String::from("None"));
        format!(
            "Status: {} | {start} - {end} | Prize: {} ETB | Called: {} | Winner: {winner} | Players: {}",
            self.state,
            self.prize_amount,
            self.numbers_called.len(),
            self.players.len()
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedGame {
    pub game_id: GameId,
    pub state: GameState,
    pub bet_amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalledNumber {
    pub number: u8,
    pub remaining: i64,
    pub called_numbers: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BingoVerdict {
    pub message: String,
    pub won: bool,
    pub kicked: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayoutMethod {
    #[default]
    Telebirr,
    Cbe,
}

impl PayoutMethod {
    pub fn label(self) -> &'static str {
        match self {
            PayoutMethod::Telebirr => "Telebirr",
            PayoutMethod::Cbe => "CBE",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            PayoutMethod::Telebirr => PayoutMethod::Cbe,
            PayoutMethod::Cbe => PayoutMethod::Telebirr,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalReceipt {
    pub withdraw_id: String,
    pub amount: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    pub user_id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Contact {
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("User");
        match self.last_name.as_deref() {
            Some(last) if !last.is_empty() => format!("{first} {last}"),
            _ => first.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InviteReceipt {
    pub sent_count: u32,
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingWithdrawal {
    pub withdraw_id: String,
    pub user_id: UserId,
    pub amount: Amount,
    pub method: String,
    pub request_time: Option<NaiveDateTime>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawalDecision {
    Approve,
    Reject,
}

impl WithdrawalDecision {
    fn as_str(self) -> &'static str {
        match self {
            WithdrawalDecision::Approve => "approve",
            WithdrawalDecision::Reject => "reject",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminAction {
    StartGame { game_id: GameId, prize_amount: i64 },
    EndGame { game_id: GameId },
    VerifyPayment { tx_id: String },
    KickUser { target_user_id: UserId },
    ManageWithdrawal {
        withdraw_id: String,
        decision: WithdrawalDecision,
        note: String,
    },
}

impl AdminAction {
    pub fn name(&self) -> &'static str {
        match self {
            AdminAction::StartGame { .. } => "start_game",
            AdminAction::EndGame { .. } => "end_game",
            AdminAction::VerifyPayment { .. } => "verify_payment",
            AdminAction::KickUser { .. } => "kick_user",
            AdminAction::ManageWithdrawal { .. } => "manage_withdrawal",
        }
    }

    pub fn payload(&self, user_id: &UserId) -> serde_json::Value {
        let mut body = json!({ "user_id": user_id, "action": self.name() });
        let extra = match self {
            // the backend reads the prize from `bet_amount`
            AdminAction::StartGame {
                game_id,
                prize_amount,
            } => json!({
                "game_id": game_id,
                "prize_amount": prize_amount,
                "bet_amount": prize_amount,
            }),
            AdminAction::EndGame { game_id } => json!({ "game_id": game_id }),
            AdminAction::VerifyPayment { tx_id } => json!({ "tx_id": tx_id }),
            AdminAction::KickUser { target_user_id } => {
                json!({ "target_user_id": target_user_id })
            }
            AdminAction::ManageWithdrawal {
                withdraw_id,
                decision,
                note,
            } => json!({
                "withdraw_id": withdraw_id,
                "action_type": decision.as_str(),
                "admin_note": note,
            }),
        };
        if let (Some(body), serde_json::Value::Object(extra)) = (body.as_object_mut(), extra)
        {
            body.extend(extra);
        }
        body
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminOutcome {
    pub status: String,
    pub user_id: Option<UserId>,
    pub amount: Option<Amount>,
    pub prize_amount: Option<i64>,
}

/// The remote backend as a set of named operations. Implemented over HTTP by
/// [`ApiClient`]; tests substitute a scripted fake.
pub trait BingoApi: Clone + Send + Sync + 'static {
    fn user_data(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = ApiResult<UserProfile>> + Send;

    fn game_status(
        &self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> impl Future<Output = ApiResult<GameStatus>> + Send;

    fn create_game(
        &self,
        user_id: &UserId,
        bet_amount: u64,
    ) -> impl Future<Output = ApiResult<CreatedGame>> + Send;

    fn select_number(
        &self,
        user_id: &UserId,
        game_id: &GameId,
        number: u8,
    ) -> impl Future<Output = ApiResult<BingoCard>> + Send;

    fn accept_card(
        &self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> impl Future<Output = ApiResult<BingoCard>> + Send;

    fn call_number(
        &self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> impl Future<Output = ApiResult<CalledNumber>> + Send;

    fn check_bingo(
        &self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> impl Future<Output = ApiResult<BingoVerdict>> + Send;

    fn request_withdrawal(
        &self,
        user_id: &UserId,
        amount: u64,
        method: PayoutMethod,
    ) -> impl Future<Output = ApiResult<WithdrawalReceipt>> + Send;

    fn leaderboard(&self) -> impl Future<Output = ApiResult<Vec<LeaderboardEntry>>> + Send;

    fn contacts(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = ApiResult<Vec<Contact>>> + Send;

    fn send_invites(
        &self,
        user_id: &UserId,
        friend_ids: &[UserId],
    ) -> impl Future<Output = ApiResult<InviteReceipt>> + Send;

    fn add_admin(
        &self,
        user_id: &UserId,
        target_user_id: &UserId,
    ) -> impl Future<Output = ApiResult<Option<String>>> + Send;

    fn pending_withdrawals(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = ApiResult<Vec<PendingWithdrawal>>> + Send;

    fn admin_action(
        &self,
        user_id: &UserId,
        action: &AdminAction,
    ) -> impl Future<Output = ApiResult<AdminOutcome>> + Send;
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let mut base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(ApiError::InvalidScheme(scheme.to_string())),
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(name)?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        name: &'static str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let url = self.endpoint(name)?;
        debug!(endpoint = name, "GET");
        let res = self.http.get(url).query(query).send().await?;
        Self::decode(name, res).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        name: &'static str,
        body: &B,
    ) -> ApiResult<T> {
        let url = self.endpoint(name)?;
        debug!(endpoint = name, "POST");
        let res = self.http.post(url).json(body).send().await?;
        Self::decode(name, res).await
    }

    // Failure envelopes arrive with 4xx statuses, so the body is decoded first
    // and the status only decides how an undecodable body is reported.
    async fn decode<T: DeserializeOwned>(
        name: &'static str,
        res: reqwest::Response,
    ) -> ApiResult<T> {
        let status = res.status();
        let bytes = res.bytes().await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(source) if status.is_success() => Err(ApiError::Decode {
                endpoint: name.to_string(),
                source,
            }),
            Err(_) => Err(ApiError::Unavailable {
                endpoint: name.to_string(),
                status: describe_status(status),
            }),
        }
    }
}

fn describe_status(status: StatusCode) -> String {
    status.to_string()
}

impl fmt::Display for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

#[derive(Serialize)]
struct GameBody<'a> {
    user_id: &'a UserId,
    game_id: &'a GameId,
}

#[derive(Serialize)]
struct CreateGameBody<'a> {
    user_id: &'a UserId,
    bet_amount: u64,
}

#[derive(Serialize)]
struct SelectNumberBody<'a> {
    user_id: &'a UserId,
    game_id: &'a GameId,
    selected_number: u8,
}

#[derive(Serialize)]
struct WithdrawalBody<'a> {
    user_id: &'a UserId,
    amount: u64,
    method: PayoutMethod,
}

#[derive(Serialize)]
struct InvitesBody<'a> {
    user_id: &'a UserId,
    friend_ids: &'a [UserId],
}

#[derive(Serialize)]
struct AddAdminBody<'a> {
    user_id: &'a UserId,
    target_user_id: &'a UserId,
}

impl BingoApi for ApiClient {
    async fn user_data(&self, user_id: &UserId) -> ApiResult<UserProfile> {
        let dto: UserDataDto = self
            .get("user_data", &[("user_id", user_id.as_str())])
            .await?;
        dto.try_into()
    }

    async fn game_status(&self, user_id: &UserId, game_id: &GameId) -> ApiResult<GameStatus> {
        let dto: GameStatusDto = self
            .get(
                "game_status",
                &[("game_id", game_id.as_str()), ("user_id", user_id.as_str())],
            )
            .await?;
        Ok(dto.into())
    }

    async fn create_game(&self, user_id: &UserId, bet_amount: u64) -> ApiResult<CreatedGame> {
        let dto: CreateGameDto = self
            .post(
                "create_game",
                &CreateGameBody {
                    user_id,
                    bet_amount,
                },
            )
            .await?;
        dto.try_into()
    }

    async fn select_number(
        &self,
        user_id: &UserId,
        game_id: &GameId,
        number: u8,
    ) -> ApiResult<BingoCard> {
        let dto: CardDto = self
            .post(
                "select_number",
                &SelectNumberBody {
                    user_id,
                    game_id,
                    selected_number: number,
                },
            )
            .await?;
        dto.into_selected_card()
    }

    async fn accept_card(&self, user_id: &UserId, game_id: &GameId) -> ApiResult<BingoCard> {
        let dto: CardDto = self
            .post("accept_card", &GameBody { user_id, game_id })
            .await?;
        dto.into_accepted_card()
    }

    async fn call_number(&self, user_id: &UserId, game_id: &GameId) -> ApiResult<CalledNumber> {
        let dto: CallNumberDto = self
            .post("call_number", &GameBody { user_id, game_id })
            .await?;
        dto.try_into()
    }

    async fn check_bingo(&self, user_id: &UserId, game_id: &GameId) -> ApiResult<BingoVerdict> {
        let dto: CheckBingoDto = self
            .post("check_bingo", &GameBody { user_id, game_id })
            .await?;
        Ok(dto.into())
    }

    async fn request_withdrawal(
        &self,
        user_id: &UserId,
        amount: u64,
        method: PayoutMethod,
    ) -> ApiResult<WithdrawalReceipt> {
        let dto: WithdrawalDto = self
            .post(
                "request_withdrawal",
                &WithdrawalBody {
                    user_id,
                    amount,
                    method,
                },
            )
            .await?;
        dto.try_into()
    }

    async fn leaderboard(&self) -> ApiResult<Vec<LeaderboardEntry>> {
        let dtos: Vec<LeaderboardEntryDto> = self.get("leaderboard", &[]).await?;
        Ok(dtos.into_iter().map(Into::into).collect())
    }

    async fn contacts(&self, user_id: &UserId) -> ApiResult<Vec<Contact>> {
        let dto: ContactsDto = self
            .get("get_contacts", &[("user_id", user_id.as_str())])
            .await?;
        Ok(dto.contacts.into_iter().map(Into::into).collect())
    }

    async fn send_invites(
        &self,
        user_id: &UserId,
        friend_ids: &[UserId],
    ) -> ApiResult<InviteReceipt> {
        let dto: StatusDto = self
            .post(
                "send_invites",
                &InvitesBody {
                    user_id,
                    friend_ids,
                },
            )
            .await?;
        dto.into_invite_receipt()
    }

    async fn add_admin(
        &self,
        user_id: &UserId,
        target_user_id: &UserId,
    ) -> ApiResult<Option<String>> {
        let dto: StatusDto = self
            .post(
                "add_admin",
                &AddAdminBody {
                    user_id,
                    target_user_id,
                },
            )
            .await?;
        dto.into_promotion()
    }

    async fn pending_withdrawals(&self, user_id: &UserId) -> ApiResult<Vec<PendingWithdrawal>> {
        let dto: PendingWithdrawalsDto = self
            .get("pending_withdrawals", &[("user_id", user_id.as_str())])
            .await?;
        dto.try_into()
    }

    async fn admin_action(
        &self,
        user_id: &UserId,
        action: &AdminAction,
    ) -> ApiResult<AdminOutcome> {
        let dto: AdminOutcomeDto = self
            .post("admin_actions", &action.payload(user_id))
            .await?;
        Ok(dto.into())
    }
}

fn failure_reason(status: Option<&str>, reason: Option<String>, fallback: &str) -> String {
    reason
        .filter(|r| !r.is_empty())
        .or_else(|| status.map(str::to_string))
        .unwrap_or_else(|| fallback.to_string())
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct UserDataDto {
    error: Option<String>,
    username: Option<String>,
    #[serde(deserialize_with = "loose_amount")]
    wallet: Option<Amount>,
    #[serde(deserialize_with = "loose_whole")]
    wins: Option<i64>,
    #[serde(deserialize_with = "loose_whole")]
    successful_referrals: Option<u32>,
    #[serde(deserialize_with = "loose_whole")]
    invalid_bingo_count: Option<u32>,
    role: Option<String>,
}

impl TryFrom<UserDataDto> for UserProfile {
    type Error = ApiError;

    fn try_from(dto: UserDataDto) -> ApiResult<Self> {
        if let Some(error) = dto.error {
            return Err(ApiError::rejected(error));
        }
        Ok(UserProfile {
            username: dto.username.filter(|name| !name.is_empty()),
            wallet: dto.wallet.unwrap_or_default(),
            wins: dto.wins.unwrap_or_default(),
            successful_referrals: dto.successful_referrals.unwrap_or_default(),
            invalid_bingo_count: dto.invalid_bingo_count.unwrap_or_default(),
            role: dto.role.unwrap_or_else(|| String::from("user")),
        })
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GameStatusDto {
    status: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(deserialize_with = "loose_whole")]
    prize_amount: Option<i64>,
    numbers_called: Vec<LooseValue>,
    winner_id: Option<UserId>,
    players: Vec<UserId>,
    card_numbers: Vec<LooseValue>,
    selected_numbers: Vec<LooseValue>,
    #[serde(deserialize_with = "loose_whole")]
    bet_amount: Option<u64>,
}

impl From<GameStatusDto> for GameStatus {
    fn from(dto: GameStatusDto) -> Self {
        GameStatus {
            state: GameState::from(dto.status.as_deref().unwrap_or("unknown")),
            start_time: dto.start_time.as_deref().and_then(parse_timestamp),
            end_time: dto.end_time.as_deref().and_then(parse_timestamp),
            prize_amount: dto.prize_amount.unwrap_or_default(),
            numbers_called: numbers(dto.numbers_called),
            winner_id: dto.winner_id.filter(|id| !id.as_str().is_empty()),
            players: dto.players,
            card_numbers: numbers(dto.card_numbers),
            selected_numbers: numbers(dto.selected_numbers),
            bet_amount: dto.bet_amount,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CreateGameDto {
    status: Option<String>,
    reason: Option<String>,
    game_id: Option<GameId>,
    #[serde(deserialize_with = "loose_whole")]
    bet_amount: Option<u64>,
}

impl TryFrom<CreateGameDto> for CreatedGame {
    type Error = ApiError;

    fn try_from(dto: CreateGameDto) -> ApiResult<Self> {
        if dto.status.as_deref() == Some("failed") {
            return Err(ApiError::rejected(failure_reason(
                None,
                dto.reason,
                "could not create game",
            )));
        }
        let game_id = dto.game_id.ok_or(ApiError::MissingField {
            endpoint: "create_game",
            field: "game_id",
        })?;
        let bet_amount = dto.bet_amount.ok_or(ApiError::MissingField {
            endpoint: "create_game",
            field: "bet_amount",
        })?;
        Ok(CreatedGame {
            game_id,
            state: GameState::from(dto.status.as_deref().unwrap_or("waiting")),
            bet_amount,
        })
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CardDto {
    status: Option<String>,
    reason: Option<String>,
    card_numbers: Vec<LooseValue>,
}

impl CardDto {
    fn into_selected_card(self) -> ApiResult<BingoCard> {
        if self.status.as_deref() == Some("failed") {
            return Err(ApiError::rejected(failure_reason(
                None,
                self.reason,
                "number not available",
            )));
        }
        card_from(self.card_numbers)
    }

    fn into_accepted_card(self) -> ApiResult<BingoCard> {
        if self.status.as_deref() != Some("accepted") {
            return Err(ApiError::rejected(failure_reason(
                self.status.as_deref(),
                self.reason,
                "card not accepted",
            )));
        }
        card_from(self.card_numbers)
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CallNumberDto {
    status: Option<String>,
    number: Option<LooseValue>,
    #[serde(deserialize_with = "loose_whole")]
    remaining: Option<i64>,
    called_numbers: Vec<LooseValue>,
}

impl TryFrom<CallNumberDto> for CalledNumber {
    type Error = ApiError;

    fn try_from(dto: CallNumberDto) -> ApiResult<Self> {
        let Some(number) = dto.number.as_ref().and_then(LooseValue::as_number) else {
            return Err(ApiError::rejected(failure_reason(
                dto.status.as_deref(),
                None,
                "no number called",
            )));
        };
        let called_numbers = numbers(dto.called_numbers);
        let remaining = dto
            .remaining
            .unwrap_or(100 - called_numbers.len() as i64);
        Ok(CalledNumber {
            number,
            remaining,
            called_numbers,
        })
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CheckBingoDto {
    message: Option<String>,
    won: Option<bool>,
    kicked: Option<bool>,
}

impl From<CheckBingoDto> for BingoVerdict {
    fn from(dto: CheckBingoDto) -> Self {
        BingoVerdict {
            message: dto.message.unwrap_or_default(),
            won: dto.won.unwrap_or(false),
            kicked: dto.kicked.unwrap_or(false),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WithdrawalDto {
    status: Option<String>,
    reason: Option<String>,
    withdraw_id: Option<LooseValue>,
    #[serde(deserialize_with = "loose_whole")]
    amount: Option<u64>,
}

impl TryFrom<WithdrawalDto> for WithdrawalReceipt {
    type Error = ApiError;

    fn try_from(dto: WithdrawalDto) -> ApiResult<Self> {
        match (dto.status.as_deref(), dto.withdraw_id) {
            (Some("requested"), Some(withdraw_id)) => Ok(WithdrawalReceipt {
                withdraw_id: withdraw_id.into_text(),
                amount: dto.amount,
            }),
            (status, _) => Err(ApiError::rejected(failure_reason(
                status,
                dto.reason,
                "withdrawal not requested",
            ))),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LeaderboardEntryDto {
    username: Option<String>,
    #[serde(deserialize_with = "loose_whole")]
    score: Option<i64>,
}

impl From<LeaderboardEntryDto> for LeaderboardEntry {
    fn from(dto: LeaderboardEntryDto) -> Self {
        LeaderboardEntry {
            username: dto.username.unwrap_or_else(|| String::from("Anonymous")),
            score: dto.score.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ContactsDto {
    contacts: Vec<ContactDto>,
}

#[derive(Deserialize)]
struct ContactDto {
    user_id: UserId,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

impl From<ContactDto> for Contact {
    fn from(dto: ContactDto) -> Self {
        Contact {
            user_id: dto.user_id,
            first_name: dto.first_name,
            last_name: dto.last_name,
        }
    }
}

/// Shared shape of the `{status, reason, message, ...}` replies.
#[derive(Deserialize, Default)]
#[serde(default)]
struct StatusDto {
    status: Option<String>,
    reason: Option<String>,
    message: Option<String>,
    #[serde(deserialize_with = "loose_whole")]
    sent_count: Option<u32>,
}

impl StatusDto {
    fn into_invite_receipt(self) -> ApiResult<InviteReceipt> {
        if self.status.as_deref() != Some("success") {
            return Err(ApiError::rejected(failure_reason(
                None,
                self.message,
                "Failed to send invites",
            )));
        }
        Ok(InviteReceipt {
            sent_count: self.sent_count.unwrap_or_default(),
            message: self.message,
        })
    }

    fn into_promotion(self) -> ApiResult<Option<String>> {
        if self.status.as_deref() != Some("success") {
            return Err(ApiError::rejected(failure_reason(
                self.status.as_deref(),
                self.reason,
                "Failed to promote user",
            )));
        }
        Ok(self.message)
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PendingWithdrawalsDto {
    status: Option<String>,
    withdrawals: Option<Vec<PendingWithdrawalDto>>,
}

#[derive(Deserialize)]
struct PendingWithdrawalDto {
    withdraw_id: LooseValue,
    user_id: UserId,
    #[serde(default, deserialize_with = "loose_amount")]
    amount: Option<Amount>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    request_time: Option<String>,
}

impl TryFrom<PendingWithdrawalsDto> for Vec<PendingWithdrawal> {
    type Error = ApiError;

    fn try_from(dto: PendingWithdrawalsDto) -> ApiResult<Self> {
        let Some(withdrawals) = dto.withdrawals else {
            return Err(ApiError::rejected(failure_reason(
                dto.status.as_deref(),
                None,
                "unauthorized",
            )));
        };
        Ok(withdrawals
            .into_iter()
            .map(|w| PendingWithdrawal {
                withdraw_id: w.withdraw_id.into_text(),
                user_id: w.user_id,
                amount: w.amount.unwrap_or_default(),
                method: w.method.unwrap_or_default(),
                request_time: w.request_time.as_deref().and_then(parse_timestamp),
            })
            .collect())
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AdminOutcomeDto {
    status: Option<String>,
    user_id: Option<UserId>,
    #[serde(deserialize_with = "loose_amount")]
    amount: Option<Amount>,
    #[serde(deserialize_with = "loose_whole")]
    prize_amount: Option<i64>,
}

impl From<AdminOutcomeDto> for AdminOutcome {
    fn from(dto: AdminOutcomeDto) -> Self {
        AdminOutcome {
            status: dto.status.unwrap_or_else(|| String::from("failed")),
            user_id: dto.user_id,
            amount: dto.amount,
            prize_amount: dto.prize_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn decode<T: DeserializeOwned>(raw: &str) -> T {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn user_id__serializes_numeric_ids_as_numbers() {
        assert_eq!(serde_json::to_string(&UserId::new("5380773431")).unwrap(), "5380773431");
        assert_eq!(serde_json::to_string(&UserId::new("abc")).unwrap(), "\"abc\"");
        assert_eq!(serde_json::to_string(&UserId::new("007")).unwrap(), "\"007\"");
    }

    #[test]
    fn user_id__accepts_numbers_and_strings() {
        let ids: Vec<UserId> = decode(r#"[42, "43"]"#);
        assert_eq!(ids, vec![UserId::new("42"), UserId::new("43")]);
    }

    #[test]
    fn game_status__decodes_string_numbers_and_missing_fields() {
        // given
        let raw = r#"{
            "status": "started",
            "start_time": "2025-03-01T10:15:00.123456",
            "end_time": null,
            "numbers_called": ["5", "17", "x"],
            "prize_amount": 98,
            "winner_id": null,
            "players": ["1", "2"],
            "card_numbers": []
        }"#;

        // when
        let status: GameStatus = decode::<GameStatusDto>(raw).into();

        // then
        assert_eq!(status.state, GameState::Started);
        assert!(status.start_time.is_some());
        assert!(status.end_time.is_none());
        assert_eq!(status.numbers_called, vec![5, 17]);
        assert_eq!(status.players.len(), 2);
        assert!(status.selected_numbers.is_empty());
        assert_eq!(status.bet_amount, None);
        assert!(status.card().is_none());
        assert!(!status.is_won());
    }

    #[test]
    fn game_status__whole_float_and_text_amounts_still_decode() {
        // given
        let float_bet = r#"{"status": "finished", "winner_id": 42, "bet_amount": 50.0, "prize_amount": 90.0}"#;
        let text_bet = r#"{"status": "finished", "winner_id": 42, "bet_amount": "50"}"#;

        // when
        let from_float: GameStatus = decode::<GameStatusDto>(float_bet).into();
        let from_text: GameStatus = decode::<GameStatusDto>(text_bet).into();

        // then
        assert!(from_float.is_won());
        assert_eq!(from_float.bet_amount, Some(50));
        assert_eq!(from_float.prize_amount, 90);
        assert_eq!(from_text.bet_amount, Some(50));
    }

    #[test]
    fn user_data__fractional_wallet_is_kept() {
        // given
        let raw = r#"{"username": "abebe", "wallet": 60.5, "wins": "3", "successful_referrals": 2.0, "role": "user"}"#;

        // when
        let profile = UserProfile::try_from(decode::<UserDataDto>(raw)).unwrap();

        // then
        assert_eq!(profile.wallet.to_string(), "60.5");
        assert_eq!(profile.wins, 3);
        assert_eq!(profile.successful_referrals, 2);
    }

    #[test]
    fn amount__displays_cents_only_when_present() {
        assert_eq!(Amount::whole(120).to_string(), "120");
        assert_eq!(Amount::from_f64(60.25).to_string(), "60.25");
        assert_eq!(Amount::from_f64(-0.5).to_string(), "-0.5");
        assert_eq!(Amount::from_f64(60.5).rounded(), 61);
        assert_eq!(Amount::from_f64(60.49).rounded(), 60);
    }

    #[test]
    fn pending_withdrawals__string_and_fractional_amounts_decode() {
        // given
        let raw = r#"{"withdrawals": [
            {"withdraw_id": 3, "user_id": 7, "amount": "150", "method": "cbe"},
            {"withdraw_id": 4, "user_id": 8, "amount": 60.5}
        ]}"#;

        // when
        let pending = Vec::<PendingWithdrawal>::try_from(decode::<PendingWithdrawalsDto>(raw)).unwrap();

        // then
        assert_eq!(pending[0].amount, Amount::whole(150));
        assert_eq!(pending[1].amount.to_string(), "60.5");
    }

    #[test]
    fn game_status__keeps_unknown_labels_verbatim() {
        let status: GameStatus = decode::<GameStatusDto>(r#"{"status": "paused"}"#).into();
        assert_eq!(status.state, GameState::Other(String::from("paused")));
        assert_eq!(status.state.to_string(), "paused");
    }

    #[test]
    fn game_status__is_won_requires_finished_and_winner() {
        let status: GameStatus =
            decode::<GameStatusDto>(r#"{"status": "finished", "winner_id": 7}"#).into();
        assert!(status.is_won());
        let status: GameStatus =
            decode::<GameStatusDto>(r#"{"status": "finished", "winner_id": null}"#).into();
        assert!(!status.is_won());
    }

    #[test]
    fn create_game__failed_status_becomes_rejection() {
        // given
        let dto: CreateGameDto =
            decode(r#"{"status": "failed", "reason": "Insufficient wallet"}"#);

        // when
        let result = CreatedGame::try_from(dto);

        // then
        let err = result.unwrap_err();
        assert_eq!(err.rejection(), Some("Insufficient wallet"));
        assert!(!err.is_network());
    }

    #[test]
    fn create_game__success_reports_bet_from_server() {
        let dto: CreateGameDto =
            decode(r#"{"game_id": "MP11700000000", "status": "waiting", "bet_amount": 50}"#);
        let created = CreatedGame::try_from(dto).unwrap();
        assert_eq!(created.game_id, GameId::new("MP11700000000"));
        assert_eq!(created.bet_amount, 50);
        assert_eq!(created.state, GameState::Waiting);
    }

    #[test]
    fn create_game__missing_game_id_is_reported() {
        let dto: CreateGameDto = decode(r#"{"status": "waiting", "bet_amount": 50}"#);
        let err = CreatedGame::try_from(dto).unwrap_err();
        assert!(matches!(
            err,
            ApiError::MissingField {
                field: "game_id",
                ..
            }
        ));
    }

    #[test]
    fn select_number__accepts_integer_cards() {
        let raw = format!(
            r#"{{"status": "card_generated", "card_numbers": {:?}, "selected_number": 7}}"#,
            (0..25).collect::<Vec<u8>>()
        );
        let card = decode::<CardDto>(&raw).into_selected_card().unwrap();
        assert_eq!(card.value(24), Some(24));
    }

    #[test]
    fn select_number__short_card_is_invalid() {
        let err = decode::<CardDto>(r#"{"card_numbers": [1, 2, 3]}"#)
            .into_selected_card()
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCard(CardError::WrongSize(3))));
    }

    #[test]
    fn accept_card__requires_accepted_status() {
        let err = decode::<CardDto>(r#"{"status": "failed"}"#)
            .into_accepted_card()
            .unwrap_err();
        assert_eq!(err.rejection(), Some("failed"));
    }

    #[test]
    fn call_number__invalid_status_without_number_is_rejected() {
        let dto: CallNumberDto = decode(r#"{"status": "invalid"}"#);
        let err = CalledNumber::try_from(dto).unwrap_err();
        assert_eq!(err.rejection(), Some("invalid"));
    }

    #[test]
    fn call_number__mixed_called_list_is_normalised() {
        let dto: CallNumberDto =
            decode(r#"{"number": 12, "called_numbers": ["3", "12"], "remaining": 98}"#);
        let called = CalledNumber::try_from(dto).unwrap();
        assert_eq!(called.number, 12);
        assert_eq!(called.called_numbers, vec![3, 12]);
        assert_eq!(called.remaining, 98);
    }

    #[test]
    fn check_bingo__absent_flags_default_to_false() {
        let verdict: BingoVerdict = decode::<CheckBingoDto>(r#"{"message": "Card not found"}"#).into();
        assert_eq!(verdict.message, "Card not found");
        assert!(!verdict.won);
        assert!(!verdict.kicked);
    }

    #[test]
    fn withdrawal__reason_is_surfaced() {
        let dto: WithdrawalDto = decode(
            r#"{"status": "failed", "reason": "Wallet must be at least 100 ETB to request withdrawal"}"#,
        );
        let err = WithdrawalReceipt::try_from(dto).unwrap_err();
        assert_eq!(
            err.rejection(),
            Some("Wallet must be at least 100 ETB to request withdrawal")
        );
    }

    #[test]
    fn pending_withdrawals__unauthorized_envelope_is_rejected() {
        let dto: PendingWithdrawalsDto = decode(r#"{"status": "unauthorized"}"#);
        let err = Vec::<PendingWithdrawal>::try_from(dto).unwrap_err();
        assert_eq!(err.rejection(), Some("unauthorized"));
    }

    #[test]
    fn user_data__error_field_is_rejection() {
        let err = UserProfile::try_from(decode::<UserDataDto>(r#"{"error": "User not found"}"#))
            .unwrap_err();
        assert_eq!(err.rejection(), Some("User not found"));
    }

    #[test]
    fn admin_action__start_game_payload_carries_prize_for_both_fields() {
        // given
        let action = AdminAction::StartGame {
            game_id: GameId::new("MP1"),
            prize_amount: 300,
        };

        // when
        let payload = action.payload(&UserId::new("9"));

        // then
        assert_eq!(
            payload,
            json!({
                "user_id": 9,
                "action": "start_game",
                "game_id": "MP1",
                "prize_amount": 300,
                "bet_amount": 300,
            })
        );
    }

    #[test]
    fn admin_action__manage_withdrawal_payload_uses_action_type() {
        let action = AdminAction::ManageWithdrawal {
            withdraw_id: String::from("W91"),
            decision: WithdrawalDecision::Reject,
            note: String::from("duplicate"),
        };
        let payload = action.payload(&UserId::new("9"));
        assert_eq!(payload["action"], "manage_withdrawal");
        assert_eq!(payload["action_type"], "reject");
        assert_eq!(payload["admin_note"], "duplicate");
    }

    #[test]
    fn new__rejects_non_http_schemes() {
        let err = ApiClient::new("ftp://example.com").err().unwrap();
        assert_eq!(err.to_string(), "invalid URL scheme: ftp (expected http or https)");
        assert!(ApiClient::new("http://localhost:5000/api").is_ok());
    }

    #[test]
    fn new__keeps_api_prefix_when_joining_endpoints() {
        let client = ApiClient::new("https://bingo.example/api").unwrap();
        let url = client.endpoint("user_data").unwrap();
        assert_eq!(url.as_str(), "https://bingo.example/api/user_data");
    }

    #[test]
    fn parse_timestamp__accepts_iso_and_rfc_formats() {
        assert!(parse_timestamp("2025-03-01T10:15:00").is_some());
        assert!(parse_timestamp("2025-03-01T10:15:00+03:00").is_some());
        assert!(parse_timestamp("Sat, 01 Mar 2025 10:15:00 GMT").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
