use thiserror::Error;
use tracing::{
    info,
    warn,
};

use crate::{
    api::{
        Amount,
        ApiError,
        ApiResult,
        BingoApi,
        Contact,
        InviteReceipt,
        LeaderboardEntry,
        PayoutMethod,
        UserId,
        UserProfile,
        WithdrawalReceipt,
    },
    identity::Identity,
};

pub const MIN_WITHDRAWAL: u64 = 100;
/// ETB credited on the wallet page per successful referral.
pub const REFERRAL_REWARD: i64 = 10;
pub const INVITE_BONUS_BATCH: u32 = 20;
pub const INVITE_BONUS: u32 = 10;
pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("enter a whole amount in ETB")]
    InvalidAmount,
    #[error("amount must be at least {MIN_WITHDRAWAL} ETB")]
    BelowMinimum,
    #[error("select at least one friend")]
    NoFriendsSelected,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Registration {
    Registered(UserProfile),
    Unregistered,
}

pub fn banner(user_id: &UserId, profile: Option<&UserProfile>) -> String {
    match profile {
        Some(profile) => {
            let name = profile
                .username
                .clone()
                .unwrap_or_else(|| format!("User_{user_id}"));
            format!("👤 {name} | 💰 {} ETB", profile.wallet)
        }
        None => format!("👤 User_{user_id} | 💰 Loading..."),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletSummary {
    pub wallet: Amount,
    pub wins: i64,
    pub referral_earnings: i64,
    pub invalid_bingo_count: u32,
}

impl From<&UserProfile> for WalletSummary {
    fn from(profile: &UserProfile) -> Self {
        WalletSummary {
            wallet: profile.wallet,
            wins: profile.wins,
            referral_earnings: i64::from(profile.successful_referrals) * REFERRAL_REWARD,
            invalid_bingo_count: profile.invalid_bingo_count,
        }
    }
}

/// Withdrawal form as typed by the player.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WithdrawalForm {
    pub amount: String,
    pub method: PayoutMethod,
}

impl WithdrawalForm {
    pub fn validate(&self) -> Result<u64, FormError> {
        let amount: u64 = self
            .amount
            .trim()
            .parse()
            .map_err(|_| FormError::InvalidAmount)?;
        if amount < MIN_WITHDRAWAL {
            return Err(FormError::BelowMinimum);
        }
        Ok(amount)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvitePage {
    pub referral_link: String,
    pub successful_referrals: u32,
    pub bonus: u32,
    pub contacts: Vec<Contact>,
}

pub fn invite_bonus(successful_referrals: u32) -> u32 {
    (successful_referrals / INVITE_BONUS_BATCH) * INVITE_BONUS
}

/// Account pages around the game: profile, wallet, withdrawals, leaderboard
/// and invitations.
#[derive(Clone)]
pub struct AccountService<A: BingoApi> {
    api: A,
    identity: Identity,
}

impl<A: BingoApi> AccountService<A> {
    pub fn new(api: A, identity: Identity) -> Self {
        Self { api, identity }
    }

    pub async fn profile(&self) -> ApiResult<UserProfile> {
        self.api.user_data(&self.identity.user_id).await
    }

    /// Any failure counts as not registered.
    pub async fn check_registration(&self) -> Registration {
        match self.profile().await {
            Ok(profile) => Registration::Registered(profile),
            Err(err) => {
                warn!(?err, user_id = %self.identity.user_id, "registration check failed");
                Registration::Unregistered
            }
        }
    }

    pub async fn banner(&self) -> String {
        let profile = self.profile().await.ok();
        banner(&self.identity.user_id, profile.as_ref())
    }

    pub async fn wallet(&self) -> ApiResult<WalletSummary> {
        Ok(WalletSummary::from(&self.profile().await?))
    }

    pub async fn withdraw(&self, form: &WithdrawalForm) -> Result<WithdrawalReceipt, AccountError> {
        let amount = form.validate()?;
        let receipt = self
            .api
            .request_withdrawal(&self.identity.user_id, amount, form.method)
            .await?;
        info!(withdraw_id = %receipt.withdraw_id, amount, "withdrawal requested");
        Ok(receipt)
    }

    pub async fn leaderboard(&self) -> ApiResult<Vec<LeaderboardEntry>> {
        let mut entries = self.api.leaderboard().await?;
        entries.truncate(LEADERBOARD_SIZE);
        Ok(entries)
    }

    pub async fn invite_page(&self) -> ApiResult<InvitePage> {
        let profile = self.profile().await?;
        let contacts = if self.identity.can_access_contacts {
            self.api
                .contacts(&self.identity.user_id)
                .await
                .unwrap_or_else(|err| {
                    warn!(?err, "fetching contacts failed");
                    Vec::new()
                })
        } else {
            Vec::new()
        };
        Ok(InvitePage {
            referral_link: self.identity.referral_link(),
            successful_referrals: profile.successful_referrals,
            bonus: invite_bonus(profile.successful_referrals),
            contacts,
        })
    }

    pub async fn send_invites(&self, friend_ids: &[UserId]) -> Result<InviteReceipt, AccountError> {
        if friend_ids.is_empty() {
            return Err(FormError::NoFriendsSelected.into());
        }
        let receipt = self
            .api
            .send_invites(&self.identity.user_id, friend_ids)
            .await?;
        info!(sent = receipt.sent_count, "invites sent");
        Ok(receipt)
    }
}
