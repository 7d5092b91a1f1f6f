use thiserror::Error;
use tracing::{
    info,
    warn,
};

use crate::api::{
    AdminAction,
    AdminOutcome,
    ApiError,
    BingoApi,
    GameId,
    PendingWithdrawal,
    UserId,
    WithdrawalDecision,
};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("admin access not authorized")]
    NotAuthorized,
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("prize amount must be a whole number of ETB")]
    InvalidPrize,
    #[error("promotion goes through add_admin, not admin_actions")]
    NotAnAction,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Admin operations that take their input from a one-line prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminCommand {
    Promote,
    StartGame,
    EndGame,
    VerifyPayment,
    KickUser,
}

impl AdminCommand {
    pub const ALL: [AdminCommand; 5] = [
        AdminCommand::Promote,
        AdminCommand::StartGame,
        AdminCommand::EndGame,
        AdminCommand::VerifyPayment,
        AdminCommand::KickUser,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AdminCommand::Promote => "👑 Promote to admin",
            AdminCommand::StartGame => "▶ Start game",
            AdminCommand::EndGame => "⏹ End game",
            AdminCommand::VerifyPayment => "✅ Verify payment",
            AdminCommand::KickUser => "🚪 Kick user",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            AdminCommand::Promote => "User ID",
            AdminCommand::StartGame => "Game ID and prize (e.g. MP123 500)",
            AdminCommand::EndGame => "Game ID",
            AdminCommand::VerifyPayment => "Transaction ID",
            AdminCommand::KickUser => "User ID to kick",
        }
    }
}

/// Parses prompt input into the action it stands for. `Promote` is not an
/// `admin_actions` call and is handled by [`AdminService::promote`].
pub fn parse_action(command: AdminCommand, input: &str) -> Result<AdminAction, AdminError> {
    let mut words = input.split_whitespace();
    match command {
        AdminCommand::StartGame => {
            let game_id = words.next().ok_or(AdminError::Missing("game ID"))?;
            let prize_amount = match words.next() {
                Some(raw) => raw.parse().map_err(|_| AdminError::InvalidPrize)?,
                None => 0,
            };
            Ok(AdminAction::StartGame {
                game_id: GameId::new(game_id),
                prize_amount,
            })
        }
        AdminCommand::EndGame => {
            let game_id = words.next().ok_or(AdminError::Missing("game ID"))?;
            Ok(AdminAction::EndGame {
                game_id: GameId::new(game_id),
            })
        }
        AdminCommand::VerifyPayment => {
            let tx_id = words.next().ok_or(AdminError::Missing("transaction ID"))?;
            Ok(AdminAction::VerifyPayment {
                tx_id: tx_id.to_string(),
            })
        }
        AdminCommand::KickUser => {
            let target = words.next().ok_or(AdminError::Missing("user ID"))?;
            Ok(AdminAction::KickUser {
                target_user_id: UserId::new(target),
            })
        }
        AdminCommand::Promote => Err(AdminError::NotAnAction),
    }
}

impl AdminOutcome {
    pub fn summary(&self) -> String {
        let amount = self.amount.unwrap_or_default();
        let user = self
            .user_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let mut line = match self.status.as_str() {
            "verified" => format!("✅ {amount} ETB credited to {user}"),
            "approved" => format!("✅ {amount} ETB withdrawn for User {user}"),
            "failed" | "unauthorized" | "rejected" => format!("❌ {}", self.status),
            status => format!("✅ {status}!"),
        };
        if let Some(prize) = self.prize_amount.filter(|p| *p != 0) {
            line.push_str(&format!(" | Prize: {prize} ETB"));
        }
        line
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminPanel {
    pub pending: Vec<PendingWithdrawal>,
}

#[derive(Clone)]
pub struct AdminService<A: BingoApi> {
    api: A,
    user_id: UserId,
}

impl<A: BingoApi> AdminService<A> {
    pub fn new(api: A, user_id: UserId) -> Self {
        Self { api, user_id }
    }

    /// Errors hide the admin menu rather than surfacing.
    pub async fn is_admin(&self) -> bool {
        match self.api.user_data(&self.user_id).await {
            Ok(profile) => profile.is_admin(),
            Err(err) => {
                warn!(?err, "admin check failed");
                false
            }
        }
    }

    pub async fn open_panel(&self) -> Result<AdminPanel, AdminError> {
        let profile = self
            .api
            .user_data(&self.user_id)
            .await
            .map_err(|_| AdminError::NotAuthorized)?;
        if !profile.is_admin() {
            return Err(AdminError::NotAuthorized);
        }
        let pending = self.api.pending_withdrawals(&self.user_id).await?;
        Ok(AdminPanel { pending })
    }

    pub async fn promote(&self, target: &str) -> Result<String, AdminError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(AdminError::Missing("user ID"));
        }
        let target = UserId::new(target);
        self.api.add_admin(&self.user_id, &target).await?;
        info!(%target, "user promoted to admin");
        Ok(format!("User {target} promoted to admin successfully!"))
    }

    pub async fn run(&self, action: &AdminAction) -> Result<AdminOutcome, AdminError> {
        let outcome = self.api.admin_action(&self.user_id, action).await?;
        info!(action = action.name(), status = %outcome.status, "admin action done");
        Ok(outcome)
    }

    pub async fn run_command(
        &self,
        command: AdminCommand,
        input: &str,
    ) -> Result<String, AdminError> {
        if command == AdminCommand::Promote {
            return self.promote(input).await;
        }
        let action = parse_action(command, input)?;
        Ok(self.run(&action).await?.summary())
    }

    /// Approves or rejects a withdrawal, then reloads the panel.
    pub async fn manage_withdrawal(
        &self,
        withdraw_id: &str,
        decision: WithdrawalDecision,
        note: &str,
    ) -> Result<(AdminOutcome, AdminPanel), AdminError> {
        let outcome = self
            .run(&AdminAction::ManageWithdrawal {
                withdraw_id: withdraw_id.to_string(),
                decision,
                note: note.to_string(),
            })
            .await?;
        let panel = self.open_panel().await?;
        Ok((outcome, panel))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::api::Amount;
    use crate::test_helpers::{
        Call,
        FakeApi,
        FakeFailure,
        profile,
    };

    fn outcome(status: &str) -> AdminOutcome {
        AdminOutcome {
            status: status.to_string(),
            user_id: Some(UserId::new("7")),
            amount: Some(Amount::whole(150)),
            prize_amount: None,
        }
    }

    #[test]
    fn parse_action__start_game_reads_prize() {
        let action = parse_action(AdminCommand::StartGame, "MP1 500").unwrap();
        assert_eq!(
            action,
            AdminAction::StartGame {
                game_id: GameId::new("MP1"),
                prize_amount: 500,
            }
        );
        assert!(matches!(
            parse_action(AdminCommand::StartGame, "MP1 lots"),
            Err(AdminError::InvalidPrize)
        ));
        assert!(matches!(
            parse_action(AdminCommand::EndGame, "  "),
            Err(AdminError::Missing("game ID"))
        ));
    }

    #[test]
    fn summary__describes_known_statuses() {
        assert_eq!(outcome("verified").summary(), "✅ 150 ETB credited to 7");
        assert_eq!(outcome("approved").summary(), "✅ 150 ETB withdrawn for User 7");
        assert_eq!(outcome("rejected").summary(), "❌ rejected");
        let mut started = outcome("started");
        started.prize_amount = Some(300);
        assert_eq!(started.summary(), "✅ started! | Prize: 300 ETB");
    }

    #[tokio::test]
    async fn is_admin__errors_hide_menu() {
        let api = FakeApi::default();
        api.queue_user_data(Err(FakeFailure::Unavailable))
            .queue_user_data(Ok(profile(None, 0, "admin")));
        let service = AdminService::new(api, UserId::new("1"));
        assert!(!service.is_admin().await);
        assert!(service.is_admin().await);
    }

    #[tokio::test]
    async fn open_panel__non_admin_is_not_authorized() {
        // given
        let api = FakeApi::default();
        api.always_user_data(Ok(profile(None, 0, "user")));
        let service = AdminService::new(api.clone(), UserId::new("1"));

        // when
        let result = service.open_panel().await;

        // then
        assert!(matches!(result, Err(AdminError::NotAuthorized)));
        assert_eq!(api.count_calls("pending_withdrawals"), 0);
    }

    #[tokio::test]
    async fn promote__requires_target() {
        let api = FakeApi::default();
        let service = AdminService::new(api.clone(), UserId::new("1"));
        assert!(matches!(
            service.promote(" ").await,
            Err(AdminError::Missing("user ID"))
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn manage_withdrawal__reloads_panel() {
        // given
        let api = FakeApi::default();
        api.always_user_data(Ok(profile(None, 0, "admin")))
            .queue_admin_action(Ok(outcome("approved")))
            .queue_pending_withdrawals(Ok(Vec::new()));
        let service = AdminService::new(api.clone(), UserId::new("1"));

        // when
        let (result, panel) = service
            .manage_withdrawal("W1", WithdrawalDecision::Approve, "paid")
            .await
            .unwrap();

        // then
        assert_eq!(result.status, "approved");
        assert!(panel.pending.is_empty());
        assert_eq!(
            api.calls(),
            vec![
                Call::AdminAction(AdminAction::ManageWithdrawal {
                    withdraw_id: String::from("W1"),
                    decision: WithdrawalDecision::Approve,
                    note: String::from("paid"),
                }),
                Call::UserData,
                Call::PendingWithdrawals,
            ]
        );
    }
}
