use crate::ui::{
    self,
    Screen,
    UserEvent,
};
use bingo_client::{
    account::{
        self,
        AccountError,
        AccountService,
        FormError,
        InvitePage,
        Registration,
        WalletSummary,
    },
    admin::{
        AdminError,
        AdminPanel,
        AdminService,
    },
    api::{
        ApiClient,
        ApiError,
        LeaderboardEntry,
    },
    config::AppConfig,
    controller::SessionController,
    locale::{
        Locale,
        Message,
    },
    session::{
        Intent,
        Notice,
        Phase,
        Reply,
        SessionState,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use tokio::sync::mpsc;
use tracing::{
    error,
    info,
};

const MAX_ERRORS: usize = 50;

/// Everything one frame needs, detached from the controller.
#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub locale: Locale,
    pub banner: String,
    pub is_admin: bool,
    pub session: SessionState,
    pub polling: bool,
    pub notices: Vec<Notice>,
    pub wallet: Option<WalletSummary>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub invite: Option<InvitePage>,
    pub admin: Option<AdminPanel>,
    pub status: String,
    pub errors: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct AppController {
    locale: Locale,
    session: SessionController<ApiClient>,
    account: AccountService<ApiClient>,
    admin: AdminService<ApiClient>,
    banner: String,
    is_admin: bool,
    wallet: Option<WalletSummary>,
    leaderboard: Vec<LeaderboardEntry>,
    invite: Option<InvitePage>,
    admin_panel: Option<AdminPanel>,
    status: String,
    errors: Vec<String>,
}

impl AppController {
    fn new(config: &AppConfig) -> Result<(Self, mpsc::UnboundedReceiver<Reply>)> {
        let api = ApiClient::new(config.api_url.as_str()).wrap_err("building API client failed")?;
        let user_id = config.identity.user_id.clone();
        let (session, replies) =
            SessionController::new(api.clone(), user_id.clone(), config.poll_interval);
        let controller = AppController {
            locale: config.locale,
            session,
            account: AccountService::new(api.clone(), config.identity.clone()),
            admin: AdminService::new(api, user_id.clone()),
            banner: account::banner(&user_id, None),
            is_admin: false,
            wallet: None,
            leaderboard: Vec::new(),
            invite: None,
            admin_panel: None,
            status: String::new(),
            errors: Vec::new(),
        };
        Ok((controller, replies))
    }

    /// Registration check; picks the first screen.
    async fn start(&mut self) -> Screen {
        match self.account.check_registration().await {
            Registration::Registered(profile) => {
                self.banner = account::banner(self.session.user_id(), Some(&profile));
                self.is_admin = profile.is_admin();
                Screen::Menu
            }
            Registration::Unregistered => Screen::Welcome,
        }
    }

    fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            locale: self.locale,
            banner: self.banner.clone(),
            is_admin: self.is_admin,
            session: self.session.state().clone(),
            polling: self.session.is_polling(),
            notices: self.session.notices().to_vec(),
            wallet: self.wallet.clone(),
            leaderboard: self.leaderboard.clone(),
            invite: self.invite.clone(),
            admin: self.admin_panel.clone(),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn push_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        error!(error = %msg, "action failed");
        self.errors.push(msg);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    fn push_api_error(&mut self, err: ApiError) {
        let msg = match err.rejection() {
            Some(reason) => reason.to_string(),
            None => self.locale.network_error(&err.to_string()),
        };
        self.push_error(msg);
    }

    fn push_admin_error(&mut self, err: AdminError) {
        match err {
            AdminError::Api(err) => self.push_api_error(err),
            AdminError::NotAuthorized => {
                self.admin_panel = None;
                self.push_error(self.locale.text(Message::AdminNotAuthorized));
            }
            AdminError::Missing("user ID") => {
                self.push_error(self.locale.text(Message::AdminUserIdRequired))
            }
            other => self.push_error(other.to_string()),
        }
    }

    fn farewell(&self) -> Option<String> {
        info!("session closed by the server");
        self.session.latest_notice().map(|n| n.text.clone())
    }

    async fn refresh_banner(&mut self) {
        self.banner = self.account.banner().await;
    }

    async fn dispatch(&mut self, intent: Intent) {
        let before = self.session.state().phase().name();
        self.session.dispatch(intent).await;
        self.after_session_step(before).await;
    }

    async fn deliver(&mut self, reply: Reply) {
        let before = self.session.state().phase().name();
        self.session.deliver(reply).await;
        self.after_session_step(before).await;
    }

    async fn after_session_step(&mut self, before: &'static str) {
        // bets and prizes move the wallet
        if self.session.state().phase().name() != before {
            self.refresh_banner().await;
        }
    }

    async fn load(&mut self, screen: Screen) {
        match screen {
            Screen::Join => {
                if matches!(self.session.state().phase(), Phase::NoSession) {
                    self.dispatch(Intent::OpenJoin).await;
                }
            }
            Screen::Wallet => match self.account.wallet().await {
                Ok(wallet) => self.wallet = Some(wallet),
                Err(err) => self.push_api_error(err),
            },
            Screen::Leaderboard => match self.account.leaderboard().await {
                Ok(entries) => self.leaderboard = entries,
                Err(err) => self.push_api_error(err),
            },
            Screen::Invite => match self.account.invite_page().await {
                Ok(page) => self.invite = Some(page),
                Err(err) => self.push_api_error(err),
            },
            Screen::Admin => match self.admin.open_panel().await {
                Ok(panel) => self.admin_panel = Some(panel),
                Err(err) => self.push_admin_error(err),
            },
            Screen::Welcome | Screen::Menu | Screen::Withdraw => {}
        }
    }

    async fn handle(&mut self, ev: UserEvent, ui_state: &mut ui::UiState) -> Flow {
        match ev {
            UserEvent::Quit => return Flow::Quit,
            UserEvent::Redraw => {}
            UserEvent::Open(screen) => {
                self.set_status("");
                self.load(screen).await;
            }
            UserEvent::Refresh => self.load(ui_state.screen()).await,
            UserEvent::Session(intent) => self.dispatch(intent).await,
            UserEvent::SubmitWithdrawal(form) => match self.account.withdraw(&form).await {
                Ok(receipt) => {
                    self.set_status(format!(
                        "{}: {}",
                        self.locale.text(Message::WithdrawRequested),
                        receipt.withdraw_id
                    ));
                    ui_state.clear_withdrawal_form();
                    self.refresh_banner().await;
                }
                Err(AccountError::Form(FormError::BelowMinimum)) => {
                    self.push_error(self.locale.text(Message::WithdrawMinimum))
                }
                Err(AccountError::Form(err)) => self.push_error(err.to_string()),
                Err(AccountError::Api(err)) => self.push_api_error(err),
            },
            UserEvent::SendInvites(friend_ids) => {
                match self.account.send_invites(&friend_ids).await {
                    Ok(receipt) => {
                        let status = receipt
                            .message
                            .unwrap_or_else(|| format!("✅ {} invites sent", receipt.sent_count));
                        self.set_status(status);
                        ui_state.clear_invite_selection();
                    }
                    Err(AccountError::Form(FormError::NoFriendsSelected)) => {
                        self.push_error(self.locale.text(Message::InviteNoneSelected))
                    }
                    Err(AccountError::Form(err)) => self.push_error(err.to_string()),
                    Err(AccountError::Api(err)) => self.push_api_error(err),
                }
            }
            UserEvent::RunAdmin { command, input } => {
                match self.admin.run_command(command, &input).await {
                    Ok(summary) => {
                        self.set_status(summary);
                        self.refresh_banner().await;
                        self.load(Screen::Admin).await;
                    }
                    Err(err) => self.push_admin_error(err),
                }
            }
            UserEvent::ManageWithdrawal {
                withdraw_id,
                decision,
                note,
            } => match self
                .admin
                .manage_withdrawal(&withdraw_id, decision, &note)
                .await
            {
                Ok((outcome, panel)) => {
                    self.set_status(outcome.summary());
                    self.admin_panel = Some(panel);
                    self.refresh_banner().await;
                }
                Err(err) => self.push_admin_error(err),
            },
        }
        Flow::Continue
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let (controller, replies) = AppController::new(&config)?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    tracing::info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, replies, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    // the terminal is gone; the closing notice is the last thing the player sees
    if let Ok(Some(farewell)) = &res {
        println!("{farewell}");
    }
    res.map(|_| ())
}

async fn run_loop(
    mut controller: AppController,
    mut replies: mpsc::UnboundedReceiver<Reply>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<Option<String>> {
    tracing::info!("Running app loop");
    let screen = controller.start().await;
    ui_state.show(screen);
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            Some(reply) = replies.recv() => {
                controller.deliver(reply).await;
                if controller.session.should_close() {
                    return Ok(controller.farewell());
                }
                ui::draw(ui_state, &controller.snapshot())
                    .wrap_err("draw after status poll failed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                if controller.handle(ev, ui_state).await == Flow::Quit {
                    break;
                }
                if controller.session.should_close() {
                    return Ok(controller.farewell());
                }
                ui::draw(ui_state, &controller.snapshot())
                    .wrap_err("draw after user input failed")?;
            }
        }
    }
    Ok(None)
}
