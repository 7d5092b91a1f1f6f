use crate::app::AppSnapshot;
use bingo_client::{
    account::WithdrawalForm,
    admin::AdminCommand,
    api::{
        Contact,
        UserId,
        WithdrawalDecision,
    },
    card::{
        BingoCard,
        CARD_SIDE,
        COLUMN_LETTERS,
        MarkedCard,
    },
    locale::{
        Locale,
        Message,
    },
    session::{
        BET_OPTIONS,
        Intent,
        MAX_NUMBER,
        MIN_NUMBER,
        NoticeKind,
        Phase,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use itertools::Itertools;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::{
    collections::BTreeSet,
    io::stdout,
};

const NUMBERS_PER_ROW: u8 = 10;
const VISIBLE_NOTICES: usize = 5;

pub type InputEventReceiver = EventStream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Open(Screen),
    Refresh,
    Session(Intent),
    SubmitWithdrawal(WithdrawalForm),
    SendInvites(Vec<UserId>),
    RunAdmin {
        command: AdminCommand,
        input: String,
    },
    ManageWithdrawal {
        withdraw_id: String,
        decision: WithdrawalDecision,
        note: String,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Welcome,
    Menu,
    Join,
    Wallet,
    Withdraw,
    Leaderboard,
    Invite,
    Admin,
}

impl Screen {
    fn heading(self, locale: Locale) -> &'static str {
        match self {
            Screen::Welcome => "Bingo",
            Screen::Menu => "Menu",
            Screen::Join => locale.text(Message::JoinHeading),
            Screen::Wallet => locale.text(Message::WalletHeading),
            Screen::Withdraw => locale.text(Message::WithdrawHeading),
            Screen::Leaderboard => locale.text(Message::LeaderboardHeading),
            Screen::Invite => locale.text(Message::InviteHeading),
            Screen::Admin => locale.text(Message::AdminHeading),
        }
    }
}

fn menu_entries(is_admin: bool) -> Vec<Screen> {
    let mut entries = vec![
        Screen::Join,
        Screen::Wallet,
        Screen::Withdraw,
        Screen::Leaderboard,
        Screen::Invite,
    ];
    if is_admin {
        entries.push(Screen::Admin);
    }
    entries
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    screen: Screen,
    night_mode: bool,
    menu_idx: usize,
    bet_idx: usize,
    number_cursor: u8,
    card_cursor: usize,
    withdraw: WithdrawalForm,
    contact_idx: usize,
    selected_contacts: BTreeSet<usize>,
    withdrawal_idx: usize,
    // cached from the last snapshot for key handling
    phase: Phase,
    menu: Vec<Screen>,
    contacts: Vec<Contact>,
    pending_ids: Vec<String>,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            screen: Screen::Welcome,
            night_mode: false,
            menu_idx: 0,
            bet_idx: 0,
            number_cursor: MIN_NUMBER,
            card_cursor: 0,
            withdraw: WithdrawalForm::default(),
            contact_idx: 0,
            selected_contacts: BTreeSet::new(),
            withdrawal_idx: 0,
            phase: Phase::NoSession,
            menu: menu_entries(false),
            contacts: Vec::new(),
            pending_ids: Vec::new(),
            terminal: None,
        }
    }
}

impl UiState {
    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn show(&mut self, screen: Screen) {
        self.screen = screen;
        self.mode = Mode::Normal;
    }

    pub fn clear_withdrawal_form(&mut self) {
        self.withdraw.amount.clear();
    }

    pub fn clear_invite_selection(&mut self) {
        self.selected_contacts.clear();
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
    AdminPrompt(PromptState),
    NoteModal(NoteState),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PromptState {
    command: AdminCommand,
    input: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct NoteState {
    withdraw_id: String,
    decision: WithdrawalDecision,
    note: String,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(input: &mut InputEventReceiver) -> Result<Event> {
    let event = input
        .next()
        .await
        .ok_or_else(|| eyre!("terminal input stream closed"))??;
    Ok(event)
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    state.phase = snap.session.phase().clone();
    state.menu = menu_entries(snap.is_admin);
    state.menu_idx = state.menu_idx.min(state.menu.len() - 1);
    state.contacts = snap
        .invite
        .as_ref()
        .map(|page| page.contacts.clone())
        .unwrap_or_default();
    state.contact_idx = state.contact_idx.min(state.contacts.len().saturating_sub(1));
    let contact_count = state.contacts.len();
    state.selected_contacts.retain(|idx| *idx < contact_count);
    state.pending_ids = snap
        .admin
        .as_ref()
        .map(|panel| {
            panel
                .pending
                .iter()
                .map(|w| w.withdraw_id.clone())
                .collect()
        })
        .unwrap_or_default();
    state.withdrawal_idx = state
        .withdrawal_idx
        .min(state.pending_ids.len().saturating_sub(1));
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(k) if k.kind == KeyEventKind::Press => interpret_key(state, k),
        Event::Resize(..) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn interpret_key(state: &mut UiState, k: KeyEvent) -> Option<UserEvent> {
    if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }
    match &mut state.mode {
        Mode::QuitModal => {
            return match k.code {
                KeyCode::Char('y') | KeyCode::Enter => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::AdminPrompt(prompt) => {
            return match k.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let command = prompt.command;
                    let input = std::mem::take(&mut prompt.input);
                    state.mode = Mode::Normal;
                    Some(UserEvent::RunAdmin { command, input })
                }
                KeyCode::Backspace => {
                    prompt.input.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) => {
                    prompt.input.push(c);
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::NoteModal(ns) => {
            return match k.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let event = UserEvent::ManageWithdrawal {
                        withdraw_id: std::mem::take(&mut ns.withdraw_id),
                        decision: ns.decision,
                        note: std::mem::take(&mut ns.note),
                    };
                    state.mode = Mode::Normal;
                    Some(event)
                }
                KeyCode::Backspace => {
                    ns.note.pop();
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) => {
                    ns.note.push(c);
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => {}
    }
    match k.code {
        KeyCode::Char('q') => {
            state.mode = Mode::QuitModal;
            return Some(UserEvent::Redraw);
        }
        KeyCode::Char('n') => {
            state.night_mode = !state.night_mode;
            return Some(UserEvent::Redraw);
        }
        KeyCode::Esc => {
            if matches!(state.screen, Screen::Welcome | Screen::Menu) {
                state.mode = Mode::QuitModal;
            } else {
                state.screen = Screen::Menu;
            }
            return Some(UserEvent::Redraw);
        }
        _ => {}
    }
    match state.screen {
        Screen::Welcome => match k.code {
            KeyCode::Enter => Some(UserEvent::Quit),
            _ => None,
        },
        Screen::Menu => match k.code {
            KeyCode::Up | KeyCode::Char('k') => {
                state.menu_idx = state.menu_idx.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                state.menu_idx = (state.menu_idx + 1).min(state.menu.len() - 1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let screen = state.menu.get(state.menu_idx).copied()?;
                state.screen = screen;
                Some(UserEvent::Open(screen))
            }
            _ => None,
        },
        Screen::Join => join_key(state, k.code),
        Screen::Wallet | Screen::Leaderboard => match k.code {
            KeyCode::Char('r') => Some(UserEvent::Refresh),
            _ => None,
        },
        Screen::Withdraw => match k.code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                state.withdraw.amount.push(c);
                Some(UserEvent::Redraw)
            }
            KeyCode::Backspace => {
                state.withdraw.amount.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Tab | KeyCode::Char('m') => {
                state.withdraw.method = state.withdraw.method.toggled();
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => Some(UserEvent::SubmitWithdrawal(state.withdraw.clone())),
            _ => None,
        },
        Screen::Invite => match k.code {
            KeyCode::Up | KeyCode::Char('k') => {
                state.contact_idx = state.contact_idx.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                state.contact_idx = (state.contact_idx + 1)
                    .min(state.contacts.len().saturating_sub(1));
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(' ') if !state.contacts.is_empty() => {
                if !state.selected_contacts.remove(&state.contact_idx) {
                    state.selected_contacts.insert(state.contact_idx);
                }
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let ids = state
                    .selected_contacts
                    .iter()
                    .filter_map(|idx| state.contacts.get(*idx))
                    .map(|contact| contact.user_id.clone())
                    .collect();
                Some(UserEvent::SendInvites(ids))
            }
            KeyCode::Char('r') => Some(UserEvent::Refresh),
            _ => None,
        },
        Screen::Admin => admin_key(state, k.code),
    }
}

fn join_key(state: &mut UiState, code: KeyCode) -> Option<UserEvent> {
    let intent = match &state.phase {
        Phase::NoSession => match code {
            KeyCode::Enter => Intent::OpenJoin,
            _ => return None,
        },
        Phase::BetSelection => match code {
            KeyCode::Left | KeyCode::Char('h') => {
                state.bet_idx = state.bet_idx.saturating_sub(1);
                return Some(UserEvent::Redraw);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                state.bet_idx = (state.bet_idx + 1).min(BET_OPTIONS.len() - 1);
                return Some(UserEvent::Redraw);
            }
            KeyCode::Enter => Intent::PickBet(BET_OPTIONS[state.bet_idx]),
            _ => return None,
        },
        Phase::NumberSelection { .. } => match code {
            KeyCode::Enter => Intent::SelectNumber(state.number_cursor),
            code => {
                let (dx, dy) = direction(code)?;
                state.number_cursor = step_number(state.number_cursor, dx, dy);
                return Some(UserEvent::Redraw);
            }
        },
        Phase::CardPreview { .. } => match code {
            KeyCode::Char('a') | KeyCode::Enter => Intent::AcceptCard,
            KeyCode::Char('c') => Intent::CancelCard,
            _ => return None,
        },
        Phase::ActiveGame(_) => match code {
            KeyCode::Char('c') => Intent::CallNumber,
            KeyCode::Char('b') => Intent::CheckBingo,
            KeyCode::Char(' ') => Intent::ToggleMark(state.card_cursor),
            code => {
                let (dx, dy) = direction(code)?;
                state.card_cursor = step_cell(state.card_cursor, dx, dy);
                return Some(UserEvent::Redraw);
            }
        },
        Phase::PostWin { .. } => match code {
            KeyCode::Char('c') | KeyCode::Enter => Intent::ContinuePlay,
            KeyCode::Char('b') => Intent::BackToBetSelection,
            _ => return None,
        },
        Phase::Closed => match code {
            KeyCode::Enter => return Some(UserEvent::Quit),
            _ => return None,
        },
    };
    Some(UserEvent::Session(intent))
}

fn admin_key(state: &mut UiState, code: KeyCode) -> Option<UserEvent> {
    let command = match code {
        KeyCode::Up | KeyCode::Char('k') => {
            state.withdrawal_idx = state.withdrawal_idx.saturating_sub(1);
            return Some(UserEvent::Redraw);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.withdrawal_idx =
                (state.withdrawal_idx + 1).min(state.pending_ids.len().saturating_sub(1));
            return Some(UserEvent::Redraw);
        }
        KeyCode::Char(c @ ('y' | 'x')) => {
            let withdraw_id = state.pending_ids.get(state.withdrawal_idx)?.clone();
            let decision = if c == 'y' {
                WithdrawalDecision::Approve
            } else {
                WithdrawalDecision::Reject
            };
            state.mode = Mode::NoteModal(NoteState {
                withdraw_id,
                decision,
                note: String::new(),
            });
            return Some(UserEvent::Redraw);
        }
        KeyCode::Char('r') => return Some(UserEvent::Refresh),
        KeyCode::Char('p') => AdminCommand::Promote,
        KeyCode::Char('s') => AdminCommand::StartGame,
        KeyCode::Char('e') => AdminCommand::EndGame,
        KeyCode::Char('v') => AdminCommand::VerifyPayment,
        KeyCode::Char('u') => AdminCommand::KickUser,
        _ => return None,
    };
    state.mode = Mode::AdminPrompt(PromptState {
        command,
        input: String::new(),
    });
    Some(UserEvent::Redraw)
}

fn direction(code: KeyCode) -> Option<(i32, i32)> {
    match code {
        KeyCode::Left | KeyCode::Char('h') => Some((-1, 0)),
        KeyCode::Right | KeyCode::Char('l') => Some((1, 0)),
        KeyCode::Up | KeyCode::Char('k') => Some((0, -1)),
        KeyCode::Down | KeyCode::Char('j') => Some((0, 1)),
        _ => None,
    }
}

fn step_number(number: u8, dx: i32, dy: i32) -> u8 {
    let per_row = i32::from(NUMBERS_PER_ROW);
    let next = i32::from(number) + dx + dy * per_row;
    next.clamp(i32::from(MIN_NUMBER), i32::from(MAX_NUMBER)) as u8
}

fn step_cell(cell: usize, dx: i32, dy: i32) -> usize {
    let side = CARD_SIDE as i32;
    let row = (cell as i32 / side + dy).clamp(0, side - 1);
    let col = (cell as i32 % side + dx).clamp(0, side - 1);
    (row * side + col) as usize
}

fn theme(state: &UiState) -> Style {
    if state.night_mode {
        Style::default().fg(Color::Gray).bg(Color::Black)
    } else {
        Style::default()
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    f.render_widget(Block::default().style(theme(state)), f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // banner
            Constraint::Min(14),    // current screen
            Constraint::Length(VISIBLE_NOTICES as u16 + 5), // status, errors, notices
            Constraint::Length(3),  // help
        ])
        .split(f.area());

    draw_banner(f, state, chunks[0], snap);
    let body = Block::default()
        .borders(Borders::ALL)
        .title(state.screen.heading(snap.locale));
    let inner = body.inner(chunks[1]);
    f.render_widget(body, chunks[1]);
    match state.screen {
        Screen::Welcome => draw_welcome(f, inner, snap),
        Screen::Menu => draw_menu(f, state, inner, snap),
        Screen::Join => draw_join(f, state, inner, snap),
        Screen::Wallet => draw_wallet(f, inner, snap),
        Screen::Withdraw => draw_withdraw(f, state, inner, snap),
        Screen::Leaderboard => draw_leaderboard(f, inner, snap),
        Screen::Invite => draw_invite(f, state, inner, snap),
        Screen::Admin => draw_admin(f, state, inner, snap),
    }
    draw_messages(f, chunks[2], snap);
    draw_help(f, state, chunks[3]);
    draw_modals(f, state);
}

fn draw_banner(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let title = if state.night_mode { "Bingo 🌙" } else { "Bingo ☀" };
    let widget = Paragraph::new(snap.banner.as_str())
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn draw_welcome(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let lines = vec![
        Line::from(snap.locale.text(Message::Welcome)),
        Line::from(""),
        Line::from(format!("Enter: {}", snap.locale.text(Message::ReturnToBot)))
            .style(Style::default().add_modifier(Modifier::BOLD)),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn draw_menu(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let lines: Vec<Line> = state
        .menu
        .iter()
        .enumerate()
        .map(|(i, screen)| {
            let cur = if i == state.menu_idx { ">" } else { " " };
            let line = Line::from(format!("{cur} {}", screen.heading(snap.locale)));
            if i == state.menu_idx {
                line.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                line
            }
        })
        .collect();
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_join(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let session = snap.session.session();
    let game = session
        .game_id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| String::from("-"));
    let bet = session
        .current_bet
        .map(|b| format!("{b} ETB"))
        .unwrap_or_else(|| String::from("-"));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);
    f.render_widget(
        Paragraph::new(format!("Game: {game} | Bet: {bet}"))
            .style(Style::default().fg(Color::Cyan)),
        rows[0],
    );
    let area = rows[1];

    match snap.session.phase() {
        Phase::NoSession => {
            f.render_widget(Paragraph::new("Press Enter to join a game"), area);
        }
        Phase::BetSelection => {
            let mut spans = vec![Span::raw("Choose your bet: ")];
            for (i, amount) in BET_OPTIONS.iter().enumerate() {
                let style = if i == state.bet_idx {
                    Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
                } else {
                    Style::default()
                };
                spans.push(Span::styled(format!(" {amount} ETB "), style));
                spans.push(Span::raw(" "));
            }
            f.render_widget(Paragraph::new(Line::from(spans)), area);
        }
        Phase::NumberSelection { disabled } => {
            let mut lines = Vec::new();
            if snap.session.is_awaiting_game() {
                lines.push(
                    Line::from("Waiting for a new game...")
                        .style(Style::default().fg(Color::Yellow)),
                );
            } else {
                lines.push(Line::from("Pick your lucky number:"));
            }
            lines.extend(number_grid_lines(disabled, state.number_cursor));
            f.render_widget(Paragraph::new(lines), area);
        }
        Phase::CardPreview { card, .. } => {
            let mut lines = vec![Line::from(format!(
                "Card for number {}:",
                session.selected_number.unwrap_or_default()
            ))];
            lines.extend(card_lines(card, None, None));
            f.render_widget(Paragraph::new(lines), area);
        }
        Phase::ActiveGame(game) => {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(34), Constraint::Min(20)])
                .split(area);
            let card = card_lines(game.card.card(), Some(&game.card), Some(state.card_cursor));
            f.render_widget(Paragraph::new(card), cols[0]);

            let mut info = Vec::new();
            let called = game.called_numbers();
            let latest = match (&game.last_call, called.last()) {
                (Some(call), _) if call.called_numbers.len() == called.len() => {
                    format!("Called: {} ({} left)", call.number, call.remaining)
                }
                (_, Some(n)) => format!("Called: {n}"),
                (_, None) => String::from("No number called yet"),
            };
            info.push(Line::from(latest).style(Style::default().add_modifier(Modifier::BOLD)));
            if !called.is_empty() {
                info.push(Line::from(format!("All called: {}", join_numbers(called))));
            }
            let inactive = game.inactive_numbers();
            if !inactive.is_empty() {
                info.push(Line::from(format!("Inactive numbers: {}", join_numbers(inactive))));
            }
            if let Some(status) = &game.status {
                info.push(Line::from(status.summary_line()));
            }
            info.push(Line::from(format!(
                "Marked: {} | Polling: {}",
                game.card.marked_count(),
                if snap.polling { "on" } else { "off" }
            )));
            f.render_widget(Paragraph::new(info).wrap(Wrap { trim: false }), cols[1]);
        }
        Phase::PostWin {
            bet_amount,
            winner,
            summary,
        } => {
            let winner = winner
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| String::from("None"));
            let again = bet_amount
                .map(|b| format!("c: continue with {b} ETB"))
                .unwrap_or_else(|| String::from("c: continue"));
            let lines = vec![
                Line::from(format!("🏆 Winner: {winner}"))
                    .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                Line::from(summary.as_str()),
                Line::from(""),
                Line::from(format!("{again} | b: back to bet selection")),
            ];
            f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
        }
        Phase::Closed => {
            f.render_widget(
                Paragraph::new("Session closed. Press Enter to leave.")
                    .style(Style::default().fg(Color::Red)),
                area,
            );
        }
    }
}

fn number_grid_lines(disabled: &BTreeSet<u8>, cursor: u8) -> Vec<Line<'static>> {
    (MIN_NUMBER..=MAX_NUMBER)
        .collect::<Vec<_>>()
        .chunks(NUMBERS_PER_ROW as usize)
        .map(|row| {
            let spans: Vec<Span> = row
                .iter()
                .map(|n| {
                    let mut style = Style::default();
                    if disabled.contains(n) {
                        style = style
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::CROSSED_OUT);
                    }
                    if *n == cursor {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    Span::styled(format!("{n:>4}"), style)
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn card_lines(
    card: &BingoCard,
    marks: Option<&MarkedCard>,
    cursor: Option<usize>,
) -> Vec<Line<'static>> {
    let header: String = COLUMN_LETTERS.iter().map(|c| format!("{c:^6}")).collect();
    let mut lines = vec![Line::from(header).style(Style::default().add_modifier(Modifier::BOLD))];
    for row in 0..CARD_SIDE {
        let spans: Vec<Span> = (0..CARD_SIDE)
            .map(|col| {
                let idx = row * CARD_SIDE + col;
                let mut style = Style::default();
                if marks.is_some_and(|m| m.is_marked(idx)) {
                    style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
                }
                if cursor == Some(idx) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Span::styled(format!("{:^6}", card.label(idx)), style)
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines
}

fn join_numbers(numbers: &[u8]) -> String {
    numbers.iter().join(", ")
}

fn draw_wallet(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let locale = snap.locale;
    let lines = match &snap.wallet {
        Some(w) => vec![
            Line::from(format!("{}: {} ETB", locale.text(Message::WalletBalance), w.wallet)),
            Line::from(format!("{}: {}", locale.text(Message::WalletWins), w.wins)),
            Line::from(format!(
                "{}: {} ETB",
                locale.text(Message::WalletReferrals),
                w.referral_earnings
            )),
            Line::from(format!(
                "{}: {}",
                locale.text(Message::WalletInvalidBingo),
                w.invalid_bingo_count
            )),
        ],
        None => vec![Line::from("Loading...")],
    };
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_withdraw(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let lines = vec![
        Line::from(format!(
            "{}: {}_",
            snap.locale.text(Message::WithdrawAmount),
            state.withdraw.amount
        )),
        Line::from(format!("Method: {}", state.withdraw.method.label())),
        Line::from(""),
        Line::from("digits: amount | Tab/m: switch method | Enter: request"),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_leaderboard(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let locale = snap.locale;
    let mut lines = vec![
        Line::from(format!(
            "{:<6}{:<24}{}",
            locale.text(Message::LeaderboardRank),
            locale.text(Message::LeaderboardName),
            locale.text(Message::LeaderboardScore)
        ))
        .style(Style::default().add_modifier(Modifier::BOLD)),
    ];
    for (i, entry) in snap.leaderboard.iter().enumerate() {
        lines.push(Line::from(format!(
            "{:<6}{:<24}{}",
            i + 1,
            entry.username,
            entry.score
        )));
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_invite(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let locale = snap.locale;
    let Some(page) = &snap.invite else {
        f.render_widget(Paragraph::new("Loading..."), area);
        return;
    };
    let mut lines = vec![
        Line::from(locale.text(Message::InviteBlurb)),
        Line::from(format!("{}: {}", locale.text(Message::InviteLink), page.referral_link)),
        Line::from(format!(
            "{}: {} | {}: {} ETB",
            locale.text(Message::InviteReferrals),
            page.successful_referrals,
            locale.text(Message::InviteBonus),
            page.bonus
        )),
    ];
    if !page.contacts.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(locale.text(Message::InviteSelectFriends)));
        for (i, contact) in page.contacts.iter().enumerate() {
            let cur = if i == state.contact_idx { ">" } else { " " };
            let mark = if state.selected_contacts.contains(&i) {
                "[x]"
            } else {
                "[ ]"
            };
            lines.push(Line::from(format!("{cur} {mark} {}", contact.display_name())));
        }
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn draw_admin(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let mut lines = vec![
        Line::from(snap.locale.text(Message::AdminPendingWithdrawals))
            .style(Style::default().add_modifier(Modifier::BOLD)),
    ];
    match &snap.admin {
        Some(panel) if panel.pending.is_empty() => lines.push(Line::from("None")),
        Some(panel) => {
            for (i, w) in panel.pending.iter().enumerate() {
                let cur = if i == state.withdrawal_idx { ">" } else { " " };
                let requested = w
                    .request_time
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                lines.push(Line::from(format!(
                    "{cur} {} | User {} | {} ETB | {} | {requested}",
                    w.withdraw_id, w.user_id, w.amount, w.method
                )));
            }
        }
        None => lines.push(Line::from(snap.locale.text(Message::AdminNotAuthorized))),
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), cols[0]);

    let keys = ['p', 's', 'e', 'v', 'u'];
    let commands: Vec<Line> = AdminCommand::ALL
        .iter()
        .zip(keys)
        .map(|(command, key)| Line::from(format!("{key}: {}", command.label())))
        .chain([Line::from("y/x: approve/reject selected")])
        .collect();
    f.render_widget(
        Paragraph::new(commands).block(Block::default().borders(Borders::LEFT)),
        cols[1],
    );
}

fn draw_messages(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines: Vec<Line> = Vec::new();
    if snap.status.trim().is_empty() {
        lines.push(Line::from("Ready").style(Style::default().fg(Color::Green)));
    } else {
        lines.push(Line::from(snap.status.clone()).style(Style::default().fg(Color::Green)));
    }
    for e in snap.errors.iter().rev().take(2) {
        lines.push(Line::from(e.clone()).style(Style::default().fg(Color::Red)));
    }
    let start = snap.notices.len().saturating_sub(VISIBLE_NOTICES);
    for notice in &snap.notices[start..] {
        let line = match notice.kind {
            NoticeKind::Info => Line::from(notice.text.clone()),
            NoticeKind::Rejected => {
                Line::from(notice.text.clone()).style(Style::default().fg(Color::Red))
            }
            NoticeKind::Network => Line::from(snap.locale.network_error(&notice.text))
                .style(Style::default().fg(Color::Red)),
        };
        lines.push(line);
    }
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, state: &UiState, area: Rect) {
    let text = match state.screen {
        Screen::Welcome => "Enter return to bot | n night mode | q quit",
        Screen::Menu => "↑/↓ select | Enter open | n night mode | q/Esc quit",
        Screen::Join => match state.phase {
            Phase::NoSession => "Enter join | Esc menu",
            Phase::BetSelection => "←/→ bet | Enter confirm | Esc menu",
            Phase::NumberSelection { .. } => "arrows move | Enter pick number | Esc menu",
            Phase::CardPreview { .. } => "a accept card | c cancel | Esc menu",
            Phase::ActiveGame(_) => "c call number | b bingo! | arrows + space mark | Esc menu",
            Phase::PostWin { .. } => "c continue | b back to bets | Esc menu",
            Phase::Closed => "Enter leave",
        },
        Screen::Wallet | Screen::Leaderboard => "r refresh | Esc menu",
        Screen::Withdraw => "digits amount | Tab method | Enter request | Esc menu",
        Screen::Invite => "↑/↓ move | space select | Enter send invites | r refresh | Esc menu",
        Screen::Admin => "↑/↓ withdrawal | y/x approve/reject | p s e v u actions | r reload | Esc menu",
    };
    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    match &state.mode {
        Mode::QuitModal => {
            let area = centered_rect(30, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Quit");
            let p = Paragraph::new("Quit the game?\ny = yes, n = no");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::AdminPrompt(prompt) => {
            let area = centered_rect(50, 25, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title(prompt.command.label());
            let p = Paragraph::new(format!(
                "{}: {}_\nEnter=confirm Esc=cancel",
                prompt.command.prompt(),
                prompt.input
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::NoteModal(ns) => {
            let area = centered_rect(50, 25, f.area());
            let title = match ns.decision {
                WithdrawalDecision::Approve => "Approve withdrawal",
                WithdrawalDecision::Reject => "Reject withdrawal",
            };
            let block = Block::default().borders(Borders::ALL).title(title);
            let p = Paragraph::new(format!(
                "{}\nAdmin note: {}_\nEnter=confirm Esc=cancel",
                ns.withdraw_id, ns.note
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    horizontal[1]
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use bingo_client::card::CARD_CELLS;

    fn sample_card() -> BingoCard {
        BingoCard::from_values((1..=25).collect()).unwrap()
    }

    fn press(state: &mut UiState, code: KeyCode) -> Option<UserEvent> {
        interpret_event(state, Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    #[test]
    fn interpret_event__menu_enter_opens_selected_screen() {
        // given
        let mut state = UiState::default();
        state.show(Screen::Menu);

        // when
        press(&mut state, KeyCode::Down);
        let event = press(&mut state, KeyCode::Enter);

        // then
        assert_eq!(event, Some(UserEvent::Open(Screen::Wallet)));
        assert_eq!(state.screen(), Screen::Wallet);
    }

    #[test]
    fn interpret_event__bet_selection_confirms_highlighted_bet() {
        let mut state = UiState::default();
        state.show(Screen::Join);
        state.phase = Phase::BetSelection;
        press(&mut state, KeyCode::Right);
        press(&mut state, KeyCode::Right);
        assert_eq!(
            press(&mut state, KeyCode::Enter),
            Some(UserEvent::Session(Intent::PickBet(100)))
        );
    }

    #[test]
    fn interpret_event__number_cursor_stays_in_range() {
        let mut state = UiState::default();
        state.show(Screen::Join);
        state.phase = Phase::NumberSelection {
            disabled: BTreeSet::new(),
        };
        press(&mut state, KeyCode::Up);
        press(&mut state, KeyCode::Left);
        assert_eq!(state.number_cursor, MIN_NUMBER);
        press(&mut state, KeyCode::Down);
        press(&mut state, KeyCode::Right);
        assert_eq!(
            press(&mut state, KeyCode::Enter),
            Some(UserEvent::Session(Intent::SelectNumber(12)))
        );
    }

    #[test]
    fn interpret_event__active_game_keys_map_to_intents() {
        let mut state = UiState::default();
        state.show(Screen::Join);
        state.phase = Phase::ActiveGame(bingo_client::session::ActiveGame {
            card: MarkedCard::new(sample_card()),
            status: None,
            last_call: None,
        });
        assert_eq!(
            press(&mut state, KeyCode::Char('c')),
            Some(UserEvent::Session(Intent::CallNumber))
        );
        assert_eq!(
            press(&mut state, KeyCode::Char('b')),
            Some(UserEvent::Session(Intent::CheckBingo))
        );
        press(&mut state, KeyCode::Down);
        press(&mut state, KeyCode::Right);
        assert_eq!(
            press(&mut state, KeyCode::Char(' ')),
            Some(UserEvent::Session(Intent::ToggleMark(6)))
        );
    }

    #[test]
    fn interpret_event__quit_modal_needs_confirmation() {
        let mut state = UiState::default();
        state.show(Screen::Menu);
        assert_eq!(press(&mut state, KeyCode::Char('q')), Some(UserEvent::Redraw));
        assert_eq!(press(&mut state, KeyCode::Char('n')), Some(UserEvent::Redraw));
        assert_eq!(state.mode, Mode::Normal);
        press(&mut state, KeyCode::Char('q'));
        assert_eq!(press(&mut state, KeyCode::Char('y')), Some(UserEvent::Quit));
    }

    #[test]
    fn interpret_event__admin_prompt_collects_input() {
        // given
        let mut state = UiState::default();
        state.show(Screen::Admin);

        // when
        press(&mut state, KeyCode::Char('s'));
        for c in "MP1 500".chars() {
            press(&mut state, KeyCode::Char(c));
        }
        let event = press(&mut state, KeyCode::Enter);

        // then
        assert_eq!(
            event,
            Some(UserEvent::RunAdmin {
                command: AdminCommand::StartGame,
                input: String::from("MP1 500"),
            })
        );
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_event__withdraw_form_takes_digits_only() {
        let mut state = UiState::default();
        state.show(Screen::Withdraw);
        for c in ['1', 'x', '5', '0'] {
            press(&mut state, KeyCode::Char(c));
        }
        press(&mut state, KeyCode::Tab);
        let Some(UserEvent::SubmitWithdrawal(form)) = press(&mut state, KeyCode::Enter) else {
            panic!("expected a withdrawal submission");
        };
        assert_eq!(form.amount, "150");
        assert_eq!(form.method, bingo_client::api::PayoutMethod::Cbe);
    }

    #[test]
    fn step_cell__clamps_to_card_edges() {
        assert_eq!(step_cell(0, -1, -1), 0);
        assert_eq!(step_cell(CARD_CELLS - 1, 1, 1), CARD_CELLS - 1);
        assert_eq!(step_cell(12, 1, 0), 13);
    }
}
