pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use lockwrite::{
    app_dirs::AppDirs,
    config::Settings,
    controller::{CloseDecision, SessionController},
    editor::Editor,
    error::ValidationError,
    goal::{count_words, GoalType, SessionConfig},
    history::{export_csv, HistoryDb},
    lockdown::{LockdownEnforcer, TerminalLockdown},
    runtime::{AppEvent, Clock, CrosstermEventSource, FixedTicker, Runner, SystemClock},
    session::{SessionEvent, SessionPhase, SessionSummary},
    storage::{FileGateway, PersistenceGateway},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    env,
    error::Error,
    fs,
    io::{self, stdin},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::ui::{progress::draft_age_label, progress::format_clock, SetupView, View, WritingView};

const TICK_RATE_MS: u64 = 100;
const DEFAULT_HISTORY_LIMIT: &str = "10";
const MAX_GOAL_INPUT_LEN: usize = 6;

/// distraction-free writing sessions that stay locked until you hit your goal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A distraction-free terminal writing app. Pick a word or time goal; in strict mode the session cannot be left until the goal is reached or the emergency phrase is typed."
)]
pub struct Cli {
    /// word goal to pre-fill (10-50000)
    #[clap(short = 'w', long, conflicts_with = "minutes")]
    words: Option<u32>,

    /// time goal in minutes to pre-fill (1-480)
    #[clap(short = 'm', long)]
    minutes: Option<u32>,

    /// lock the session until the goal is reached
    #[clap(long, overrides_with = "no_strict")]
    strict: bool,

    /// allow leaving the session at any time
    #[clap(long = "no-strict", overrides_with = "strict")]
    no_strict: bool,

    /// print the most recent sessions and exit
    #[clap(long, value_name = "N", num_args = 0..=1, default_missing_value = DEFAULT_HISTORY_LIMIT)]
    history: Option<usize>,

    /// write the full session history as CSV and exit
    #[clap(long, value_name = "PATH")]
    export_history: Option<PathBuf>,

    /// empty the saved draft and exit
    #[clap(long)]
    clear_draft: bool,

    /// keep draft, archives, history and settings under PATH
    #[clap(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,
}

impl Cli {
    fn strict_override(&self) -> Option<bool> {
        if self.strict {
            Some(true)
        } else if self.no_strict {
            Some(false)
        } else {
            None
        }
    }

    /// Persisted settings with command-line flags on top
    fn setup_form(&self, settings: &Settings) -> SetupForm {
        let mut form = SetupForm::from_settings(settings);
        if let Some(words) = self.words {
            form.goal_type = GoalType::Words;
            form.goal_input = words.to_string();
        } else if let Some(minutes) = self.minutes {
            form.goal_type = GoalType::Time;
            form.goal_input = minutes.to_string();
        }
        if let Some(strict) = self.strict_override() {
            form.strict_mode = strict;
        }
        form
    }

    fn app_dirs(&self) -> Result<AppDirs, Box<dyn Error>> {
        match &self.data_dir {
            Some(dir) => Ok(AppDirs::rooted_at(dir)),
            None => AppDirs::resolve().ok_or_else(|| "could not determine a home directory".into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Setup,
    Writing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupForm {
    pub goal_type: GoalType,
    pub goal_input: String,
    pub strict_mode: bool,
    pub error: Option<String>,
    /// Remembered value per goal type, restored when toggling
    remembered: Settings,
}

impl SetupForm {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            goal_type: settings.goal_type,
            goal_input: settings.goal_for(settings.goal_type).to_string(),
            strict_mode: settings.strict_mode,
            error: None,
            remembered: settings.clone(),
        }
    }

    pub fn toggle_goal_type(&mut self) {
        self.goal_type = self.goal_type.toggled();
        self.goal_input = self.remembered.goal_for(self.goal_type).to_string();
        self.error = None;
    }

    pub fn select_preset(&mut self, index: usize) {
        if let Some(value) = self.goal_type.presets().get(index) {
            self.goal_input = value.to_string();
            self.error = None;
        }
    }

    pub fn push_digit(&mut self, c: char) {
        if c.is_ascii_digit() && self.goal_input.len() < MAX_GOAL_INPUT_LEN {
            self.goal_input.push(c);
            self.error = None;
        }
    }

    pub fn backspace(&mut self) {
        self.goal_input.pop();
        self.error = None;
    }

    pub fn to_config(&self) -> Result<SessionConfig, ValidationError> {
        SessionConfig::from_input(self.goal_type, &self.goal_input, self.strict_mode)
    }
}

pub struct App<G: PersistenceGateway, L: LockdownEnforcer, C: Clock> {
    pub controller: SessionController<G, L, C>,
    pub state: AppState,
    pub setup: SetupForm,
    pub editor: Editor,
    pub emergency_input: String,
    pub goal_summary: Option<SessionSummary>,
    pub notice: Option<String>,
    /// Set once the user was warned that quitting drops an unsaved draft
    pub quit_unsaved: bool,
    pub should_quit: bool,
}

fn is_quit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => true,
        KeyCode::Char('c') | KeyCode::Char('q') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

impl<G: PersistenceGateway, L: LockdownEnforcer, C: Clock> App<G, L, C> {
    pub fn new(controller: SessionController<G, L, C>, setup: SetupForm) -> Self {
        let editor = Editor::new(controller.content());
        Self {
            controller,
            state: AppState::Setup,
            setup,
            editor,
            emergency_input: String::new(),
            goal_summary: None,
            notice: None,
            quit_unsaved: false,
            should_quit: false,
        }
    }

    pub fn on_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.on_key(key),
            AppEvent::CloseRequested => self.on_close_requested(),
            AppEvent::Resize | AppEvent::Tick => {}
        }
        // A steady stream of keys never yields Tick, so poll on every event
        self.poll_timers();
    }

    pub fn poll_timers(&mut self) {
        for event in self.controller.poll_timers() {
            self.apply(event);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if self.controller.emergency_prompt_visible() {
            self.on_emergency_key(key);
            return;
        }
        if is_quit_key(&key) {
            self.on_close_requested();
            return;
        }
        match self.state {
            AppState::Setup => self.on_setup_key(key),
            AppState::Writing => self.on_writing_key(key),
        }
    }

    pub fn on_close_requested(&mut self) {
        match self.controller.request_close() {
            CloseDecision::Suppress => self.emergency_input.clear(),
            CloseDecision::Allow => {
                if let Some(event) = self.controller.save_and_exit() {
                    self.apply(event);
                }
                if !self.quit_unsaved && self.controller.has_unsaved_changes() {
                    if let Some(msg) = self.controller.flush_draft().failure() {
                        self.quit_unsaved = true;
                        self.notice = Some(format!(
                            "Draft still not saved ({msg}). Quit again to leave without it."
                        ));
                        return;
                    }
                }
                self.should_quit = true;
            }
        }
    }

    /// Last-chance write when the terminal goes away under a running session
    pub fn flush_before_exit(&mut self) {
        if !self.controller.has_unsaved_changes() {
            return;
        }
        if let Some(msg) = self.controller.flush_draft().failure() {
            warn!(error = %msg, "draft lost with the terminal");
        }
    }

    fn on_setup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => self.setup.toggle_goal_type(),
            KeyCode::F(n @ 1..=4) => self.setup.select_preset(usize::from(n) - 1),
            KeyCode::Char('s') => self.setup.strict_mode = !self.setup.strict_mode,
            KeyCode::Char(c) => self.setup.push_digit(c),
            KeyCode::Backspace => self.setup.backspace(),
            KeyCode::Enter => self.start_session(),
            _ => {}
        }
    }

    fn start_session(&mut self) {
        match self.setup.to_config() {
            Err(err) => self.setup.error = Some(err.to_string()),
            Ok(config) => {
                if let Some(event) = self.controller.start(config) {
                    self.editor = Editor::new(self.controller.content());
                    self.apply(event);
                }
            }
        }
    }

    /// Strict session that has not reached its goal yet
    fn is_locked_session(&self) -> bool {
        self.controller.phase() == SessionPhase::Active
            && self.controller.config().is_some_and(|c| c.strict_mode)
    }

    fn on_writing_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => {
                    if self.is_locked_session() {
                        self.notice =
                            Some("Locked until the goal is reached. Ctrl+E for the emergency exit.".into());
                    } else if let Some(event) = self.controller.save_and_exit() {
                        self.apply(event);
                    }
                }
                KeyCode::Char('k') => {
                    if let Some(event) = self.controller.keep_writing() {
                        self.apply(event);
                    }
                }
                KeyCode::Char('e') => {
                    if self.controller.open_emergency_prompt() {
                        self.emergency_input.clear();
                    }
                }
                _ => {}
            }
            return;
        }

        let changed = match key.code {
            KeyCode::Char(c) => {
                self.editor.insert_char(c);
                true
            }
            KeyCode::Enter => {
                self.editor.insert_newline();
                true
            }
            KeyCode::Backspace => self.editor.backspace(),
            KeyCode::Delete => self.editor.delete(),
            KeyCode::Left => {
                self.editor.move_left();
                false
            }
            KeyCode::Right => {
                self.editor.move_right();
                false
            }
            KeyCode::Home => {
                self.editor.move_line_start();
                false
            }
            KeyCode::End => {
                self.editor.move_line_end();
                false
            }
            _ => false,
        };

        if changed {
            self.notice = None;
            if let Some(event) = self.controller.on_text_changed(self.editor.text()) {
                self.apply(event);
            }
        }
    }

    fn on_emergency_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.controller.dismiss_emergency_prompt();
                self.emergency_input.clear();
            }
            KeyCode::Enter => match self.controller.emergency_exit(&self.emergency_input) {
                Some(event) => self.apply(event),
                None => {
                    self.emergency_input.clear();
                    self.notice = Some("That is not the phrase. Keep writing or try again.".into());
                }
            },
            KeyCode::Backspace => {
                self.emergency_input.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.emergency_input.push(c);
            }
            _ => {}
        }
    }

    fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Started { .. } => {
                self.state = AppState::Writing;
                self.goal_summary = None;
                self.notice = None;
                self.quit_unsaved = false;
                self.setup.error = None;
            }
            SessionEvent::GoalReached(summary) => {
                self.goal_summary = Some(summary);
            }
            SessionEvent::Resumed { goal_value } => {
                self.goal_summary = None;
                self.notice = Some(format!("New goal: {goal_value}. Keep going."));
            }
            SessionEvent::Saved => {
                if self.state == AppState::Writing {
                    self.notice = None;
                }
            }
            SessionEvent::SaveFailed(msg) => {
                self.notice = Some(format!("Save failed ({msg}), retrying at the next autosave"));
            }
            SessionEvent::Exited {
                summary,
                completed,
                save_error,
            } => {
                let outcome = if completed { "goal reached" } else { "goal not reached" };
                let notice = match save_error {
                    None => format!(
                        "Saved and archived: {} words in {}, {outcome}.",
                        summary.words_written,
                        format_clock(summary.elapsed_seconds)
                    ),
                    Some(msg) => format!(
                        "Session ended ({} words, {outcome}) but saving failed: {msg}. Quit retries the save.",
                        summary.words_written
                    ),
                };
                self.back_to_setup(notice);
            }
            SessionEvent::EmergencyExited { save_error } => {
                let notice = match save_error {
                    None => "Emergency exit. Draft saved, session not recorded.".to_string(),
                    Some(msg) => format!(
                        "Emergency exit, but the draft was not saved: {msg}. Quit retries the save."
                    ),
                };
                self.back_to_setup(notice);
            }
        }
    }

    fn back_to_setup(&mut self, notice: String) {
        self.state = AppState::Setup;
        self.goal_summary = None;
        self.emergency_input.clear();
        self.setup = SetupForm::from_settings(&self.controller.gateway().load_settings());
        self.notice = Some(notice);
    }

    pub fn view(&self) -> View<'_> {
        match self.state {
            AppState::Setup => View::Setup(SetupView {
                goal_type: self.setup.goal_type,
                goal_input: &self.setup.goal_input,
                strict_mode: self.setup.strict_mode,
                error: self.setup.error.as_deref(),
                notice: self.notice.as_deref(),
                draft_words: count_words(self.controller.content()),
                draft_age: draft_age_label(self.controller.draft_last_modified(), SystemTime::now()),
            }),
            AppState::Writing => View::Writing(WritingView {
                editor: &self.editor,
                phase: self.controller.phase(),
                strict_mode: self.controller.config().is_some_and(|c| c.strict_mode),
                locked: self.controller.is_locked(),
                progress: self.controller.progress(),
                words_written: self.controller.words_written(),
                elapsed_seconds: self.controller.state().elapsed_seconds,
                save_status: self.controller.save_status(),
                goal_summary: self.goal_summary,
                emergency_input: self
                    .controller
                    .emergency_prompt_visible()
                    .then_some(self.emergency_input.as_str()),
                notice: self.notice.as_deref(),
            }),
        }
    }
}

fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    let debug_enabled = env::var("LOCKWRITE_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("LOCKWRITE_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // The TUI owns stdout, so logs only ever go to a file
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("lockwrite: logging disabled, cannot create {}: {err}", log_dir.display());
        return None;
    }
    let appender = tracing_appender::rolling::daily(log_dir, "lockwrite.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn print_history(dirs: &AppDirs, limit: usize) -> Result<(), Box<dyn Error>> {
    let db = HistoryDb::open(&dirs.history_db_path())?;
    let entries = db.recent(limit)?;
    if entries.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  {:>6} words  {}  goal {} {}  {}",
            entry.timestamp,
            entry.words_written,
            entry.duration,
            entry.goal_value,
            entry.goal_type.unit(),
            if entry.completed { "completed" } else { "-" }
        );
    }
    Ok(())
}

fn export_history(dirs: &AppDirs, path: &Path) -> Result<(), Box<dyn Error>> {
    let gateway = FileGateway::new(dirs.clone());
    let entries = gateway.load_session_history()?;
    let file = fs::File::create(path)?;
    export_csv(&entries, file)?;
    println!("Exported {} sessions to {}", entries.len(), path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let dirs = cli.app_dirs()?;
    let _log_guard = init_logging(&dirs.log_dir());

    if let Some(limit) = cli.history {
        return print_history(&dirs, limit);
    }
    if let Some(path) = &cli.export_history {
        return export_history(&dirs, path);
    }
    if cli.clear_draft {
        FileGateway::new(dirs).clear_draft()?;
        println!("Draft cleared.");
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let gateway = FileGateway::new(dirs);
    let setup = cli.setup_form(&gateway.load_settings());
    let controller = SessionController::new(gateway, TerminalLockdown::stdout(), SystemClock);
    let mut app = App::new(controller, setup);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, G: PersistenceGateway, L: LockdownEnforcer, C: Clock>(
    terminal: &mut Terminal<B>,
    app: &mut App<G, L, C>,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    let mut drawn = terminal.draw(|f| f.render_widget(&app.view(), f.area())).map(|_| ());
    while drawn.is_ok() && !app.should_quit {
        let event = runner.step();
        app.on_event(event);
        drawn = terminal.draw(|f| f.render_widget(&app.view(), f.area())).map(|_| ());
    }
    if let Err(err) = drawn {
        warn!(error = %err, "terminal draw failed, flushing draft");
        app.flush_before_exit();
        return Err(err.into());
    }
    Ok(())
}
