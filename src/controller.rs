//! Session controller.
//!
//! Owns the single [`SessionState`] and drives it through
//!
//! ```text
//! Idle -> Active -> GoalReached -> Active (keep writing)
//!           |            |
//!           +-----+------+-> Idle (save and exit)
//!                 +--------> EmergencyExited -> Idle
//! ```
//!
//! The controller has no threads. The runner calls [`SessionController::poll_timers`]
//! often; elapsed time is always recomputed from the wall clock so a suspended
//! process catches up on its first tick after resuming.

use std::time::SystemTime;

use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, info, warn};

use crate::goal::{
    count_words, extended_goal, time_progress, word_progress, words_written, GoalType,
    SessionConfig,
};
use crate::history::SessionHistoryEntry;
use crate::lockdown::LockdownEnforcer;
use crate::runtime::Clock;
use crate::session::{
    is_emergency_phrase, SaveStatus, SessionEvent, SessionPhase, SessionState, SessionSummary,
};
use crate::storage::{ArchiveStats, PersistenceGateway};
use crate::timers::{TimerKind, Timers};

/// Elapsed-time jumps larger than this are reported as a suspension
pub const SUSPEND_GAP_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Words(usize),
    Seconds(u64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// 0.0 ..= 1.0
    pub fraction: f64,
    pub remaining: Remaining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Allow,
    /// Close swallowed; show the emergency prompt instead
    Suppress,
}

pub struct SessionController<G: PersistenceGateway, L: LockdownEnforcer, C: Clock> {
    gateway: G,
    lockdown: L,
    clock: C,
    config: Option<SessionConfig>,
    state: SessionState,
    timers: Timers,
    content: String,
    save_status: SaveStatus,
    draft_last_modified: Option<SystemTime>,
    emergency_prompt: bool,
    /// Survives "keep writing", which clears the latch
    goal_ever_reached: bool,
}

impl<G: PersistenceGateway, L: LockdownEnforcer, C: Clock> SessionController<G, L, C> {
    /// Build an idle controller, reading the persisted draft once
    pub fn new(gateway: G, lockdown: L, clock: C) -> Self {
        let mut controller = Self {
            gateway,
            lockdown,
            clock,
            config: None,
            state: SessionState::default(),
            timers: Timers::default(),
            content: String::new(),
            save_status: SaveStatus::Idle,
            draft_last_modified: None,
            emergency_prompt: false,
            goal_ever_reached: false,
        };

        match controller.gateway.load_draft() {
            Ok(draft) => {
                controller.content = draft.content;
                controller.draft_last_modified = draft.last_modified;
            }
            Err(err) => {
                warn!(error = %err, "could not load draft, starting empty");
                controller.save_status = SaveStatus::Failed(err.to_string());
            }
        }
        controller
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save_status
    }

    pub fn draft_last_modified(&self) -> Option<SystemTime> {
        self.draft_last_modified
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn lockdown(&self) -> &L {
        &self.lockdown
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn is_locked(&self) -> bool {
        self.lockdown.is_engaged()
    }

    pub fn emergency_prompt_visible(&self) -> bool {
        self.emergency_prompt
    }

    pub fn words_written(&self) -> usize {
        words_written(self.state.current_word_count, self.state.start_word_count)
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        let config = self.config.as_ref()?;
        Some(SessionSummary {
            words_written: self.words_written(),
            elapsed_seconds: self.state.elapsed_seconds,
            goal_type: config.goal_type,
            goal_value: self.state.goal_value,
        })
    }

    pub fn progress(&self) -> Option<Progress> {
        if !self.state.is_running() {
            return None;
        }
        let config = self.config.as_ref()?;
        let goal = self.state.goal_value;
        let progress = match config.goal_type {
            GoalType::Words => {
                let written = self.words_written();
                Progress {
                    fraction: word_progress(written, goal),
                    remaining: Remaining::Words((goal as usize).saturating_sub(written)),
                }
            }
            GoalType::Time => {
                let elapsed = self.state.elapsed_seconds;
                Progress {
                    fraction: time_progress(elapsed, goal),
                    remaining: Remaining::Seconds((goal as u64 * 60).saturating_sub(elapsed)),
                }
            }
        };
        Some(progress)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Idle -> Active
    pub fn start(&mut self, config: SessionConfig) -> Option<SessionEvent> {
        if self.state.is_running() {
            warn!(phase = ?self.state.phase, "start ignored, a session is already running");
            return None;
        }

        let now = self.clock.now_ms();
        let word_count = count_words(&self.content);
        self.state = SessionState {
            phase: SessionPhase::Active,
            start_time_ms: now,
            start_word_count: word_count,
            current_word_count: word_count,
            elapsed_seconds: 0,
            goal_triggered: false,
            goal_value: config.goal_value,
        };
        self.config = Some(config);
        self.emergency_prompt = false;
        self.goal_ever_reached = false;

        if config.strict_mode {
            self.engage_lockdown();
        }
        self.timers.cancel_all();
        self.timers.start_tick(now);
        self.timers.start_autosave(now);

        self.remember_settings(&config);

        info!(
            goal_type = %config.goal_type,
            goal_value = config.goal_value,
            strict = config.strict_mode,
            start_words = word_count,
            "session started"
        );
        Some(SessionEvent::Started {
            goal_type: config.goal_type,
            goal_value: config.goal_value,
            strict_mode: config.strict_mode,
        })
    }

    /// Editor content changed. Word goals are evaluated here, not on the tick.
    pub fn on_text_changed(&mut self, text: &str) -> Option<SessionEvent> {
        if self.content != text {
            self.content.clear();
            self.content.push_str(text);
        }
        if !self.state.is_running() {
            return None;
        }

        self.state.current_word_count = count_words(text);
        if !matches!(self.save_status, SaveStatus::Failed(_)) {
            self.save_status = SaveStatus::Saving;
        }

        let config = self.config?;
        if self.state.phase == SessionPhase::Active
            && config.goal_type == GoalType::Words
            && !self.state.goal_triggered
            && word_progress(self.words_written(), self.state.goal_value) >= 1.0
        {
            return Some(self.reach_goal());
        }
        None
    }

    /// One-second tick. Time goals are evaluated here.
    pub fn on_tick(&mut self) -> Option<SessionEvent> {
        if self.state.phase != SessionPhase::Active {
            return None;
        }
        self.refresh_elapsed();

        let config = self.config?;
        if config.goal_type == GoalType::Time
            && !self.state.goal_triggered
            && time_progress(self.state.elapsed_seconds, self.state.goal_value) >= 1.0
        {
            return Some(self.reach_goal());
        }
        None
    }

    /// Ten-second autosave; only while Active
    pub fn on_autosave(&mut self) -> Option<SessionEvent> {
        if self.state.phase != SessionPhase::Active {
            return None;
        }
        debug!(bytes = self.content.len(), "autosave");
        Some(self.save_now())
    }

    /// Fire whichever timers are due
    pub fn poll_timers(&mut self) -> Vec<SessionEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        for kind in self.timers.poll(now) {
            let event = match kind {
                TimerKind::Tick => self.on_tick(),
                TimerKind::Autosave => self.on_autosave(),
            };
            events.extend(event);
        }
        events
    }

    /// GoalReached -> Active with a bigger goal
    pub fn keep_writing(&mut self) -> Option<SessionEvent> {
        if self.state.phase != SessionPhase::GoalReached {
            return None;
        }
        let config = self.config?;
        let goal_value = extended_goal(config.goal_type, self.state.goal_value);

        // Catch up on the time the banner was open before ticking again
        self.refresh_elapsed();
        self.state.goal_value = goal_value;
        self.state.goal_triggered = false;
        self.state.phase = SessionPhase::Active;

        let now = self.clock.now_ms();
        self.timers.cancel_all();
        self.timers.start_tick(now);
        self.timers.start_autosave(now);

        if config.strict_mode {
            self.engage_lockdown();
        }

        info!(goal_value, "keep writing");
        Some(SessionEvent::Resumed { goal_value })
    }

    /// Active/GoalReached -> Idle, with archive and history
    pub fn save_and_exit(&mut self) -> Option<SessionEvent> {
        if !self.state.is_running() {
            return None;
        }
        let config = self.config?;
        self.timers.cancel_all();
        self.refresh_elapsed();
        let mut save_error = self.save_now().failure();

        let ended_at = self.local_now();
        let summary = self.summary()?;
        let completed = self.state.goal_triggered || self.goal_ever_reached;

        let stats = ArchiveStats {
            ended_at,
            word_count: self.state.current_word_count,
            elapsed_secs: self.state.elapsed_seconds,
        };
        match self.gateway.archive_draft(&self.content, &stats) {
            Ok(path) => info!(path = %path.display(), "draft archived"),
            Err(err) => {
                warn!(error = %err, "archive failed");
                save_error.get_or_insert_with(|| format!("archive failed: {err}"));
            }
        }

        let entry = SessionHistoryEntry::new(
            ended_at,
            summary.words_written,
            summary.elapsed_seconds,
            config.goal_type,
            summary.goal_value,
            completed,
        );
        if let Err(err) = self.gateway.append_session_history(&entry) {
            warn!(error = %err, "could not record session history");
        }

        if config.strict_mode {
            self.release_lockdown();
        }

        info!(
            words = summary.words_written,
            elapsed_secs = summary.elapsed_seconds,
            completed,
            "session saved and exited"
        );
        self.reset();
        Some(SessionEvent::Exited {
            summary,
            completed,
            save_error,
        })
    }

    /// Emergency override of a strict session. Saves the draft only.
    pub fn emergency_exit(&mut self, phrase: &str) -> Option<SessionEvent> {
        if !self.state.is_running() {
            return None;
        }
        let strict = self.config.map(|c| c.strict_mode).unwrap_or(false);
        if !strict || !is_emergency_phrase(phrase) {
            return None;
        }

        self.timers.cancel_all();
        let save_error = self.save_now().failure();
        self.release_lockdown();
        self.state.phase = SessionPhase::EmergencyExited;
        warn!(words = self.words_written(), saved = save_error.is_none(), "emergency exit");
        self.reset();
        Some(SessionEvent::EmergencyExited { save_error })
    }

    /// Host close attempt (quit key or termination signal)
    pub fn request_close(&mut self) -> CloseDecision {
        let strict = self.config.map(|c| c.strict_mode).unwrap_or(false);
        if self.state.phase == SessionPhase::Active && strict {
            info!("close suppressed during locked session");
            self.emergency_prompt = true;
            return CloseDecision::Suppress;
        }
        CloseDecision::Allow
    }

    /// Show the emergency prompt on demand; only strict sessions have one
    pub fn open_emergency_prompt(&mut self) -> bool {
        let strict = self.config.map(|c| c.strict_mode).unwrap_or(false);
        self.emergency_prompt = strict && self.state.is_running();
        self.emergency_prompt
    }

    pub fn dismiss_emergency_prompt(&mut self) {
        self.emergency_prompt = false;
    }

    /// Best-effort write of the current content outside the autosave cadence
    pub fn flush_draft(&mut self) -> SessionEvent {
        self.save_now()
    }

    /// Edits pending or the last write failed
    pub fn has_unsaved_changes(&self) -> bool {
        matches!(self.save_status, SaveStatus::Saving | SaveStatus::Failed(_))
    }

    /// Empty the live draft; refused while a session runs
    pub fn clear_draft(&mut self) -> Option<SessionEvent> {
        if self.state.is_running() {
            return None;
        }
        match self.gateway.clear_draft() {
            Ok(()) => {
                self.content.clear();
                self.draft_last_modified = None;
                Some(SessionEvent::Saved)
            }
            Err(err) => {
                warn!(error = %err, "could not clear draft");
                self.save_status = SaveStatus::Failed(err.to_string());
                Some(SessionEvent::SaveFailed(err.to_string()))
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn reach_goal(&mut self) -> SessionEvent {
        self.state.goal_triggered = true;
        self.goal_ever_reached = true;
        self.state.phase = SessionPhase::GoalReached;
        self.timers.cancel_all();
        self.save_now();

        let strict = self.config.map(|c| c.strict_mode).unwrap_or(false);
        if strict {
            self.release_lockdown();
        }

        let summary = SessionSummary {
            words_written: self.words_written(),
            elapsed_seconds: self.state.elapsed_seconds,
            goal_type: self.config.map(|c| c.goal_type).unwrap_or_default(),
            goal_value: self.state.goal_value,
        };
        info!(
            words = summary.words_written,
            elapsed_secs = summary.elapsed_seconds,
            goal_value = summary.goal_value,
            "goal reached"
        );
        SessionEvent::GoalReached(summary)
    }

    /// Recompute elapsed seconds from the wall clock, never going backwards.
    /// Returns the gap when it looks like the process was suspended. Ticks are
    /// stopped outside Active, so only an Active session can detect one.
    fn refresh_elapsed(&mut self) -> Option<u64> {
        let now = self.clock.now_ms();
        let elapsed = now.saturating_sub(self.state.start_time_ms) / 1000;
        let previous = self.state.elapsed_seconds;
        self.state.elapsed_seconds = elapsed.max(previous);

        let gap = elapsed.saturating_sub(previous);
        if self.state.phase != SessionPhase::Active || gap <= SUSPEND_GAP_SECS {
            return None;
        }
        warn!(
            gap_secs = gap,
            elapsed_secs = elapsed,
            "suspension detected, elapsed time corrected"
        );
        Some(gap)
    }

    fn save_now(&mut self) -> SessionEvent {
        match self.gateway.save_content(&self.content) {
            Ok(()) => {
                self.save_status = SaveStatus::Saved;
                SessionEvent::Saved
            }
            Err(err) => {
                warn!(error = %err, "save failed, retrying on next autosave");
                let msg = err.to_string();
                self.save_status = SaveStatus::Failed(msg.clone());
                SessionEvent::SaveFailed(msg)
            }
        }
    }

    fn engage_lockdown(&mut self) {
        if let Err(err) = self.lockdown.engage() {
            warn!(error = %err, "lockdown engage degraded");
        }
    }

    fn release_lockdown(&mut self) {
        self.emergency_prompt = false;
        if let Err(err) = self.lockdown.release() {
            warn!(error = %err, "lockdown release degraded");
        }
    }

    fn remember_settings(&mut self, config: &SessionConfig) {
        let mut settings = self.gateway.load_settings();
        settings.remember_goal(config.goal_type, config.goal_value);
        settings.strict_mode = config.strict_mode;
        if let Err(err) = self.gateway.save_settings(&settings) {
            warn!(error = %err, "could not persist settings");
        }
    }

    fn local_now(&self) -> DateTime<Local> {
        Local
            .timestamp_millis_opt(self.clock.now_ms() as i64)
            .single()
            .unwrap_or_else(Local::now)
    }

    fn reset(&mut self) {
        self.timers.cancel_all();
        self.state = SessionState::default();
        self.config = None;
        self.emergency_prompt = false;
        self.goal_ever_reached = false;
    }
}
