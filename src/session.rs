use serde::{Deserialize, Serialize};

use crate::goal::GoalType;

/// Phrase that ends a strict session early
pub const EMERGENCY_PHRASE: &str = "I GIVE UP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
    GoalReached,
    EmergencyExited,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    /// Edits waiting for the next autosave
    Saving,
    Saved,
    Failed(String),
}

/// Mutable state of the one running session. Reset to defaults on every
/// terminal transition.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub start_time_ms: u64,
    pub start_word_count: usize,
    pub current_word_count: usize,
    pub elapsed_seconds: u64,
    pub goal_triggered: bool,
    /// Live target; grows on "keep writing"
    pub goal_value: u32,
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        matches!(self.phase, SessionPhase::Active | SessionPhase::GoalReached)
    }
}

/// Stats preview carried by goal-reached and exit events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub words_written: usize,
    pub elapsed_seconds: u64,
    pub goal_type: GoalType,
    pub goal_value: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started {
        goal_type: GoalType,
        goal_value: u32,
        strict_mode: bool,
    },
    GoalReached(SessionSummary),
    Resumed {
        goal_value: u32,
    },
    Saved,
    SaveFailed(String),
    /// `save_error` is set when the draft or its archive could not be written
    Exited {
        summary: SessionSummary,
        completed: bool,
        save_error: Option<String>,
    },
    EmergencyExited {
        save_error: Option<String>,
    },
}

impl SessionEvent {
    /// Message of a failed save, if this is one
    pub fn failure(self) -> Option<String> {
        match self {
            SessionEvent::SaveFailed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Case-insensitive match of the emergency phrase, ignoring surrounding whitespace
pub fn is_emergency_phrase(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(EMERGENCY_PHRASE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_phrase_variants() {
        assert!(is_emergency_phrase("i give up"));
        assert!(is_emergency_phrase(" I GIVE UP "));
        assert!(is_emergency_phrase("I Give Up"));
        assert!(is_emergency_phrase("\tI GIVE UP\n"));
    }

    #[test]
    fn emergency_phrase_rejects_partial() {
        assert!(!is_emergency_phrase("I give"));
        assert!(!is_emergency_phrase(""));
        assert!(!is_emergency_phrase("I GIVE UP!"));
        assert!(!is_emergency_phrase("I  GIVE UP"));
    }

    #[test]
    fn default_state_is_idle() {
        let state = SessionState::default();
        assert_eq!(state.phase, SessionPhase::Idle);
        assert!(!state.goal_triggered);
        assert!(!state.is_running());
    }
}
