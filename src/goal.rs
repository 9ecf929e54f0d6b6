use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_WORD_GOAL: u32 = 10;
pub const MAX_WORD_GOAL: u32 = 50_000;
pub const MIN_TIME_GOAL_MINUTES: u32 = 1;
pub const MAX_TIME_GOAL_MINUTES: u32 = 480;

pub const DEFAULT_WORD_GOAL: u32 = 500;
pub const DEFAULT_TIME_GOAL_MINUTES: u32 = 25;

/// Minutes added to a time goal on "keep writing"
pub const TIME_GOAL_EXTENSION_MINUTES: u32 = 10;

pub const WORD_PRESETS: [u32; 4] = [250, 500, 1000, 2000];
pub const TIME_PRESETS: [u32; 4] = [15, 25, 45, 60];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GoalType {
    #[default]
    Words,
    Time,
}

impl GoalType {
    pub fn bounds(&self) -> (u32, u32) {
        match self {
            GoalType::Words => (MIN_WORD_GOAL, MAX_WORD_GOAL),
            GoalType::Time => (MIN_TIME_GOAL_MINUTES, MAX_TIME_GOAL_MINUTES),
        }
    }

    pub fn presets(&self) -> &'static [u32; 4] {
        match self {
            GoalType::Words => &WORD_PRESETS,
            GoalType::Time => &TIME_PRESETS,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            GoalType::Words => "words",
            GoalType::Time => "minutes",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            GoalType::Words => GoalType::Time,
            GoalType::Time => GoalType::Words,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            GoalType::Words => "word",
            GoalType::Time => "time",
        }
    }

    /// Check a numeric goal against this goal type's bounds
    pub fn validate(&self, value: u64) -> Result<u32, ValidationError> {
        let (min, max) = self.bounds();
        if value < min as u64 || value > max as u64 {
            return Err(ValidationError::OutOfRange {
                goal: self.label(),
                value,
                min,
                max,
                unit: self.unit(),
            });
        }
        Ok(value as u32)
    }

    /// Parse and validate raw user input. Missing or non-numeric input is
    /// rejected rather than replaced with a default.
    pub fn parse_goal(&self, raw: &str) -> Result<u32, ValidationError> {
        let (min, max) = self.bounds();
        let trimmed = raw.trim();
        let value = trimmed
            .parse::<u64>()
            .map_err(|_| ValidationError::NotANumber {
                goal: self.label(),
                input: trimmed.to_string(),
                min,
                max,
            })?;
        self.validate(value)
    }
}

/// Immutable per-session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub goal_type: GoalType,
    pub goal_value: u32,
    pub strict_mode: bool,
}

impl SessionConfig {
    pub fn new(goal_type: GoalType, goal_value: u32, strict_mode: bool) -> Result<Self, ValidationError> {
        let goal_value = goal_type.validate(goal_value as u64)?;
        Ok(Self {
            goal_type,
            goal_value,
            strict_mode,
        })
    }

    /// Build a config from the text typed into the goal field
    pub fn from_input(goal_type: GoalType, raw: &str, strict_mode: bool) -> Result<Self, ValidationError> {
        let goal_value = goal_type.parse_goal(raw)?;
        Ok(Self {
            goal_type,
            goal_value,
            strict_mode,
        })
    }
}

/// Whitespace-separated word count. Empty and whitespace-only text is 0.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn words_written(current_word_count: usize, start_word_count: usize) -> usize {
    current_word_count.saturating_sub(start_word_count)
}

pub fn word_progress(words_written: usize, goal_words: u32) -> f64 {
    if goal_words == 0 {
        return 1.0;
    }
    (words_written as f64 / goal_words as f64).min(1.0)
}

pub fn time_progress(elapsed_secs: u64, goal_minutes: u32) -> f64 {
    let goal_secs = goal_minutes as u64 * 60;
    if goal_secs == 0 {
        return 1.0;
    }
    (elapsed_secs as f64 / goal_secs as f64).min(1.0)
}

/// New target after "keep writing": words grow by 20% rounded up, time by ten minutes
pub fn extended_goal(goal_type: GoalType, goal_value: u32) -> u32 {
    match goal_type {
        GoalType::Words => {
            let extended = (goal_value as u64 * 6).div_ceil(5);
            extended.min(u32::MAX as u64) as u32
        }
        GoalType::Time => goal_value.saturating_add(TIME_GOAL_EXTENSION_MINUTES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn count_words_handles_blank_text() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   "), 0);
        assert_eq!(count_words("\n\t \n"), 0);
    }

    #[test]
    fn count_words_splits_on_whitespace_runs() {
        assert_eq!(count_words("a b\tc\n\nd"), 4);
        assert_eq!(count_words("  leading and trailing  "), 3);
    }

    #[test]
    fn word_goal_bounds() {
        assert_eq!(GoalType::Words.parse_goal("10"), Ok(10));
        assert_eq!(GoalType::Words.parse_goal("50000"), Ok(50_000));
        assert_matches!(
            GoalType::Words.parse_goal("9"),
            Err(ValidationError::OutOfRange { value: 9, min: 10, .. })
        );
        assert_matches!(
            GoalType::Words.parse_goal("50001"),
            Err(ValidationError::OutOfRange { max: 50_000, .. })
        );
    }

    #[test]
    fn time_goal_bounds() {
        assert_eq!(GoalType::Time.parse_goal(" 1 "), Ok(1));
        assert_eq!(GoalType::Time.parse_goal("480"), Ok(480));
        assert_matches!(
            GoalType::Time.parse_goal("0"),
            Err(ValidationError::OutOfRange { min: 1, .. })
        );
        assert_matches!(
            GoalType::Time.parse_goal("481"),
            Err(ValidationError::OutOfRange { max: 480, .. })
        );
    }

    #[test]
    fn non_numeric_input_is_rejected() {
        assert_matches!(
            GoalType::Words.parse_goal(""),
            Err(ValidationError::NotANumber { .. })
        );
        assert_matches!(
            GoalType::Time.parse_goal("twenty"),
            Err(ValidationError::NotANumber { .. })
        );
        assert_matches!(
            GoalType::Time.parse_goal("-5"),
            Err(ValidationError::NotANumber { .. })
        );
    }

    #[test]
    fn progress_is_capped() {
        assert_eq!(word_progress(50, 100), 0.5);
        assert_eq!(word_progress(250, 100), 1.0);
        assert_eq!(time_progress(30, 1), 0.5);
        assert_eq!(time_progress(10_000, 1), 1.0);
    }

    #[test]
    fn words_written_never_negative() {
        assert_eq!(words_written(3, 10), 0);
        assert_eq!(words_written(15, 10), 5);
    }

    #[test]
    fn keep_writing_extensions() {
        assert_eq!(extended_goal(GoalType::Words, 100), 120);
        assert_eq!(extended_goal(GoalType::Words, 11), 14);
        assert_eq!(extended_goal(GoalType::Time, 25), 35);
    }

    #[test]
    fn goal_type_display_and_serde() {
        assert_eq!(GoalType::Words.to_string(), "words");
        assert_eq!(GoalType::Time.to_string(), "time");
        let json = serde_json::to_string(&GoalType::Time).unwrap();
        assert_eq!(json, "\"time\"");
    }

    #[test]
    fn session_config_rejects_out_of_range() {
        assert!(SessionConfig::new(GoalType::Words, 5, true).is_err());
        let cfg = SessionConfig::from_input(GoalType::Time, "25", false).unwrap();
        assert_eq!(cfg.goal_value, 25);
        assert!(!cfg.strict_mode);
    }
}
