use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::goal::{GoalType, DEFAULT_TIME_GOAL_MINUTES, DEFAULT_WORD_GOAL};

/// Persisted user preferences. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Engage lockdown for new sessions (default: true)
    pub strict_mode: bool,
    /// Goal type pre-selected in the setup form (default: words)
    pub goal_type: GoalType,
    /// Pre-filled word goal (default: 500)
    pub word_goal: u32,
    /// Pre-filled time goal in minutes (default: 25)
    pub time_goal_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strict_mode: true,
            goal_type: GoalType::Words,
            word_goal: DEFAULT_WORD_GOAL,
            time_goal_minutes: DEFAULT_TIME_GOAL_MINUTES,
        }
    }
}

impl Settings {
    /// Reset out-of-range goals to their defaults
    pub fn validated(mut self) -> Self {
        if GoalType::Words.validate(self.word_goal as u64).is_err() {
            tracing::warn!(
                word_goal = self.word_goal,
                "stored word goal out of range, using default"
            );
            self.word_goal = DEFAULT_WORD_GOAL;
        }
        if GoalType::Time.validate(self.time_goal_minutes as u64).is_err() {
            tracing::warn!(
                time_goal_minutes = self.time_goal_minutes,
                "stored time goal out of range, using default"
            );
            self.time_goal_minutes = DEFAULT_TIME_GOAL_MINUTES;
        }
        self
    }

    pub fn goal_for(&self, goal_type: GoalType) -> u32 {
        match goal_type {
            GoalType::Words => self.word_goal,
            GoalType::Time => self.time_goal_minutes,
        }
    }

    pub fn remember_goal(&mut self, goal_type: GoalType, value: u32) {
        self.goal_type = goal_type;
        match goal_type {
            GoalType::Words => self.word_goal = value,
            GoalType::Time => self.time_goal_minutes = value,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Settings {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Settings::default(),
        };
        match serde_json::from_slice::<Settings>(&bytes) {
            Ok(settings) => settings.validated(),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "malformed settings file, using defaults"
                );
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }
        let data = serde_json::to_vec_pretty(settings)?;
        fs::write(&self.path, data).map_err(|e| PersistenceError::io(&self.path, e))
    }
}
