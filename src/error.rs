//! Error types for lockwrite.
//!
//! None of these are fatal to the process. Validation errors keep the session
//! from starting, persistence errors are retried on the next autosave cycle,
//! and lockdown errors are only logged.

use std::path::PathBuf;

/// Rejected goal input. The message names the bound that was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{goal} goal must be between {min} and {max} {unit} (got {value})")]
    OutOfRange {
        goal: &'static str,
        value: u64,
        min: u32,
        max: u32,
        unit: &'static str,
    },

    #[error("{goal} goal must be a whole number between {min} and {max}, got {input:?}")]
    NotANumber {
        goal: &'static str,
        input: String,
        min: u32,
        max: u32,
    },
}

/// Any storage read or write failure.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("settings serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("csv export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Host-level lockdown failure. Logged, never blocks a transition.
#[derive(Debug, thiserror::Error)]
pub enum LockdownError {
    #[error("terminal control failed: {0}")]
    Terminal(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message_names_bounds() {
        let msg = ValidationError::OutOfRange {
            goal: "word",
            value: 5,
            min: 10,
            max: 50000,
            unit: "words",
        }
        .to_string();
        assert_eq!(msg, "word goal must be between 10 and 50000 words (got 5)");
    }

    #[test]
    fn not_a_number_message_quotes_input() {
        let msg = ValidationError::NotANumber {
            goal: "time",
            input: "soon".into(),
            min: 1,
            max: 480,
        }
        .to_string();
        assert!(msg.contains("\"soon\""));
        assert!(msg.contains("between 1 and 480"));
    }

    #[test]
    fn io_error_carries_path() {
        let err = PersistenceError::io(
            "/tmp/draft.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/draft.txt"));
    }
}
