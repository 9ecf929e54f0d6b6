//! Host-level lockdown.
//!
//! The controller only ever says "engage" or "release". Both calls are
//! idempotent and best-effort; a failure is reported back so the caller can
//! log it, but the session transition goes ahead regardless.

use std::io::{self, Write};

use crossterm::{execute, terminal::SetTitle};

use crate::error::LockdownError;

const LOCKED_TITLE: &str = "lockwrite [locked]";
const FREE_TITLE: &str = "lockwrite";

pub trait LockdownEnforcer {
    fn engage(&mut self) -> Result<(), LockdownError>;
    fn release(&mut self) -> Result<(), LockdownError>;
    fn is_engaged(&self) -> bool;
}

/// Terminal lockdown. While engaged the app swallows its own quit keys and
/// routes termination signals to the emergency prompt; the terminal title
/// advertises the locked state.
pub struct TerminalLockdown<W: Write> {
    out: W,
    engaged: bool,
}

impl TerminalLockdown<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalLockdown<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            engaged: false,
        }
    }
}

impl<W: Write> LockdownEnforcer for TerminalLockdown<W> {
    fn engage(&mut self) -> Result<(), LockdownError> {
        // Flag first so quit keys are swallowed even if the title write fails
        self.engaged = true;
        execute!(self.out, SetTitle(LOCKED_TITLE))?;
        Ok(())
    }

    fn release(&mut self) -> Result<(), LockdownError> {
        self.engaged = false;
        execute!(self.out, SetTitle(FREE_TITLE))?;
        Ok(())
    }

    fn is_engaged(&self) -> bool {
        self.engaged
    }
}

/// Lockdown that only records calls; used headless and in tests
#[derive(Debug, Default, Clone)]
pub struct RecordingLockdown {
    pub engaged: bool,
    pub engage_calls: usize,
    pub release_calls: usize,
    /// Make every call report a failure (state still changes)
    pub fail: bool,
}

impl LockdownEnforcer for RecordingLockdown {
    fn engage(&mut self) -> Result<(), LockdownError> {
        self.engaged = true;
        self.engage_calls += 1;
        if self.fail {
            return Err(LockdownError::Terminal(io::Error::other(
                "hotkey interception unavailable",
            )));
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), LockdownError> {
        self.engaged = false;
        self.release_calls += 1;
        if self.fail {
            return Err(LockdownError::Terminal(io::Error::other(
                "could not restore host",
            )));
        }
        Ok(())
    }

    fn is_engaged(&self) -> bool {
        self.engaged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_lockdown_writes_title_sequences() {
        let mut lockdown = TerminalLockdown::new(Vec::new());
        lockdown.engage().unwrap();
        assert!(lockdown.is_engaged());
        lockdown.release().unwrap();
        assert!(!lockdown.is_engaged());

        let written = String::from_utf8(lockdown.out.clone()).unwrap();
        assert!(written.contains("\x1b]0;lockwrite [locked]\x07"));
        assert!(written.ends_with("\x1b]0;lockwrite\x07"));
    }

    #[test]
    fn terminal_lockdown_is_idempotent() {
        let mut lockdown = TerminalLockdown::new(Vec::new());
        lockdown.engage().unwrap();
        lockdown.engage().unwrap();
        assert!(lockdown.is_engaged());
        lockdown.release().unwrap();
        lockdown.release().unwrap();
        assert!(!lockdown.is_engaged());
    }

    #[test]
    fn recording_lockdown_counts_and_fails_softly() {
        let mut lockdown = RecordingLockdown {
            fail: true,
            ..Default::default()
        };
        assert!(lockdown.engage().is_err());
        assert!(lockdown.is_engaged());
        assert!(lockdown.release().is_err());
        assert!(!lockdown.is_engaged());
        assert_eq!(lockdown.engage_calls, 1);
        assert_eq!(lockdown.release_calls, 1);
    }
}
