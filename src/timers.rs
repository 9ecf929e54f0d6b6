//! Interval handles for the session tick and autosave.
//!
//! Intervals do not own threads; the runner polls them against the clock.
//! Starting an interval always replaces (cancels) the previous handle for the
//! same purpose, so two tickers never run at once.

pub const TICK_INTERVAL_MS: u64 = 1_000;
pub const AUTOSAVE_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period_ms: u64,
    next_due_ms: u64,
}

impl Interval {
    pub fn new(now_ms: u64, period_ms: u64) -> Self {
        Self {
            period_ms,
            next_due_ms: now_ms.saturating_add(period_ms),
        }
    }

    /// Returns true at most once per call when the interval is due. Missed
    /// periods (e.g. after a suspend) collapse into a single firing. A clock
    /// set backwards re-arms the interval one period from `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_add(self.period_ms) < self.next_due_ms {
            self.next_due_ms = now_ms.saturating_add(self.period_ms);
            return false;
        }
        if now_ms < self.next_due_ms {
            return false;
        }
        self.next_due_ms = now_ms.saturating_add(self.period_ms);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Tick,
    Autosave,
}

#[derive(Debug, Default, Clone)]
pub struct Timers {
    tick: Option<Interval>,
    autosave: Option<Interval>,
}

impl Timers {
    pub fn start_tick(&mut self, now_ms: u64) {
        self.tick = Some(Interval::new(now_ms, TICK_INTERVAL_MS));
    }

    pub fn start_autosave(&mut self, now_ms: u64) {
        self.autosave = Some(Interval::new(now_ms, AUTOSAVE_INTERVAL_MS));
    }

    pub fn stop_tick(&mut self) {
        self.tick = None;
    }

    pub fn stop_autosave(&mut self) {
        self.autosave = None;
    }

    pub fn cancel_all(&mut self) {
        self.stop_tick();
        self.stop_autosave();
    }

    pub fn tick_running(&self) -> bool {
        self.tick.is_some()
    }

    pub fn autosave_running(&self) -> bool {
        self.autosave.is_some()
    }

    /// Timers due at `now_ms`, tick first
    pub fn poll(&mut self, now_ms: u64) -> Vec<TimerKind> {
        let mut due = Vec::new();
        if let Some(tick) = self.tick.as_mut() {
            if tick.poll(now_ms) {
                due.push(TimerKind::Tick);
            }
        }
        if let Some(autosave) = self.autosave.as_mut() {
            if autosave.poll(now_ms) {
                due.push(TimerKind::Autosave);
            }
        }
        due
    }
}
