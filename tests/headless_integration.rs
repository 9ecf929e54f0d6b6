use std::sync::mpsc;
use std::time::Duration;

use assert_matches::assert_matches;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use lockwrite::controller::SessionController;
use lockwrite::goal::{GoalType, SessionConfig};
use lockwrite::lockdown::RecordingLockdown;
use lockwrite::runtime::{AppEvent, FixedTicker, ManualClock, Runner, TestEventSource};
use lockwrite::session::{SaveStatus, SessionEvent, SessionPhase};
use lockwrite::storage::MemoryGateway;

const T0: u64 = 1_700_000_000_000;

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

type Controller = SessionController<MemoryGateway, RecordingLockdown, ManualClock>;

fn controller(draft: &str) -> (Controller, ManualClock) {
    let clock = ManualClock::new(T0);
    let c = SessionController::new(
        MemoryGateway::with_draft(draft),
        RecordingLockdown::default(),
        clock.clone(),
    );
    (c, clock)
}

// Headless flow through Runner/TestEventSource without a TTY.
// Key events feed a plain String buffer, ticks advance the manual clock.
#[test]
fn headless_word_goal_flow_completes() {
    let (mut c, clock) = controller("");
    c.start(SessionConfig::new(GoalType::Words, 10, true).unwrap());

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    for ch in "one two three four five six seven eight nine ten".chars() {
        tx.send(key(ch)).unwrap();
    }

    let mut text = String::new();
    let mut events = Vec::new();
    for _ in 0..200u32 {
        match runner.step() {
            AppEvent::Key(k) => {
                if let KeyCode::Char(ch) = k.code {
                    text.push(ch);
                    events.extend(c.on_text_changed(&text));
                }
            }
            AppEvent::Tick => {
                clock.advance(Duration::from_millis(500));
                events.extend(c.poll_timers());
            }
            AppEvent::Resize | AppEvent::CloseRequested => {}
        }
        if c.phase() == SessionPhase::GoalReached {
            break;
        }
    }

    assert_eq!(c.phase(), SessionPhase::GoalReached);
    let reached: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::GoalReached(_)))
        .collect();
    assert_eq!(reached.len(), 1);
    assert!(!c.is_locked());
    assert_eq!(c.gateway().draft.content, text);
}

#[test]
fn headless_time_goal_finishes_on_tick() {
    let (mut c, clock) = controller("");
    c.start(SessionConfig::new(GoalType::Time, 1, false).unwrap());

    let (_tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
    );

    let mut reached = None;
    for _ in 0..200u32 {
        if let AppEvent::Tick = runner.step() {
            clock.advance(Duration::from_secs(1));
            for event in c.poll_timers() {
                if let SessionEvent::GoalReached(summary) = event {
                    reached = Some(summary);
                }
            }
        }
        if reached.is_some() {
            break;
        }
    }

    let summary = reached.expect("time goal should be reached");
    assert_eq!(summary.elapsed_seconds, 60);
    assert_eq!(c.phase(), SessionPhase::GoalReached);
    assert!(!c.timers().tick_running());
}

#[test]
fn headless_close_signal_is_suppressed_in_strict_session() {
    let (mut c, _clock) = controller("");
    c.start(SessionConfig::new(GoalType::Words, 100, true).unwrap());

    let (tx, rx) = mpsc::channel();
    tx.send(AppEvent::CloseRequested).unwrap();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    assert_matches!(runner.step(), AppEvent::CloseRequested);
    assert_eq!(c.request_close(), lockwrite::controller::CloseDecision::Suppress);
    assert!(c.emergency_prompt_visible());
    assert_eq!(c.phase(), SessionPhase::Active);
    assert!(c.is_locked());
}

#[test]
fn suspended_process_catches_up_on_resume() {
    let (mut c, clock) = controller("");
    c.start(SessionConfig::new(GoalType::Time, 25, true).unwrap());

    for _ in 0..10 {
        clock.advance(Duration::from_secs(1));
        c.poll_timers();
    }
    assert_eq!(c.state().elapsed_seconds, 10);

    // Lid closed for half an hour
    clock.advance(Duration::from_secs(30 * 60));
    let events = c.poll_timers();
    assert_matches!(events.first(), Some(SessionEvent::GoalReached(s)) if s.elapsed_seconds == 1810);
    assert_eq!(c.phase(), SessionPhase::GoalReached);
}

#[test]
fn restarted_sessions_never_duplicate_timers() {
    let (mut c, clock) = controller("");
    for _ in 0..3 {
        c.start(SessionConfig::new(GoalType::Words, 500, false).unwrap());
        clock.advance(Duration::from_secs(3));
        c.poll_timers();
        c.save_and_exit();
    }
    c.start(SessionConfig::new(GoalType::Words, 500, false).unwrap());
    let before = c.gateway().save_count;

    let mut saves = 0;
    for _ in 0..20 {
        clock.advance(Duration::from_secs(1));
        saves += c
            .poll_timers()
            .iter()
            .filter(|e| matches!(e, SessionEvent::Saved))
            .count();
    }
    assert_eq!(saves, 2);
    assert_eq!(c.gateway().save_count, before + 2);
}

#[test]
fn keep_writing_cycle_restarts_timers_once() {
    let (mut c, clock) = controller("");
    c.start(SessionConfig::new(GoalType::Words, 10, true).unwrap());
    c.on_text_changed("a b c d e f g h i j");
    assert!(!c.timers().autosave_running());

    c.keep_writing();
    assert!(c.timers().tick_running());
    assert!(c.timers().autosave_running());

    clock.advance(Duration::from_secs(10));
    let autosaves = c
        .poll_timers()
        .iter()
        .filter(|e| matches!(e, SessionEvent::Saved))
        .count();
    assert_eq!(autosaves, 1);
}

#[test]
fn save_failure_is_surfaced_and_recovered() {
    let (mut c, clock) = controller("");
    c.start(SessionConfig::new(GoalType::Words, 500, true).unwrap());
    c.gateway_mut().fail_saves = true;
    c.on_text_changed("important words");

    clock.advance(Duration::from_secs(10));
    assert!(c
        .poll_timers()
        .iter()
        .any(|e| matches!(e, SessionEvent::SaveFailed(_))));
    assert_matches!(c.save_status(), SaveStatus::Failed(_));

    // Still failing at the next attempt, session keeps running
    clock.advance(Duration::from_secs(10));
    c.poll_timers();
    assert_eq!(c.phase(), SessionPhase::Active);

    c.gateway_mut().fail_saves = false;
    clock.advance(Duration::from_secs(10));
    c.poll_timers();
    assert_eq!(c.save_status(), &SaveStatus::Saved);
    assert_eq!(c.gateway().draft.content, "important words");
}
