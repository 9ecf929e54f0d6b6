use std::time::SystemTime;

use lockwrite::controller::Remaining;
use lockwrite::session::SaveStatus;
use time_humanize::{Accuracy, HumanTime, Tense};

/// `MM:SS`; minutes are not wrapped into hours
pub fn format_clock(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Whole percent, never above 100
pub fn format_percent(fraction: f64) -> String {
    format!("{}%", (fraction.clamp(0.0, 1.0) * 100.0).floor() as u32)
}

pub fn format_remaining(remaining: Remaining) -> String {
    match remaining {
        Remaining::Words(1) => "1 word to go".to_string(),
        Remaining::Words(n) => format!("{n} words to go"),
        Remaining::Seconds(secs) => format!("{} to go", format_clock(secs)),
    }
}

pub fn save_status_label(status: &SaveStatus) -> String {
    match status {
        SaveStatus::Idle => String::new(),
        SaveStatus::Saving => "unsaved changes".to_string(),
        SaveStatus::Saved => "saved".to_string(),
        SaveStatus::Failed(msg) => format!("save failed: {msg}"),
    }
}

/// "last edited 3 hours ago"; None for a draft that was never saved
pub fn draft_age_label(last_modified: Option<SystemTime>, now: SystemTime) -> Option<String> {
    let modified = last_modified?;
    let age = now.duration_since(modified).unwrap_or_default();
    let human = HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past);
    Some(format!("last edited {human}"))
}
