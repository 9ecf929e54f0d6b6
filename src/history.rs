use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::goal::GoalType;

/// One finished session. Append-only; never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHistoryEntry {
    /// RFC 3339 local timestamp of the session end
    pub timestamp: String,
    pub words_written: usize,
    /// `HH:MM:SS`
    pub duration: String,
    pub goal_type: GoalType,
    pub goal_value: u32,
    pub completed: bool,
}

impl SessionHistoryEntry {
    pub fn new(
        ended_at: DateTime<Local>,
        words_written: usize,
        elapsed_secs: u64,
        goal_type: GoalType,
        goal_value: u32,
        completed: bool,
    ) -> Self {
        Self {
            timestamp: ended_at.to_rfc3339(),
            words_written,
            duration: format_duration(elapsed_secs),
            goal_type,
            goal_value,
            completed,
        }
    }
}

/// `HH:MM:SS`, hours are not wrapped
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

fn goal_type_from_column(raw: &str) -> GoalType {
    match raw {
        "time" => GoalType::Time,
        _ => GoalType::Words,
    }
}

/// SQLite-backed session history
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (creating if needed) the history database at `path`
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                words_written INTEGER NOT NULL,
                duration TEXT NOT NULL,
                goal_type TEXT NOT NULL,
                goal_value INTEGER NOT NULL,
                completed BOOLEAN NOT NULL
            )
            "#,
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    pub fn append(&self, entry: &SessionHistoryEntry) -> Result<(), PersistenceError> {
        self.conn.execute(
            r#"
            INSERT INTO session_history
            (timestamp, words_written, duration, goal_type, goal_value, completed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.timestamp,
                entry.words_written as i64,
                entry.duration,
                entry.goal_type.to_string(),
                entry.goal_value,
                entry.completed,
            ],
        )?;
        Ok(())
    }

    /// All entries, oldest first
    pub fn load_all(&self) -> Result<Vec<SessionHistoryEntry>, PersistenceError> {
        self.query(
            "SELECT timestamp, words_written, duration, goal_type, goal_value, completed
             FROM session_history ORDER BY id ASC",
            [],
        )
    }

    /// The newest `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionHistoryEntry>, PersistenceError> {
        self.query(
            "SELECT timestamp, words_written, duration, goal_type, goal_value, completed
             FROM session_history ORDER BY id DESC LIMIT ?1",
            [limit as i64],
        )
    }

    fn query<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<SessionHistoryEntry>, PersistenceError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            let words: i64 = row.get(1)?;
            let goal_type: String = row.get(3)?;
            Ok(SessionHistoryEntry {
                timestamp: row.get(0)?,
                words_written: words.max(0) as usize,
                duration: row.get(2)?,
                goal_type: goal_type_from_column(&goal_type),
                goal_value: row.get(4)?,
                completed: row.get(5)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }
}

/// Write entries as CSV with a header row
pub fn export_csv<W: Write>(
    entries: &[SessionHistoryEntry],
    writer: W,
) -> Result<(), PersistenceError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for entry in entries {
        wtr.serialize(entry)?;
    }
    wtr.flush()
        .map_err(|e| PersistenceError::Csv(csv::Error::from(e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(words: usize, completed: bool) -> SessionHistoryEntry {
        let at = Local.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        SessionHistoryEntry::new(at, words, 1_503, GoalType::Words, 500, completed)
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(61), "00:01:01");
        assert_eq!(format_duration(1_503), "00:25:03");
        assert_eq!(format_duration(36_000), "10:00:00");
    }

    #[test]
    fn test_append_and_load_preserves_order() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.append(&entry(100, false)).unwrap();
        db.append(&entry(600, true)).unwrap();

        let all = db.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].words_written, 100);
        assert!(!all[0].completed);
        assert_eq!(all[1].words_written, 600);
        assert!(all[1].completed);
        assert_eq!(all[1].duration, "00:25:03");
        assert_eq!(all[1].goal_type, GoalType::Words);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let db = HistoryDb::open_in_memory().unwrap();
        for words in [1, 2, 3] {
            db.append(&entry(words, true)).unwrap();
        }
        let recent = db.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].words_written, 3);
        assert_eq!(recent[1].words_written, 2);
    }

    #[test]
    fn test_time_goal_roundtrips_through_column() {
        let db = HistoryDb::open_in_memory().unwrap();
        let mut e = entry(10, true);
        e.goal_type = GoalType::Time;
        e.goal_value = 35;
        db.append(&e).unwrap();
        let loaded = db.load_all().unwrap();
        assert_eq!(loaded[0].goal_type, GoalType::Time);
        assert_eq!(loaded[0].goal_value, 35);
    }

    #[test]
    fn test_export_csv_has_header() {
        let mut out = Vec::new();
        export_csv(&[entry(42, true)], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp,words_written,duration,goal_type,goal_value,completed")
        );
        let row = lines.next().unwrap();
        assert!(row.contains(",42,00:25:03,words,500,true"));
    }
}
