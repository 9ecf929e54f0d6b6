//! Persistence gateway: draft text, archives, session history and settings.
//!
//! The controller talks to storage only through [`PersistenceGateway`] and
//! never learns the medium. [`FileGateway`] is the on-disk implementation,
//! [`MemoryGateway`] keeps everything in memory.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Local};

use crate::app_dirs::AppDirs;
use crate::config::{ConfigStore, FileConfigStore, Settings};
use crate::error::PersistenceError;
use crate::history::{format_duration, HistoryDb, SessionHistoryEntry};

/// Live draft as last persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftRecord {
    pub content: String,
    pub last_modified: Option<SystemTime>,
}

/// Numbers written into an archive header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveStats {
    pub ended_at: DateTime<Local>,
    pub word_count: usize,
    pub elapsed_secs: u64,
}

const ARCHIVE_RULE: &str = "----------------------------------------";

/// Plain-text header block placed above archived content
pub fn archive_header(stats: &ArchiveStats) -> String {
    format!(
        "Date: {}\nWords: {}\nDuration: {}\n{}\n\n",
        stats.ended_at.format("%Y-%m-%d %H:%M:%S"),
        stats.word_count,
        format_duration(stats.elapsed_secs),
        ARCHIVE_RULE,
    )
}

pub trait PersistenceGateway {
    fn load_draft(&self) -> Result<DraftRecord, PersistenceError>;
    fn save_content(&mut self, text: &str) -> Result<(), PersistenceError>;
    fn clear_draft(&mut self) -> Result<(), PersistenceError>;
    /// Write a timestamped, header-annotated copy of `content`
    fn archive_draft(&mut self, content: &str, stats: &ArchiveStats) -> Result<PathBuf, PersistenceError>;
    /// Oldest first
    fn load_session_history(&self) -> Result<Vec<SessionHistoryEntry>, PersistenceError>;
    fn append_session_history(&mut self, entry: &SessionHistoryEntry) -> Result<(), PersistenceError>;
    fn load_settings(&self) -> Settings;
    fn save_settings(&mut self, settings: &Settings) -> Result<(), PersistenceError>;
}

/// On-disk storage rooted at an [`AppDirs`] layout
#[derive(Debug)]
pub struct FileGateway {
    dirs: AppDirs,
    history: Result<HistoryDb, String>,
    settings: FileConfigStore,
}

impl FileGateway {
    pub fn new(dirs: AppDirs) -> Self {
        let history = HistoryDb::open(&dirs.history_db_path()).map_err(|err| {
            tracing::warn!(error = %err, "session history unavailable");
            err.to_string()
        });
        let settings = FileConfigStore::with_path(dirs.config_path());
        Self {
            dirs,
            history,
            settings,
        }
    }

    fn history_db(&self) -> Result<&HistoryDb, PersistenceError> {
        self.history
            .as_ref()
            .map_err(|msg| PersistenceError::Unavailable(msg.clone()))
    }

    fn unique_archive_path(&self, ended_at: &DateTime<Local>) -> PathBuf {
        let dir = self.dirs.archive_dir();
        let stem = format!("session-{}", ended_at.format("%Y%m%d-%H%M%S"));
        let mut path = dir.join(format!("{stem}.txt"));
        let mut n = 1;
        while path.exists() {
            n += 1;
            path = dir.join(format!("{stem}-{n}.txt"));
        }
        path
    }
}

impl PersistenceGateway for FileGateway {
    fn load_draft(&self) -> Result<DraftRecord, PersistenceError> {
        let path = self.dirs.draft_path();
        if !path.exists() {
            return Ok(DraftRecord::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| PersistenceError::io(&path, e))?;
        let last_modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
        Ok(DraftRecord {
            content,
            last_modified,
        })
    }

    fn save_content(&mut self, text: &str) -> Result<(), PersistenceError> {
        let path = self.dirs.draft_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }
        // Write-then-rename so a crash mid-write never truncates the draft
        let tmp = path.with_extension("txt.tmp");
        fs::write(&tmp, text).map_err(|e| PersistenceError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| PersistenceError::io(&path, e))
    }

    fn clear_draft(&mut self) -> Result<(), PersistenceError> {
        let path = self.dirs.draft_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::io(&path, e)),
        }
    }

    fn archive_draft(&mut self, content: &str, stats: &ArchiveStats) -> Result<PathBuf, PersistenceError> {
        let dir = self.dirs.archive_dir();
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
        let path = self.unique_archive_path(&stats.ended_at);
        let mut file = fs::File::create(&path).map_err(|e| PersistenceError::io(&path, e))?;
        file.write_all(archive_header(stats).as_bytes())
            .and_then(|_| file.write_all(content.as_bytes()))
            .map_err(|e| PersistenceError::io(&path, e))?;
        Ok(path)
    }

    fn load_session_history(&self) -> Result<Vec<SessionHistoryEntry>, PersistenceError> {
        self.history_db()?.load_all()
    }

    fn append_session_history(&mut self, entry: &SessionHistoryEntry) -> Result<(), PersistenceError> {
        self.history_db()?.append(entry)
    }

    fn load_settings(&self) -> Settings {
        self.settings.load()
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<(), PersistenceError> {
        self.settings.save(settings)
    }
}

/// In-memory storage with optional save failure injection
#[derive(Debug, Default, Clone)]
pub struct MemoryGateway {
    pub draft: DraftRecord,
    pub archives: Vec<(String, ArchiveStats)>,
    pub history: Vec<SessionHistoryEntry>,
    pub settings: Settings,
    /// Make `save_content` fail until cleared
    pub fail_saves: bool,
    pub fail_archives: bool,
    pub save_count: usize,
}

impl MemoryGateway {
    pub fn with_draft(content: &str) -> Self {
        Self {
            draft: DraftRecord {
                content: content.to_string(),
                last_modified: Some(SystemTime::now()),
            },
            ..Default::default()
        }
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load_draft(&self) -> Result<DraftRecord, PersistenceError> {
        Ok(self.draft.clone())
    }

    fn save_content(&mut self, text: &str) -> Result<(), PersistenceError> {
        if self.fail_saves {
            return Err(PersistenceError::Unavailable("disk full".into()));
        }
        self.save_count += 1;
        self.draft = DraftRecord {
            content: text.to_string(),
            last_modified: Some(SystemTime::now()),
        };
        Ok(())
    }

    fn clear_draft(&mut self) -> Result<(), PersistenceError> {
        self.draft = DraftRecord::default();
        Ok(())
    }

    fn archive_draft(&mut self, content: &str, stats: &ArchiveStats) -> Result<PathBuf, PersistenceError> {
        if self.fail_archives {
            return Err(PersistenceError::Unavailable("archive dir read-only".into()));
        }
        self.archives.push((content.to_string(), *stats));
        Ok(PathBuf::from(format!("memory://archive/{}", self.archives.len())))
    }

    fn load_session_history(&self) -> Result<Vec<SessionHistoryEntry>, PersistenceError> {
        Ok(self.history.clone())
    }

    fn append_session_history(&mut self, entry: &SessionHistoryEntry) -> Result<(), PersistenceError> {
        self.history.push(entry.clone());
        Ok(())
    }

    fn load_settings(&self) -> Settings {
        self.settings.clone()
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<(), PersistenceError> {
        self.settings = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::GoalType;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn stats() -> ArchiveStats {
        ArchiveStats {
            ended_at: Local.with_ymd_and_hms(2026, 10, 19, 14, 3, 22).unwrap(),
            word_count: 523,
            elapsed_secs: 1_503,
        }
    }

    #[test]
    fn archive_header_format() {
        assert_eq!(
            archive_header(&stats()),
            "Date: 2026-10-19 14:03:22\nWords: 523\nDuration: 00:25:03\n----------------------------------------\n\n"
        );
    }

    #[test]
    fn missing_draft_loads_empty() {
        let dir = tempdir().unwrap();
        let gateway = FileGateway::new(AppDirs::rooted_at(dir.path()));
        let draft = gateway.load_draft().unwrap();
        assert_eq!(draft.content, "");
        assert!(draft.last_modified.is_none());
    }

    #[test]
    fn save_then_load_draft() {
        let dir = tempdir().unwrap();
        let mut gateway = FileGateway::new(AppDirs::rooted_at(dir.path()));
        gateway.save_content("first words").unwrap();
        gateway.save_content("first words, revised").unwrap();
        let draft = gateway.load_draft().unwrap();
        assert_eq!(draft.content, "first words, revised");
        assert!(draft.last_modified.is_some());
        assert!(!dir.path().join("draft.txt.tmp").exists());
    }

    #[test]
    fn clear_draft_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut gateway = FileGateway::new(AppDirs::rooted_at(dir.path()));
        gateway.save_content("text").unwrap();
        gateway.clear_draft().unwrap();
        gateway.clear_draft().unwrap();
        assert_eq!(gateway.load_draft().unwrap().content, "");
    }

    #[test]
    fn archives_never_overwrite() {
        let dir = tempdir().unwrap();
        let mut gateway = FileGateway::new(AppDirs::rooted_at(dir.path()));
        let first = gateway.archive_draft("one", &stats()).unwrap();
        let second = gateway.archive_draft("two", &stats()).unwrap();
        assert_ne!(first, second);
        assert!(first.ends_with("session-20261019-140322.txt"));
        assert!(second.ends_with("session-20261019-140322-2.txt"));

        let body = fs::read_to_string(&second).unwrap();
        assert!(body.starts_with("Date: 2026-10-19 14:03:22\n"));
        assert!(body.ends_with("\n\ntwo"));
    }

    #[test]
    fn history_and_settings_persist() {
        let dir = tempdir().unwrap();
        {
            let mut gateway = FileGateway::new(AppDirs::rooted_at(dir.path()));
            let entry = SessionHistoryEntry::new(
                stats().ended_at,
                120,
                600,
                GoalType::Words,
                100,
                true,
            );
            gateway.append_session_history(&entry).unwrap();
            let mut settings = gateway.load_settings();
            settings.strict_mode = false;
            gateway.save_settings(&settings).unwrap();
        }

        let gateway = FileGateway::new(AppDirs::rooted_at(dir.path()));
        let history = gateway.load_session_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].words_written, 120);
        assert!(!gateway.load_settings().strict_mode);
    }

    #[test]
    fn memory_gateway_save_failure() {
        let mut gateway = MemoryGateway::with_draft("kept");
        gateway.fail_saves = true;
        assert!(gateway.save_content("lost").is_err());
        assert_eq!(gateway.load_draft().unwrap().content, "kept");
    }
}
