use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Centralized application directory resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    data_dir: PathBuf,
    state_dir: PathBuf,
    config_dir: PathBuf,
}

impl AppDirs {
    /// Platform directories, falling back to `$HOME/.local/state/lockwrite`
    /// for state when the platform has no dedicated state dir.
    pub fn resolve() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("", "", "lockwrite")?;
        let state_dir = if let Some(state) = proj_dirs.state_dir() {
            state.to_path_buf()
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("lockwrite")
        } else {
            proj_dirs.data_local_dir().to_path_buf()
        };
        Some(Self {
            data_dir: proj_dirs.data_dir().to_path_buf(),
            state_dir,
            config_dir: proj_dirs.config_dir().to_path_buf(),
        })
    }

    /// Everything under one root (used by `--data-dir` and tests)
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.to_path_buf(),
            state_dir: root.join("state"),
            config_dir: root.to_path_buf(),
        }
    }

    pub fn draft_path(&self) -> PathBuf {
        self.data_dir.join("draft.txt")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join("archive")
    }

    pub fn history_db_path(&self) -> PathBuf {
        self.state_dir.join("history.db")
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }
}
