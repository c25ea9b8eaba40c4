use crate::error::AppError;
use crate::model::Task;
use std::path::{Path, PathBuf};

const SNAPSHOT_FILE_NAME: &str = "todos.json";
const SNAPSHOT_ENV_VAR: &str = "TODO_TIMER_SNAPSHOT_PATH";

/// Resolves the snapshot location: environment first, then the configured
/// path, then the per-user default.
pub fn snapshot_path(configured: Option<&str>) -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(SNAPSHOT_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = configured
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("todo_timer")
            .join(SNAPSHOT_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("todo_timer")
            .join(SNAPSHOT_FILE_NAME))
    }
}

/// Whole-collection JSON snapshot. Every save overwrites the previous one.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the collection. Failures are logged and otherwise ignored;
    /// the collection simply stays in memory until the next save.
    pub fn save(&self, tasks: &[Task]) {
        if let Err(err) = self.try_save(tasks) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to save snapshot");
        }
    }

    /// Stored collection, or empty when the snapshot is missing or unreadable.
    pub fn load(&self) -> Vec<Task> {
        self.load_existing().unwrap_or_default()
    }

    /// Like [`SnapshotStore::load`], but tells a missing or corrupt snapshot
    /// apart from an empty one.
    pub fn load_existing(&self) -> Option<Vec<Task>> {
        match self.try_load() {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring unreadable snapshot");
                None
            }
        }
    }

    fn try_load(&self) -> Result<Option<Vec<Task>>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|err| AppError::io(err.to_string()))?;
        let tasks = serde_json::from_str(&content)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        Ok(Some(tasks))
    }

    fn try_save(&self, tasks: &[Task]) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
        }

        let content = serde_json::to_string_pretty(tasks)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        std::fs::write(&self.path, content).map_err(|err| AppError::io(err.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, permissions)
                .map_err(|err| AppError::io(err.to_string()))?;
        }

        Ok(())
    }
}
