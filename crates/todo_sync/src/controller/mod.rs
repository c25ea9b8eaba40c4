use crate::error::AppError;
use crate::model::Task;
use crate::remote::RemoteStore;
use crate::scheduler::{CountdownScheduler, decrement_all};
use crate::storage::SnapshotStore;
use serde::{Deserialize, Serialize};

/// Which copy of the collection wins when the app starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupPrecedence {
    /// A present local snapshot replaces whatever the remote returned.
    #[default]
    Local,
    Remote,
    /// Remote order, local copies for shared ids, local-only tasks appended.
    Merge,
}

impl StartupPrecedence {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "remote" => Some(Self::Remote),
            "merge" => Some(Self::Merge),
            _ => None,
        }
    }

    pub fn resolve(self, remote: Vec<Task>, local: Option<Vec<Task>>) -> Vec<Task> {
        match (self, local) {
            (Self::Remote, _) | (_, None) => remote,
            (Self::Local, Some(local)) => local,
            (Self::Merge, Some(local)) => {
                let mut merged: Vec<Task> = remote
                    .into_iter()
                    .map(|task| {
                        local
                            .iter()
                            .find(|candidate| candidate.id == task.id)
                            .cloned()
                            .unwrap_or(task)
                    })
                    .collect();
                for task in local {
                    if !merged.iter().any(|existing| existing.id == task.id) {
                        merged.push(task);
                    }
                }
                merged
            }
        }
    }
}

/// What the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskView {
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub last_error: Option<AppError>,
}

/// Owns the authoritative collection and keeps it in step with the remote
/// store, the local snapshot and the countdown.
///
/// New records are computed first and only applied once the remote call
/// succeeds. A failed call leaves the collection untouched and is kept in
/// `last_error`.
pub struct SyncController<R> {
    remote: R,
    snapshots: SnapshotStore,
    startup: StartupPrecedence,
    scheduler: CountdownScheduler,
    tasks: Vec<Task>,
    loading: bool,
    loaded: bool,
    last_error: Option<AppError>,
}

impl<R: RemoteStore> SyncController<R> {
    pub fn new(remote: R, snapshots: SnapshotStore) -> Self {
        Self {
            remote,
            snapshots,
            startup: StartupPrecedence::default(),
            scheduler: CountdownScheduler::default(),
            tasks: Vec::new(),
            loading: false,
            loaded: false,
            last_error: None,
        }
    }

    pub fn with_startup(mut self, startup: StartupPrecedence) -> Self {
        self.startup = startup;
        self
    }

    pub fn with_scheduler(mut self, scheduler: CountdownScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether an initial load has succeeded. Until then the in-memory
    /// collection is never written over the snapshot.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_error(&self) -> Option<&AppError> {
        self.last_error.as_ref()
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn scheduler(&self) -> &CountdownScheduler {
        &self.scheduler
    }

    pub fn view(&self) -> TaskView {
        TaskView {
            tasks: self.tasks.clone(),
            loading: self.loading,
            last_error: self.last_error.clone(),
        }
    }

    /// Cancels the pending tick and schedules a fresh one against the
    /// current collection.
    pub fn rearm(&mut self) -> u64 {
        self.scheduler.arm()
    }

    pub fn persist(&self) {
        self.save_snapshot(&self.tasks);
    }

    pub async fn initial_load(&mut self) -> Result<(), AppError> {
        self.loading = true;
        let fetched = self.remote.list().await;
        self.loading = false;

        let remote = self.record(fetched)?;
        let local = match self.startup {
            StartupPrecedence::Remote => None,
            _ => self.snapshots.load_existing(),
        };
        let tasks = self
            .startup
            .resolve(remote, local)
            .into_iter()
            .map(Task::normalized)
            .collect();

        tracing::debug!(startup = ?self.startup, "initial load complete");
        self.loaded = true;
        self.replace_collection(tasks);
        Ok(())
    }

    pub async fn create(&mut self, title: &str, time: u64) -> Result<Task, AppError> {
        let task = self.record(Task::new(title, time))?;
        let created = self.remote.create(&task).await;
        self.record(created)?;

        let mut tasks = self.tasks.clone();
        tasks.push(task.clone());
        self.replace_collection(tasks);
        Ok(task)
    }

    pub async fn toggle(&mut self, id: &str) -> Result<Task, AppError> {
        let current = self.tasks.iter().find(|task| task.id == id).cloned();
        let current = self.record(current.ok_or_else(|| AppError::invalid_input("task not found")))?;

        let toggled = current.toggled();
        let updated = self.remote.update(id, &toggled).await;
        let confirmed = self.record(updated)?;

        let accepted = if confirmed.id == toggled.id {
            confirmed.normalized()
        } else {
            tracing::warn!(id, returned = %confirmed.id, "update returned a different task; keeping local copy");
            toggled
        };

        let tasks = self
            .tasks
            .iter()
            .map(|task| {
                if task.id == accepted.id {
                    accepted.clone()
                } else {
                    task.clone()
                }
            })
            .collect();
        self.replace_collection(tasks);
        Ok(accepted)
    }

    /// Deletes remotely, then drops the local copy. Returns the removed task
    /// when it was present locally.
    pub async fn delete(&mut self, id: &str) -> Result<Option<Task>, AppError> {
        let deleted = self.remote.delete(id).await;
        self.record(deleted)?;

        let removed = self.tasks.iter().find(|task| task.id == id).cloned();
        let tasks = self
            .tasks
            .iter()
            .filter(|task| task.id != id)
            .cloned()
            .collect();
        self.replace_collection(tasks);
        Ok(removed)
    }

    /// Applies one countdown step, saves the snapshot and re-arms.
    pub fn tick(&mut self) {
        let tasks = decrement_all(&self.tasks);
        self.save_snapshot(&tasks);
        self.replace_collection(tasks);
    }

    /// Waits for the pending tick and applies it. Cancel-safe.
    pub async fn next_tick(&mut self) {
        let generation = self.scheduler.fired().await;
        tracing::trace!(generation, "countdown tick");
        self.tick();
    }

    fn replace_collection(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.scheduler.arm();
    }

    fn save_snapshot(&self, tasks: &[Task]) {
        if !self.loaded {
            tracing::debug!("skipping snapshot save before a successful load");
            return;
        }
        self.snapshots.save(tasks);
    }

    fn record<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(error = %err, "action failed");
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}
