use crate::error::AppError;
use crate::model::Task;
use crate::remote::RemoteStore;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RemoteCall {
    List,
    Create(String),
    Update(String),
    Delete(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    tasks: Vec<Task>,
    calls: Vec<RemoteCall>,
    failing: bool,
    update_response: Option<Task>,
}

/// In-process stand-in for the HTTP store that records every call.
#[derive(Debug, Default)]
pub(crate) struct MemoryRemote {
    state: Mutex<MemoryState>,
}

impl MemoryRemote {
    pub(crate) fn with_tasks(tasks: Vec<Task>) -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().tasks = tasks;
        remote
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    pub(crate) fn respond_to_update_with(&self, task: Task) {
        self.state.lock().unwrap().update_response = Some(task);
    }

    pub(crate) fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn stored(&self) -> Vec<Task> {
        self.state.lock().unwrap().tasks.clone()
    }

    fn begin(&self, call: RemoteCall) -> Result<std::sync::MutexGuard<'_, MemoryState>, AppError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing {
            return Err(AppError::remote("connection refused"));
        }
        Ok(state)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn list(&self) -> Result<Vec<Task>, AppError> {
        let state = self.begin(RemoteCall::List)?;
        Ok(state.tasks.clone())
    }

    async fn create(&self, task: &Task) -> Result<(), AppError> {
        let mut state = self.begin(RemoteCall::Create(task.id.clone()))?;
        state.tasks.push(task.clone());
        Ok(())
    }

    async fn update(&self, id: &str, task: &Task) -> Result<Task, AppError> {
        let mut state = self.begin(RemoteCall::Update(id.to_string()))?;
        let response = state.update_response.take().unwrap_or_else(|| task.clone());
        for stored in state.tasks.iter_mut() {
            if stored.id == id {
                *stored = response.clone();
            }
        }
        Ok(response)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut state = self.begin(RemoteCall::Delete(id.to_string()))?;
        state.tasks.retain(|task| task.id != id);
        Ok(())
    }
}
