use crate::error::AppError;
use crate::model::Task;
use async_trait::async_trait;

mod http;

pub use http::{DEFAULT_API_URL, DEFAULT_TIMEOUT, HttpTaskStore};

/// The remote CRUD collection the controller mirrors.
///
/// Every call is a single request/response. Implementations do not retry.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>, AppError>;

    /// Sends a new record. Only the status matters; the response body is
    /// ignored.
    async fn create(&self, task: &Task) -> Result<(), AppError>;

    async fn update(&self, id: &str, task: &Task) -> Result<Task, AppError>;

    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[cfg(test)]
pub(crate) mod memory;
