use crate::error::AppError;
use crate::model::Task;
use crate::remote::RemoteStore;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpTaskStore {
    client: Client,
    base_url: String,
}

impl HttpTaskStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("api url is required"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::remote(err.to_string()))?;

        Ok(Self {
            client,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/todos/{}", self.base_url, id)
    }
}

fn remote_error(err: reqwest::Error) -> AppError {
    match err.status() {
        Some(status) => AppError::remote(format!("server answered {status}")),
        None => AppError::remote(err.to_string()),
    }
}

async fn read_task(response: Response) -> Result<Task, AppError> {
    response
        .error_for_status()
        .map_err(remote_error)?
        .json::<Task>()
        .await
        .map_err(remote_error)
}

#[async_trait]
impl RemoteStore for HttpTaskStore {
    async fn list(&self) -> Result<Vec<Task>, AppError> {
        let url = self.collection_url();
        tracing::debug!(%url, "listing tasks");
        self.client
            .get(url)
            .send()
            .await
            .map_err(remote_error)?
            .error_for_status()
            .map_err(remote_error)?
            .json::<Vec<Task>>()
            .await
            .map_err(remote_error)
    }

    async fn create(&self, task: &Task) -> Result<(), AppError> {
        let url = self.collection_url();
        tracing::debug!(%url, id = %task.id, "creating task");
        self.client
            .post(url)
            .json(task)
            .send()
            .await
            .map_err(remote_error)?
            .error_for_status()
            .map_err(remote_error)?;
        Ok(())
    }

    async fn update(&self, id: &str, task: &Task) -> Result<Task, AppError> {
        let url = self.item_url(id);
        tracing::debug!(%url, done = task.done, "updating task");
        let response = self
            .client
            .put(url)
            .json(task)
            .send()
            .await
            .map_err(remote_error)?;
        read_task(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let url = self.item_url(id);
        tracing::debug!(%url, "deleting task");
        self.client
            .delete(url)
            .send()
            .await
            .map_err(remote_error)?
            .error_for_status()
            .map_err(remote_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_TIMEOUT, HttpTaskStore};
    use crate::model::Task;
    use crate::remote::RemoteStore;
    use httpmock::Method::{DELETE, GET, POST, PUT};
    use httpmock::MockServer;
    use serde_json::json;

    fn task(id: &str, time: u64, done: bool) -> Task {
        Task {
            id: id.to_string(),
            title: "demo".to_string(),
            time,
            done,
        }
    }

    #[test]
    fn new_trims_trailing_slash() {
        let store = HttpTaskStore::new("http://localhost:5000/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(store.base_url(), "http://localhost:5000");
        assert_eq!(store.item_url("a"), "http://localhost:5000/todos/a");
    }

    #[test]
    fn new_rejects_empty_url() {
        let err = HttpTaskStore::new("  ", DEFAULT_TIMEOUT).err().unwrap();
        assert_eq!(err.code(), "invalid_input");
    }

    #[tokio::test]
    async fn list_reads_collection() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/todos");
                then.status(200).json_body(json!([
                    {"id": "a", "title": "demo", "time": 3, "done": false},
                    {"id": 0.25, "title": "demo", "time": 0, "done": true}
                ]));
            })
            .await;

        let store = HttpTaskStore::new(&server.base_url(), DEFAULT_TIMEOUT).unwrap();
        let tasks = store.list().await.unwrap();

        mock.assert_async().await;
        assert_eq!(tasks, vec![task("a", 3, false), task("0.25", 0, true)]);
    }

    #[tokio::test]
    async fn create_posts_json_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/todos")
                    .json_body(json!({"id": "a", "title": "demo", "time": 5, "done": false}));
                then.status(201)
                    .json_body(json!({"id": "a", "title": "demo", "time": 5, "done": false}));
            })
            .await;

        let store = HttpTaskStore::new(&server.base_url(), DEFAULT_TIMEOUT).unwrap();
        store.create(&task("a", 5, false)).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_ignores_response_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/todos");
                then.status(201).json_body(json!({}));
            })
            .await;

        let store = HttpTaskStore::new(&server.base_url(), DEFAULT_TIMEOUT).unwrap();
        let result = store.create(&task("a", 5, false)).await;

        mock.assert_hits_async(1).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn create_maps_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/todos");
                then.status(500);
            })
            .await;

        let store = HttpTaskStore::new(&server.base_url(), DEFAULT_TIMEOUT).unwrap();
        let err = store.create(&task("a", 5, false)).await.unwrap_err();

        assert_eq!(err.code(), "remote_error");
        assert!(err.message().contains("500"));
    }

    #[tokio::test]
    async fn update_puts_to_item_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT).path("/todos/a");
                then.status(200)
                    .json_body(json!({"id": "a", "title": "demo", "time": 0, "done": true}));
            })
            .await;

        let store = HttpTaskStore::new(&server.base_url(), DEFAULT_TIMEOUT).unwrap();
        let updated = store.update("a", &task("a", 0, true)).await.unwrap();

        mock.assert_async().await;
        assert!(updated.done);
    }

    #[tokio::test]
    async fn delete_hits_item_url_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/todos/a");
                then.status(200);
            })
            .await;

        let store = HttpTaskStore::new(&server.base_url(), DEFAULT_TIMEOUT).unwrap();
        store.delete("a").await.unwrap();

        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn error_status_maps_to_remote_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/todos/missing");
                then.status(404);
            })
            .await;

        let store = HttpTaskStore::new(&server.base_url(), DEFAULT_TIMEOUT).unwrap();
        let err = store.delete("missing").await.unwrap_err();

        assert_eq!(err.code(), "remote_error");
        assert!(err.message().contains("404"));
    }

    #[tokio::test]
    async fn malformed_body_maps_to_remote_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/todos");
                then.status(200).body("not json");
            })
            .await;

        let store = HttpTaskStore::new(&server.base_url(), DEFAULT_TIMEOUT).unwrap();
        let err = store.list().await.unwrap_err();

        assert_eq!(err.code(), "remote_error");
    }
}
