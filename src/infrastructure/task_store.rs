use crate::domain::models::{DateGroup, NewTask, RangeUnit, Task, TaskId};
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskListing {
    Flat(Vec<Task>),
    Grouped(Vec<DateGroup>),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub time: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Task>, InfraError>;

    async fn list_by_date(
        &self,
        range: RangeUnit,
        date: NaiveDate,
    ) -> Result<TaskListing, InfraError>;

    async fn create(&self, task: &NewTask) -> Result<Task, InfraError>;

    async fn update(&self, task: &Task) -> Result<Task, InfraError>;

    async fn delete(&self, id: &TaskId) -> Result<(), InfraError>;

    async fn persist_order(&self, ids: &[TaskId]) -> Result<(), InfraError>;

    async fn health(&self) -> Result<HealthStatus, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTaskStore {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    ids: &'a [TaskId],
}

impl ReqwestTaskStore {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(Client::new(), config.base_url.clone())
    }

    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("api base URL cannot be a base".to_string())
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn http_error(status: StatusCode, body: &str) -> InfraError {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|parsed| parsed.error)
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
            .or_else(|| {
                let body = body.trim();
                (!body.is_empty()).then(|| body.to_string())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        InfraError::Http {
            status: status.as_u16(),
            message,
        }
    }

    async fn execute(&self, request: RequestBuilder, action: &str) -> Result<String, InfraError> {
        let response = request
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("network error while {action}: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Network(format!("failed reading response while {action}: {error}")))?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }
        Ok(body)
    }

    fn parse<T: DeserializeOwned>(body: &str, action: &str) -> Result<T, InfraError> {
        serde_json::from_str(body).map_err(|error| {
            InfraError::InvalidPayload(format!("invalid payload while {action}: {error}; body={body}"))
        })
    }

    fn parse_task(body: &str, action: &str) -> Result<Task, InfraError> {
        let task: Task = Self::parse(body, action)?;
        task.validate()
            .map_err(|message| InfraError::InvalidPayload(format!("{message} while {action}")))?;
        Ok(task)
    }

    /// Go encodes an empty slice as `null`.
    fn parse_list<T: DeserializeOwned>(body: &str, action: &str) -> Result<Vec<T>, InfraError> {
        Ok(Self::parse::<Option<Vec<T>>>(body, action)?.unwrap_or_default())
    }
}

#[async_trait]
impl TaskStore for ReqwestTaskStore {
    async fn list_all(&self) -> Result<Vec<Task>, InfraError> {
        let action = "listing tasks";
        let endpoint = self.endpoint(&["todos"])?;
        let body = self.execute(self.client.get(endpoint), action).await?;
        Self::parse_list(&body, action)
    }

    async fn list_by_date(
        &self,
        range: RangeUnit,
        date: NaiveDate,
    ) -> Result<TaskListing, InfraError> {
        let action = "listing tasks by date";
        let endpoint = self.endpoint(&["todos", "by-date"])?;
        let date = date.format("%Y-%m-%d").to_string();
        let request = self
            .client
            .get(endpoint)
            .query(&[("range", range.as_str()), ("date", date.as_str())]);
        let body = self.execute(request, action).await?;

        if range.is_grouped() {
            Ok(TaskListing::Grouped(Self::parse_list(&body, action)?))
        } else {
            Ok(TaskListing::Flat(Self::parse_list(&body, action)?))
        }
    }

    async fn create(&self, task: &NewTask) -> Result<Task, InfraError> {
        if task.title.trim().is_empty() {
            return Err(InfraError::Validation("task title must not be empty".to_string()));
        }
        let action = "creating task";
        let endpoint = self.endpoint(&["todos"])?;
        let body = self
            .execute(self.client.post(endpoint).json(task), action)
            .await?;
        Self::parse_task(&body, action)
    }

    async fn update(&self, task: &Task) -> Result<Task, InfraError> {
        let action = "updating task";
        let id = task.id.to_string();
        let endpoint = self.endpoint(&["todos", &id])?;
        let body = self
            .execute(self.client.put(endpoint).json(task), action)
            .await?;
        Self::parse_task(&body, action)
    }

    async fn delete(&self, id: &TaskId) -> Result<(), InfraError> {
        let id = id.to_string();
        let endpoint = self.endpoint(&["todos", &id])?;
        self.execute(self.client.delete(endpoint), "deleting task")
            .await?;
        Ok(())
    }

    // The reference Go server has no such route: it matches `PUT /todos/:id`
    // and answers 400. Only enable `persistReorder` against a backend that
    // implements it.
    async fn persist_order(&self, ids: &[TaskId]) -> Result<(), InfraError> {
        let endpoint = self.endpoint(&["todos", "order"])?;
        self.execute(
            self.client.put(endpoint).json(&OrderRequest { ids }),
            "saving task order",
        )
        .await?;
        Ok(())
    }

    async fn health(&self) -> Result<HealthStatus, InfraError> {
        let action = "checking health";
        let endpoint = self.endpoint(&["health"])?;
        let body = self.execute(self.client.get(endpoint), action).await?;
        Self::parse(&body, action)
    }
}
