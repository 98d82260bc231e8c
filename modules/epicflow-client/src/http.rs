use anyhow::Result as AnyResult;
use async_trait::async_trait;
use epicflow_domains::{AnalysisService, PanelDataSource, QueryResults, Task, TaskId};
use serde::Serialize;

use crate::error::{ClientError, Result};

#[derive(Serialize)]
struct StartRequest<'a> {
    text: &'a str,
}

/// JSON-over-HTTP backend for both collaborators.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}/panel?query=..`
    pub async fn fetch_panel_data(&self, query: &str) -> Result<QueryResults> {
        let url = format!("{}/panel", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await?;
        let resp = check(resp).await?;
        Ok(resp.json().await?)
    }

    /// `POST {base}/analysis` with `{"text": ..}`.
    pub async fn start_analysis(&self, text: &str) -> Result<Task> {
        let url = format!("{}/analysis", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&StartRequest { text })
            .send()
            .await?;
        let resp = check(resp).await?;
        let task: Task = resp.json().await?;
        tracing::debug!(task_id = %task.id, "analysis task created");
        Ok(task)
    }

    /// `GET {base}/analysis/{id}`
    pub async fn get_task_status(&self, id: TaskId) -> Result<Task> {
        let url = format!("{}/analysis/{}", self.base_url, id);
        let resp = self.client.get(&url).send().await?;
        let resp = check(resp).await?;
        Ok(resp.json().await?)
    }

    /// `DELETE {base}/analysis/{id}`
    pub async fn cancel_task(&self, id: TaskId) -> Result<()> {
        let url = format!("{}/analysis/{}", self.base_url, id);
        let resp = self.client.delete(&url).send().await?;
        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}

#[async_trait]
impl PanelDataSource for HttpBackend {
    async fn query(&self, query: &str) -> AnyResult<QueryResults> {
        Ok(self.fetch_panel_data(query).await?)
    }
}

#[async_trait]
impl AnalysisService for HttpBackend {
    async fn start(&self, text: &str) -> AnyResult<Task> {
        Ok(self.start_analysis(text).await?)
    }

    async fn status(&self, id: TaskId) -> AnyResult<Task> {
        Ok(self.get_task_status(id).await?)
    }

    async fn cancel(&self, id: TaskId) -> AnyResult<()> {
        Ok(self.cancel_task(id).await?)
    }
}
