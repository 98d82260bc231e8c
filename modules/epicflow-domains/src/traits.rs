// Network collaborator boundaries.
//
// PanelDataSource: single-shot chart query for the panel builder.
// AnalysisService: start / status / cancel for sentiment analysis tasks.
//
// Epics only see these traits. The client crate provides the HTTP and
// simulated implementations; testing.rs provides builder mocks.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{QueryResults, Task, TaskId};

// ---------------------------------------------------------------------------
// PanelDataSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PanelDataSource: Send + Sync {
    /// Execute `query` once and return its series.
    async fn query(&self, query: &str) -> Result<QueryResults>;
}

#[async_trait]
impl<T: PanelDataSource + ?Sized> PanelDataSource for Arc<T> {
    async fn query(&self, query: &str) -> Result<QueryResults> {
        (**self).query(query).await
    }
}

// ---------------------------------------------------------------------------
// AnalysisService
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Begin analysing `text`. Returns as soon as the task has an id.
    async fn start(&self, text: &str) -> Result<Task>;

    /// Current status of `id`.
    async fn status(&self, id: TaskId) -> Result<Task>;

    /// Best-effort cancellation.
    async fn cancel(&self, id: TaskId) -> Result<()>;
}

#[async_trait]
impl<T: AnalysisService + ?Sized> AnalysisService for Arc<T> {
    async fn start(&self, text: &str) -> Result<Task> {
        (**self).start(text).await
    }

    async fn status(&self, id: TaskId) -> Result<Task> {
        (**self).status(id).await
    }

    async fn cancel(&self, id: TaskId) -> Result<()> {
        (**self).cancel(id).await
    }
}
