//! In-process backend with simulated latency.
//!
//! Panel queries always return the same series. Analysis tasks report
//! `inProgress` until their `polls_to_finish`-th status call, which returns
//! `finished` with a sentiment guessed from the text. Cancelling an
//! in-progress task marks it `cancelled`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use epicflow_domains::{
    AnalysisService, PanelDataSource, QueryResults, Sentiment, Task, TaskId, TaskStatus,
};
use tracing::debug;

use crate::error::{ClientError, Result};

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "sad", "hate", "poor", "worst", "angry",
];

struct SimTask {
    sentiment: Sentiment,
    polls: u32,
    status: TaskStatus,
}

pub struct SimulatedBackend {
    latency: Duration,
    polls_to_finish: u32,
    next_id: AtomicU64,
    tasks: Mutex<HashMap<TaskId, SimTask>>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 2)
    }
}

impl SimulatedBackend {
    pub fn new(latency: Duration, polls_to_finish: u32) -> Self {
        Self {
            latency,
            polls_to_finish: polls_to_finish.max(1),
            next_id: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// The series every panel query returns.
    pub fn fixed_series() -> QueryResults {
        QueryResults::from_pairs(&[&[(0.0, 1.0), (1.0, 2.0), (2.0, 1.0)]])
    }

    pub fn classify(text: &str) -> Sentiment {
        let lower = text.to_lowercase();
        let negative = lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| NEGATIVE_WORDS.contains(&word));
        if negative {
            Sentiment::Negative
        } else {
            Sentiment::Positive
        }
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<TaskId, SimTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn not_found(id: TaskId) -> ClientError {
        ClientError::Api {
            status: 404,
            message: format!("task {id} not found"),
        }
    }

    pub async fn fetch_panel_data(&self, query: &str) -> Result<QueryResults> {
        tokio::time::sleep(self.latency).await;
        debug!(query, "simulated panel query");
        Ok(Self::fixed_series())
    }

    pub async fn start_analysis(&self, text: &str) -> Result<Task> {
        tokio::time::sleep(self.latency).await;
        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.tasks().insert(
            id,
            SimTask {
                sentiment: Self::classify(text),
                polls: 0,
                status: TaskStatus::InProgress,
            },
        );
        debug!(task_id = %id, "simulated task created");
        Ok(Task::in_progress(id))
    }

    pub async fn get_task_status(&self, id: TaskId) -> Result<Task> {
        tokio::time::sleep(self.latency).await;
        let mut tasks = self.tasks();
        let task = tasks.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        if !task.status.is_terminal() {
            task.polls += 1;
            if task.polls >= self.polls_to_finish {
                task.status = TaskStatus::Finished;
            }
        }
        Ok(match task.status {
            TaskStatus::InProgress => Task::in_progress(id),
            TaskStatus::Finished => Task::finished(id, task.sentiment),
            TaskStatus::Cancelled => Task::cancelled(id),
        })
    }

    pub async fn cancel_task(&self, id: TaskId) -> Result<()> {
        tokio::time::sleep(self.latency).await;
        let mut tasks = self.tasks();
        let task = tasks.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        if !task.status.is_terminal() {
            task.status = TaskStatus::Cancelled;
        }
        Ok(())
    }
}

#[async_trait]
impl PanelDataSource for SimulatedBackend {
    async fn query(&self, query: &str) -> AnyResult<QueryResults> {
        Ok(self.fetch_panel_data(query).await?)
    }
}

#[async_trait]
impl AnalysisService for SimulatedBackend {
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
