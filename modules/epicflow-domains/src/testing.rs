// Test mocks for the collaborator traits.
//
// - MockDataSource (PanelDataSource): query → results or failure, optional delay
// - MockAnalysisService (AnalysisService): scripted status sequences per task
//
// Both record every call so tests can assert on what reached the network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::traits::{AnalysisService, PanelDataSource};
use crate::types::{QueryResults, Sentiment, Task, TaskId};

// ---------------------------------------------------------------------------
// MockDataSource
// ---------------------------------------------------------------------------

/// HashMap-based data source. Returns `Err` for unregistered queries.
/// Builder pattern: `.on_query()`, `.failing()`, `.delayed()`.
#[derive(Default)]
pub struct MockDataSource {
    responses: HashMap<String, std::result::Result<QueryResults, String>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_query(mut self, query: &str, results: QueryResults) -> Self {
        self.responses.insert(query.to_string(), Ok(results));
        self
    }

    pub fn failing(mut self, query: &str, message: &str) -> Self {
        self.responses
            .insert(query.to_string(), Err(message.to_string()));
        self
    }

    /// Resolve `query` only after `delay`.
    pub fn delayed(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PanelDataSource for MockDataSource {
    async fn query(&self, query: &str) -> Result<QueryResults> {
        self.calls.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        match self.responses.get(query) {
            Some(Ok(results)) => Ok(results.clone()),
            Some(Err(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("MockDataSource: no response registered for {query}")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockAnalysisService
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CallLog {
    starts: Vec<String>,
    statuses: Vec<TaskId>,
    cancels: Vec<TaskId>,
}

/// Scripted analysis service.
///
/// `.on_start(text, id)` maps a text to a task id. `.statuses(id, [..])`
/// scripts what successive status calls return; the last entry repeats.
/// Unscripted tasks report `inProgress` forever.
#[derive(Default)]
pub struct MockAnalysisService {
    starts: HashMap<String, TaskId>,
    start_delays: HashMap<String, Duration>,
    start_failures: HashMap<String, String>,
    status_scripts: Mutex<HashMap<TaskId, VecDeque<Task>>>,
    status_delays: HashMap<TaskId, Duration>,
    status_failures: HashMap<TaskId, String>,
    cancel_delays: HashMap<TaskId, Duration>,
    cancel_failures: HashMap<TaskId, String>,
    calls: Mutex<CallLog>,
}

impl MockAnalysisService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, text: &str, id: TaskId) -> Self {
        self.starts.insert(text.to_string(), id);
        self
    }

    pub fn start_delayed(mut self, text: &str, delay: Duration) -> Self {
        self.start_delays.insert(text.to_string(), delay);
        self
    }

    pub fn start_failing(mut self, text: &str, message: &str) -> Self {
        self.start_failures
            .insert(text.to_string(), message.to_string());
        self
    }

    pub fn statuses(self, id: TaskId, script: Vec<Task>) -> Self {
        self.status_scripts
            .lock()
            .unwrap()
            .insert(id, script.into_iter().collect());
        self
    }

    /// `in_progress` status calls, then `finished` with `sentiment`.
    pub fn finishes_after(self, id: TaskId, in_progress: usize, sentiment: Sentiment) -> Self {
        let mut script = vec![Task::in_progress(id); in_progress];
        script.push(Task::finished(id, sentiment));
        self.statuses(id, script)
    }

    pub fn status_delayed(mut self, id: TaskId, delay: Duration) -> Self {
        self.status_delays.insert(id, delay);
        self
    }

    pub fn status_failing(mut self, id: TaskId, message: &str) -> Self {
        self.status_failures.insert(id, message.to_string());
        self
    }

    pub fn cancel_delayed(mut self, id: TaskId, delay: Duration) -> Self {
        self.cancel_delays.insert(id, delay);
        self
    }

    pub fn cancel_failing(mut self, id: TaskId, message: &str) -> Self {
        self.cancel_failures.insert(id, message.to_string());
        self
    }

    pub fn start_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().starts.clone()
    }

    pub fn status_calls(&self) -> Vec<TaskId> {
        self.calls.lock().unwrap().statuses.clone()
    }

    pub fn cancel_calls(&self) -> Vec<TaskId> {
        self.calls.lock().unwrap().cancels.clone()
    }
}

#[async_trait]
impl AnalysisService for MockAnalysisService {
    async fn start(&self, text: &str) -> Result<Task> {
        self.calls.lock().unwrap().starts.push(text.to_string());
        if let Some(delay) = self.start_delays.get(text) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.start_failures.get(text) {
            return Err(anyhow!("{message}"));
        }
        self.starts
            .get(text)
            .map(|id| Task::in_progress(*id))
            .ok_or_else(|| anyhow!("MockAnalysisService: no task registered for {text}"))
    }

    async fn status(&self, id: TaskId) -> Result<Task> {
        self.calls.lock().unwrap().statuses.push(id);
        if let Some(delay) = self.status_delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.status_failures.get(&id) {
            return Err(anyhow!("{message}"));
        }
        let mut scripts = self.status_scripts.lock().unwrap();
        let task = match scripts.get_mut(&id) {
            Some(script) if script.len() > 1 => script.pop_front(),
            Some(script) => script.front().cloned(),
            None => None,
        };
        Ok(task.unwrap_or_else(|| Task::in_progress(id)))
    }

    async fn cancel(&self, id: TaskId) -> Result<()> {
        self.calls.lock().unwrap().cancels.push(id);
        if let Some(delay) = self.cancel_delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        match self.cancel_failures.get(&id) {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}
