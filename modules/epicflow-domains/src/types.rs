//! Shared value types: what collaborators return and what reducers store.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Result state
// ---------------------------------------------------------------------------

/// Exactly one of these holds for a feature at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ResultState<T> {
    Empty,
    Loading,
    Success(T),
    Error(String),
}

impl<T> Default for ResultState<T> {
    fn default() -> Self {
        ResultState::Empty
    }
}

impl<T> ResultState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ResultState::Loading)
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            ResultState::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            ResultState::Empty => "empty",
            ResultState::Loading => "loading",
            ResultState::Success(_) => "success",
            ResultState::Error(_) => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Panel data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One query's chart data: a list of series, each a list of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    pub series: Vec<Vec<Point>>,
}

impl QueryResults {
    /// Build from `(x, y)` tuples.
    pub fn from_pairs(series: &[&[(f64, f64)]]) -> Self {
        Self {
            series: series
                .iter()
                .map(|s| s.iter().map(|&(x, y)| Point::new(x, y)).collect())
                .collect(),
        }
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Analysis tasks
// ---------------------------------------------------------------------------

/// Opaque server-side task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    InProgress,
    Cancelled,
    Finished,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub sentiment: Sentiment,
}

/// Snapshot of a task as the analysis service reports it. `result` is only
/// present once `status` is `Finished`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
}

impl Task {
    pub fn in_progress(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::InProgress,
            result: None,
        }
    }

    pub fn finished(id: TaskId, sentiment: Sentiment) -> Self {
        Self {
            id,
            status: TaskStatus::Finished,
            result: Some(AnalysisResult { sentiment }),
        }
    }

    pub fn cancelled(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::Cancelled,
            result: None,
        }
    }
}
