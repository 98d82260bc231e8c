//! Sentiment analyzer actions.

use epicflow_engine::ActionLike;
use serde::{Deserialize, Serialize};

use crate::types::{AnalysisResult, TaskId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SentimentAction {
    AnalysisRequested { text: String },
    AnalysisStarted { task_id: TaskId },
    AnalysisFinished { result: AnalysisResult },
    AnalysisCancellationRequested,
    AnalysisCancelled,
    /// A start, status or cancel call was rejected.
    AnalysisFailed { error: String },
}

impl SentimentAction {
    pub const REQUESTED: &'static str = "analysis_requested";
    pub const STARTED: &'static str = "analysis_started";
    pub const FINISHED: &'static str = "analysis_finished";
    pub const CANCELLATION_REQUESTED: &'static str = "analysis_cancellation_requested";
    pub const CANCELLED: &'static str = "analysis_cancelled";
    pub const FAILED: &'static str = "analysis_failed";

    pub fn request(text: impl Into<String>) -> Self {
        SentimentAction::AnalysisRequested { text: text.into() }
    }
}

impl ActionLike for SentimentAction {
    fn action_type(&self) -> &'static str {
        match self {
            SentimentAction::AnalysisRequested { .. } => Self::REQUESTED,
            SentimentAction::AnalysisStarted { .. } => Self::STARTED,
            SentimentAction::AnalysisFinished { .. } => Self::FINISHED,
            SentimentAction::AnalysisCancellationRequested => Self::CANCELLATION_REQUESTED,
            SentimentAction::AnalysisCancelled => Self::CANCELLED,
            SentimentAction::AnalysisFailed { .. } => Self::FAILED,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_carries_discriminant() {
        let started = SentimentAction::AnalysisStarted {
            task_id: TaskId(42),
        };
        assert_eq!(
            started.to_payload(),
            json!({ "type": "analysis_started", "task_id": 42 })
        );
        assert_eq!(
            SentimentAction::AnalysisCancelled.to_payload(),
            json!({ "type": SentimentAction::CANCELLED })
        );
    }
}
