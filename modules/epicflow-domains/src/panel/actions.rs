//! Panel builder actions.

use epicflow_engine::ActionLike;
use serde::{Deserialize, Serialize};

use crate::types::QueryResults;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelAction {
    QuerySubmitted { query: String },
    ResultsLoaded { results: QueryResults },
    QueryFailed { error: String },
    /// Marker emitted once per submission by the acknowledge epic.
    QueryAcknowledged { query: String },
}

impl PanelAction {
    pub const QUERY_SUBMITTED: &'static str = "query_submitted";
    pub const RESULTS_LOADED: &'static str = "results_loaded";
    pub const QUERY_FAILED: &'static str = "query_failed";
    pub const QUERY_ACKNOWLEDGED: &'static str = "query_acknowledged";

    pub fn submit(query: impl Into<String>) -> Self {
        PanelAction::QuerySubmitted {
            query: query.into(),
        }
    }
}

impl ActionLike for PanelAction {
    fn action_type(&self) -> &'static str {
        match self {
            PanelAction::QuerySubmitted { .. } => Self::QUERY_SUBMITTED,
            PanelAction::ResultsLoaded { .. } => Self::RESULTS_LOADED,
            PanelAction::QueryFailed { .. } => Self::QUERY_FAILED,
            PanelAction::QueryAcknowledged { .. } => Self::QUERY_ACKNOWLEDGED,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
