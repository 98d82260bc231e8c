//! Panel builder state and reducer.

use epicflow_engine::Reducer;
use serde::{Deserialize, Serialize};

use super::actions::PanelAction;
use crate::types::{QueryResults, ResultState};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelState {
    pub query: String,
    pub result_state: ResultState<QueryResults>,
}

pub struct PanelReducer;

impl Reducer<PanelAction, PanelState> for PanelReducer {
    fn reduce(&self, state: &PanelState, action: &PanelAction) -> PanelState {
        match action {
            PanelAction::QuerySubmitted { query } => PanelState {
                query: query.clone(),
                result_state: ResultState::Loading,
            },
            PanelAction::ResultsLoaded { results } => PanelState {
                query: state.query.clone(),
                result_state: ResultState::Success(results.clone()),
            },
            PanelAction::QueryFailed { error } => PanelState {
                query: state.query.clone(),
                result_state: ResultState::Error(error.clone()),
            },
            PanelAction::QueryAcknowledged { .. } => state.clone(),
        }
    }
}
