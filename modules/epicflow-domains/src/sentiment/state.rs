//! Sentiment analyzer state and reducer.

use epicflow_engine::Reducer;
use serde::{Deserialize, Serialize};

use super::actions::SentimentAction;
use crate::types::{AnalysisResult, ResultState};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentState {
    pub text: String,
    pub result_state: ResultState<AnalysisResult>,
}

impl SentimentState {
    fn with_result(&self, result_state: ResultState<AnalysisResult>) -> Self {
        Self {
            text: self.text.clone(),
            result_state,
        }
    }
}

pub struct SentimentReducer;

impl Reducer<SentimentAction, SentimentState> for SentimentReducer {
    fn reduce(&self, state: &SentimentState, action: &SentimentAction) -> SentimentState {
        match action {
            SentimentAction::AnalysisRequested { text } => SentimentState {
                text: text.clone(),
                result_state: ResultState::Loading,
            },
            SentimentAction::AnalysisFinished { result } => {
                state.with_result(ResultState::Success(result.clone()))
            }
            SentimentAction::AnalysisCancelled => state.with_result(ResultState::Empty),
            SentimentAction::AnalysisFailed { error } => {
                state.with_result(ResultState::Error(error.clone()))
            }
            SentimentAction::AnalysisStarted { .. }
            | SentimentAction::AnalysisCancellationRequested => state.clone(),
        }
    }
}
