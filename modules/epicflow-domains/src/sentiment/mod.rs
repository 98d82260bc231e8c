// Sentiment analyzer: submit text, poll the task, allow cancellation.

pub mod actions;
pub mod epics;
pub mod state;

#[cfg(test)]
mod chain_tests;

use std::sync::Arc;
use std::time::Duration;

use epicflow_engine::{combine_epics, CombinedEpic};

use crate::traits::AnalysisService;
pub use actions::SentimentAction;
pub use epics::{CancelEpic, PollEpic, StartEpic, POLL_INTERVAL};
pub use state::{SentimentReducer, SentimentState};

/// Start, poll and cancel, combined over one upstream.
pub fn sentiment_epic(
    service: Arc<dyn AnalysisService>,
    poll_interval: Duration,
) -> CombinedEpic<SentimentAction> {
    combine_epics::<SentimentAction>(vec![])
        .named("sentiment")
        .with(StartEpic::new(service.clone()))
        .with(PollEpic::new(service.clone(), poll_interval))
        .with(CancelEpic::new(service))
}
