//! Request → poll → cancel for one analysis job, as three sub-epics over
//! the same upstream.
//!
//! - `StartEpic`: AnalysisRequested → `start` → AnalysisStarted.
//! - `PollEpic`: AnalysisStarted → `status` now, then once per interval,
//!   until terminal → AnalysisFinished. Stopped by a cancellation request or
//!   a new request.
//! - `CancelEpic`: AnalysisCancellationRequested + latest AnalysisStarted →
//!   `cancel` → AnalysisCancelled.
//!
//! Each sub-epic owns a `Switch`, so a superseded call never dispatches.
//! Rejected calls become AnalysisFailed.

use std::sync::Arc;
use std::time::Duration;

use epicflow_engine::{ActionStream, Emitter, Epic, Switch, Ticket};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use tracing::{debug, info, warn, Instrument};

use super::actions::SentimentAction;
use crate::traits::AnalysisService;
use crate::types::{TaskId, TaskStatus};

/// Delay between status calls for an in-progress task.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

const START_TRIGGERS: &[&str] = &[SentimentAction::REQUESTED];
const POLL_TRIGGERS: &[&str] = &[
    SentimentAction::STARTED,
    SentimentAction::REQUESTED,
    SentimentAction::CANCELLATION_REQUESTED,
];
const CANCEL_TRIGGERS: &[&str] = &[
    SentimentAction::CANCELLATION_REQUESTED,
    SentimentAction::REQUESTED,
];

fn failed(err: anyhow::Error) -> SentimentAction {
    SentimentAction::AnalysisFailed {
        error: format!("Error: {err}"),
    }
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

pub struct StartEpic {
    service: Arc<dyn AnalysisService>,
}

impl StartEpic {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }
}

impl Epic<SentimentAction> for StartEpic {
    fn name(&self) -> &'static str {
        "analysis_start"
    }

    fn wire(
        &self,
        actions: ActionStream<SentimentAction>,
        out: Emitter<SentimentAction>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        let (actions, mut switch) = Switch::attach(actions, "analysis_start", START_TRIGGERS, &out);
        let mut requests = actions.select(|action| match action {
            SentimentAction::AnalysisRequested { text } => Some(text),
            _ => None,
        });
        let service = self.service.clone();

        async move {
            while let Some(text) = requests.next().await {
                let ticket = switch.advance();
                tokio::spawn(
                    start_analysis(service.clone(), text, ticket, out.clone()).in_current_span(),
                );
            }
            Ok(())
        }
        .boxed()
    }
}

async fn start_analysis(
    service: Arc<dyn AnalysisService>,
    text: String,
    ticket: Ticket,
    out: Emitter<SentimentAction>,
) {
    let Some(outcome) = ticket.run(service.start(&text)).await else {
        debug!("start call superseded by a newer request");
        return;
    };

    let action = match outcome {
        Ok(task) => {
            info!(task_id = %task.id, chars = text.len(), "analysis started");
            SentimentAction::AnalysisStarted { task_id: task.id }
        }
        Err(err) => {
            warn!(error = %err, "analysis start failed");
            failed(err)
        }
    };
    out.emit_current(&ticket, action);
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

pub struct PollEpic {
    service: Arc<dyn AnalysisService>,
    interval: Duration,
}

impl PollEpic {
    pub fn new(service: Arc<dyn AnalysisService>, interval: Duration) -> Self {
        Self { service, interval }
    }
}

impl Epic<SentimentAction> for PollEpic {
    fn name(&self) -> &'static str {
        "analysis_poll"
    }

    fn wire(
        &self,
        actions: ActionStream<SentimentAction>,
        out: Emitter<SentimentAction>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        let (actions, mut switch) = Switch::attach(actions, "analysis_poll", POLL_TRIGGERS, &out);
        // Some(id) starts a poll; None only stops the current one.
        let mut triggers = actions.select(|action| match action {
            SentimentAction::AnalysisStarted { task_id } => Some(Some(task_id)),
            SentimentAction::AnalysisRequested { .. }
            | SentimentAction::AnalysisCancellationRequested => Some(None),
            _ => None,
        });
        let service = self.service.clone();
        let interval = self.interval;

        async move {
            while let Some(trigger) = triggers.next().await {
                match trigger {
                    Some(task_id) => {
                        let ticket = switch.advance();
                        tokio::spawn(
                            poll_task(service.clone(), task_id, interval, ticket, out.clone())
                                .in_current_span(),
                        );
                    }
                    None => switch.interrupt(),
                }
            }
            Ok(())
        }
        .boxed()
    }
}

async fn poll_task(
    service: Arc<dyn AnalysisService>,
    task_id: TaskId,
    interval: Duration,
    ticket: Ticket,
    out: Emitter<SentimentAction>,
) {
    let mut polls = 0u32;
    loop {
        // A stopping action may already be published even if the epic has
        // not yet cancelled this ticket.
        if !ticket.is_current() {
            debug!(task_id = %task_id, polls, "polling stopped");
            return;
        }
        let Some(outcome) = ticket.run(service.status(task_id)).await else {
            debug!(task_id = %task_id, polls, "polling stopped mid-call");
            return;
        };
        polls += 1;

        let task = match outcome {
            Ok(task) => task,
            Err(err) => {
                warn!(task_id = %task_id, polls, error = %err, "status call failed");
                out.emit_current(&ticket, failed(err));
                return;
            }
        };

        match task.status {
            TaskStatus::InProgress => {
                debug!(task_id = %task_id, polls, "analysis in progress");
                if !ticket.sleep(interval).await {
                    debug!(task_id = %task_id, polls, "polling stopped while waiting");
                    return;
                }
            }
            TaskStatus::Finished => {
                let action = match task.result {
                    Some(result) => {
                        info!(task_id = %task_id, polls, sentiment = ?result.sentiment, "analysis finished");
                        SentimentAction::AnalysisFinished { result }
                    }
                    None => {
                        warn!(task_id = %task_id, "finished task carried no result");
                        failed(anyhow::anyhow!("task {task_id} finished without a result"))
                    }
                };
                out.emit_current(&ticket, action);
                return;
            }
            TaskStatus::Cancelled => {
                info!(task_id = %task_id, polls, "analysis cancelled server-side");
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

enum CancelInput {
    Started(TaskId),
    Cancel,
    Request,
}

pub struct CancelEpic {
    service: Arc<dyn AnalysisService>,
}

impl CancelEpic {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }
}

impl Epic<SentimentAction> for CancelEpic {
    fn name(&self) -> &'static str {
        "analysis_cancel"
    }

    fn wire(
        &self,
        actions: ActionStream<SentimentAction>,
        out: Emitter<SentimentAction>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        let (actions, mut switch) =
            Switch::attach(actions, "analysis_cancel", CANCEL_TRIGGERS, &out);
        let mut inputs = actions.select(|action| match action {
            SentimentAction::AnalysisStarted { task_id } => Some(CancelInput::Started(task_id)),
            SentimentAction::AnalysisCancellationRequested => Some(CancelInput::Cancel),
            SentimentAction::AnalysisRequested { .. } => Some(CancelInput::Request),
            _ => None,
        });
        let service = self.service.clone();

        async move {
            // Task started for the latest request, if it has started yet.
            let mut latest: Option<TaskId> = None;
            while let Some(input) = inputs.next().await {
                match input {
                    CancelInput::Started(task_id) => latest = Some(task_id),
                    CancelInput::Request => {
                        latest = None;
                        switch.interrupt();
                    }
                    CancelInput::Cancel => match latest {
                        Some(task_id) => {
                            let ticket = switch.advance();
                            tokio::spawn(
                                cancel_task(service.clone(), task_id, ticket, out.clone())
                                    .in_current_span(),
                            );
                        }
                        None => {
                            debug!("cancellation requested before the latest request started a task");
                            switch.interrupt();
                        }
                    },
                }
            }
            Ok(())
        }
        .boxed()
    }
}

async fn cancel_task(
    service: Arc<dyn AnalysisService>,
    task_id: TaskId,
    ticket: Ticket,
    out: Emitter<SentimentAction>,
) {
    let Some(outcome) = ticket.run(service.cancel(task_id)).await else {
        debug!(task_id = %task_id, "cancel call superseded");
        return;
    };

    let action = match outcome {
        Ok(()) => {
            info!(task_id = %task_id, "analysis cancelled");
            SentimentAction::AnalysisCancelled
        }
        Err(err) => {
            warn!(task_id = %task_id, error = %err, "cancel call failed");
            failed(err)
        }
    };
    out.emit_current(&ticket, action);
}
