// Scripted sessions: one store + epic per feature, driven the way a
// presentation layer would drive them (dispatch, then watch state).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use epicflow_domains::panel::{panel_epic, PanelAction, PanelReducer, PanelState};
use epicflow_domains::sentiment::{
    sentiment_epic, SentimentAction, SentimentReducer, SentimentState,
};
use epicflow_domains::{AnalysisService, PanelDataSource, ResultState};
use epicflow_engine::{ActionLike, MemoryJournal, Orchestrator, Store};
use tokio::sync::watch;
use tracing::{debug, info};

/// Log every result-state change until `done` holds, then return that snapshot.
async fn watch_until<S, T>(
    mut states: watch::Receiver<Arc<S>>,
    result_of: impl Fn(&S) -> &ResultState<T>,
    done: impl Fn(&ResultState<T>) -> bool,
) -> Result<Arc<S>> {
    let mut last = "";
    loop {
        let state = states.borrow_and_update().clone();
        let result = result_of(&state);
        if result.label() != last {
            last = result.label();
            info!(result = last, "state changed");
        }
        if done(result) {
            return Ok(state);
        }
        states.changed().await?;
    }
}

fn log_journal(journal: &MemoryJournal) {
    for entry in journal.entries() {
        debug!(
            seq = entry.seq,
            action = %entry.action_type,
            origin = %entry.origin,
            payload = %entry.payload,
            "journal"
        );
    }
    info!(actions = journal.len(), "session journal");
}

pub async fn run_panel(source: Arc<dyn PanelDataSource>, query: &str) -> Result<PanelState> {
    let journal = Arc::new(MemoryJournal::new());
    let store = Store::with_journal(PanelReducer, PanelState::default(), journal.clone());
    let mut session = Orchestrator::start(&store, panel_epic(source));
    info!(session_id = %session.id(), epic = session.epic(), query, "panel session started");

    let states = store.watch();
    let submit = PanelAction::submit(query);
    info!(action = submit.action_type(), "dispatch");
    store.dispatch(submit);

    let state = watch_until(states, |s: &PanelState| &s.result_state, |r| !r.is_loading()).await?;

    store.close();
    session.closed().await?;
    log_journal(&journal);
    Ok((*state).clone())
}

pub async fn run_sentiment(
    service: Arc<dyn AnalysisService>,
    text: &str,
    poll_interval: Duration,
    cancel_after: Option<Duration>,
) -> Result<SentimentState> {
    let journal = Arc::new(MemoryJournal::new());
    let store = Store::with_journal(SentimentReducer, SentimentState::default(), journal.clone());
    let mut session = Orchestrator::start(&store, sentiment_epic(service, poll_interval));
    info!(session_id = %session.id(), epic = session.epic(), text, "sentiment session started");

    let states = store.watch();
    store.dispatch(SentimentAction::request(text));

    let canceller = cancel_after.map(|delay| {
        let store = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!(after_ms = delay.as_millis() as u64, "requesting cancellation");
            store.dispatch(SentimentAction::AnalysisCancellationRequested);
        })
    });

    let state = watch_until(
        states,
        |s: &SentimentState| &s.result_state,
        |r| !r.is_loading(),
    )
    .await?;

    if let Some(canceller) = canceller {
        canceller.abort();
    }
    store.close();
    session.closed().await?;
    log_journal(&journal);
    Ok((*state).clone())
}
