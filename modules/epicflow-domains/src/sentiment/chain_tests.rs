//! Chain tests: scripted analysis service → store + sentiment epics → state,
//! journal and recorded network calls.
//!
//! Time is paused. Status calls happen at t=0 after AnalysisStarted and then
//! once per second.

use std::sync::Arc;
use std::time::Duration;

use epicflow_engine::{MemoryJournal, Orchestrator, Session, Store};

use super::*;
use crate::testing::MockAnalysisService;
use crate::types::{ResultState, Sentiment, TaskId};

struct Harness {
    store: Store<SentimentAction, SentimentState>,
    journal: Arc<MemoryJournal>,
    service: Arc<MockAnalysisService>,
    _session: Session,
}

fn harness(service: MockAnalysisService) -> Harness {
    let service = Arc::new(service);
    let journal = Arc::new(MemoryJournal::new());
    let store = Store::with_journal(SentimentReducer, SentimentState::default(), journal.clone());
    let session = Orchestrator::start(&store, sentiment_epic(service.clone(), POLL_INTERVAL));
    Harness {
        store,
        journal,
        service,
        _session: session,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(30)).await;
}

async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn request_polls_until_finished() {
    let h = harness(
        MockAnalysisService::new()
            .on_start("great day", TaskId(42))
            .finishes_after(TaskId(42), 1, Sentiment::Positive),
    );

    h.store.dispatch(SentimentAction::request("great day"));
    assert!(h.store.state().result_state.is_loading());

    settle().await;

    assert_eq!(
        h.journal.action_types(),
        vec![
            SentimentAction::REQUESTED,
            SentimentAction::STARTED,
            SentimentAction::FINISHED,
        ]
    );
    let finished = h.journal.of_type(SentimentAction::FINISHED);
    assert_eq!(finished[0].payload["result"]["sentiment"], "positive");

    // In progress, then finished. Nothing after the terminal status.
    assert_eq!(h.service.status_calls(), vec![TaskId(42), TaskId(42)]);
    assert_eq!(
        h.store.state().result_state.success().map(|r| r.sentiment),
        Some(Sentiment::Positive)
    );
}

#[tokio::test(start_paused = true)]
async fn status_is_called_once_per_interval() {
    let h = harness(MockAnalysisService::new().on_start("slow", TaskId(3)));

    h.store.dispatch(SentimentAction::request("slow"));
    advance_ms(500).await;
    assert_eq!(h.service.status_calls().len(), 1);

    advance_ms(1_000).await;
    assert_eq!(h.service.status_calls().len(), 2);

    advance_ms(1_000).await;
    assert_eq!(h.service.status_calls().len(), 3);
    assert_eq!(h.journal.count(SentimentAction::FINISHED), 0);
}

#[tokio::test(start_paused = true)]
async fn server_side_cancelled_status_emits_nothing() {
    let h = harness(
        MockAnalysisService::new()
            .on_start("text", TaskId(5))
            .statuses(
                TaskId(5),
                vec![
                    crate::types::Task::in_progress(TaskId(5)),
                    crate::types::Task::cancelled(TaskId(5)),
                ],
            ),
    );

    h.store.dispatch(SentimentAction::request("text"));
    settle().await;

    assert_eq!(h.service.status_calls().len(), 2);
    assert_eq!(h.journal.count(SentimentAction::FINISHED), 0);
    assert_eq!(h.journal.count(SentimentAction::CANCELLED), 0);
    assert!(h.store.state().result_state.is_loading());
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancellation_wins_over_poll() {
    let h = harness(MockAnalysisService::new().on_start("long", TaskId(7)));

    h.store.dispatch(SentimentAction::request("long"));
    advance_ms(2_500).await;
    assert_eq!(h.service.status_calls().len(), 3);

    h.store
        .dispatch(SentimentAction::AnalysisCancellationRequested);
    settle().await;

    assert_eq!(h.service.status_calls().len(), 3);
    assert_eq!(h.service.cancel_calls(), vec![TaskId(7)]);
    assert_eq!(h.journal.count(SentimentAction::CANCELLED), 1);
    assert_eq!(h.journal.count(SentimentAction::FINISHED), 0);
    assert_eq!(h.store.state().result_state, ResultState::Empty);
}

#[tokio::test(start_paused = true)]
async fn cancellation_without_started_task_does_nothing() {
    let h = harness(MockAnalysisService::new());

    h.store
        .dispatch(SentimentAction::AnalysisCancellationRequested);
    settle().await;

    assert!(h.service.cancel_calls().is_empty());
    assert_eq!(h.journal.count(SentimentAction::CANCELLED), 0);
    assert_eq!(h.journal.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_after_finish_still_resets_state() {
    let h = harness(
        MockAnalysisService::new()
            .on_start("done", TaskId(1))
            .finishes_after(TaskId(1), 0, Sentiment::Negative),
    );

    h.store.dispatch(SentimentAction::request("done"));
    settle().await;
    assert!(h.store.state().result_state.success().is_some());

    h.store
        .dispatch(SentimentAction::AnalysisCancellationRequested);
    settle().await;

    assert_eq!(h.service.status_calls(), vec![TaskId(1)]);
    assert_eq!(h.service.cancel_calls(), vec![TaskId(1)]);
    assert_eq!(h.journal.count(SentimentAction::FINISHED), 1);
    assert_eq!(h.journal.count(SentimentAction::CANCELLED), 1);
    assert_eq!(h.store.state().result_state, ResultState::Empty);

    // Cancelled on an already-empty state stays empty.
    h.store.dispatch(SentimentAction::AnalysisCancelled);
    assert_eq!(h.store.state().result_state, ResultState::Empty);
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_in_flight_status_call() {
    let h = harness(
        MockAnalysisService::new()
            .on_start("text", TaskId(1))
            .status_delayed(TaskId(1), Duration::from_millis(500))
            .finishes_after(TaskId(1), 0, Sentiment::Positive),
    );

    h.store.dispatch(SentimentAction::request("text"));
    advance_ms(100).await;
    assert_eq!(h.service.status_calls(), vec![TaskId(1)]);

    h.store
        .dispatch(SentimentAction::AnalysisCancellationRequested);
    settle().await;

    // The status call was still in flight, so its finished status never lands.
    assert_eq!(h.service.status_calls(), vec![TaskId(1)]);
    assert_eq!(h.journal.count(SentimentAction::FINISHED), 0);
    assert_eq!(h.journal.count(SentimentAction::CANCELLED), 1);
    assert_eq!(h.store.state().result_state, ResultState::Empty);
}

// ---------------------------------------------------------------------------
// Overlapping requests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn newer_request_discards_outstanding_start() {
    let h = harness(
        MockAnalysisService::new()
            .on_start("first", TaskId(1))
            .start_delayed("first", Duration::from_millis(500))
            .on_start("second", TaskId(2))
            .finishes_after(TaskId(2), 1, Sentiment::Positive),
    );

    h.store.dispatch(SentimentAction::request("first"));
    h.store.dispatch(SentimentAction::request("second"));
    settle().await;

    let started = h.journal.of_type(SentimentAction::STARTED);
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].payload["task_id"], 2);
    assert!(!h.service.status_calls().contains(&TaskId(1)));
    assert_eq!(h.journal.count(SentimentAction::FINISHED), 1);
    assert_eq!(h.store.state().text, "second");
}

#[tokio::test(start_paused = true)]
async fn newer_request_stops_previous_poll() {
    let h = harness(
        MockAnalysisService::new()
            .on_start("first", TaskId(1))
            .on_start("second", TaskId(2))
            .finishes_after(TaskId(2), 0, Sentiment::Positive),
    );

    h.store.dispatch(SentimentAction::request("first"));
    advance_ms(1_500).await;
    h.store.dispatch(SentimentAction::request("second"));
    settle().await;

    let calls = h.service.status_calls();
    assert_eq!(calls.iter().filter(|id| **id == TaskId(1)).count(), 2);
    assert_eq!(calls.iter().filter(|id| **id == TaskId(2)).count(), 1);
    assert_eq!(h.journal.count(SentimentAction::FINISHED), 1);
}

#[tokio::test(start_paused = true)]
async fn newer_request_drops_pending_cancellation() {
    let h = harness(
        MockAnalysisService::new()
            .on_start("first", TaskId(1))
            .cancel_delayed(TaskId(1), Duration::from_millis(500))
            .on_start("second", TaskId(2))
            .finishes_after(TaskId(2), 0, Sentiment::Positive),
    );

    h.store.dispatch(SentimentAction::request("first"));
    advance_ms(100).await;
    h.store
        .dispatch(SentimentAction::AnalysisCancellationRequested);
    advance_ms(100).await;
    h.store.dispatch(SentimentAction::request("second"));
    settle().await;

    // The cancel call for task 1 went out but its result is stale.
    assert_eq!(h.service.cancel_calls(), vec![TaskId(1)]);
    assert_eq!(h.journal.count(SentimentAction::CANCELLED), 0);
    assert_eq!(h.journal.count(SentimentAction::FINISHED), 1);
    assert_eq!(
        h.store.state().result_state.success().map(|r| r.sentiment),
        Some(Sentiment::Positive)
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_before_newer_task_starts_leaves_previous_task_alone() {
    let h = harness(
        MockAnalysisService::new()
            .on_start("first", TaskId(1))
            .finishes_after(TaskId(1), 0, Sentiment::Negative)
            .on_start("second", TaskId(2))
            .start_delayed("second", Duration::from_millis(500))
            .finishes_after(TaskId(2), 0, Sentiment::Positive),
    );

    h.store.dispatch(SentimentAction::request("first"));
    settle().await;
    assert!(h.store.state().result_state.success().is_some());

    h.store.dispatch(SentimentAction::request("second"));
    advance_ms(100).await;
    h.store
        .dispatch(SentimentAction::AnalysisCancellationRequested);
    settle().await;

    // Task 1 belongs to a superseded request, so nothing is cancelled.
    assert!(h.service.cancel_calls().is_empty());
    assert_eq!(h.journal.count(SentimentAction::CANCELLED), 0);
    assert_eq!(h.service.start_calls(), vec!["first", "second"]);

    // The outstanding start still resolves and is polled to completion.
    assert_eq!(h.service.status_calls(), vec![TaskId(1), TaskId(2)]);
    assert_eq!(
        h.store.state().result_state.success().map(|r| r.sentiment),
        Some(Sentiment::Positive)
    );
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn start_failure_surfaces_as_error() {
    let h = harness(MockAnalysisService::new().start_failing("text", "quota exceeded"));

    h.store.dispatch(SentimentAction::request("text"));
    settle().await;

    assert_eq!(h.journal.count(SentimentAction::STARTED), 0);
    assert_eq!(
        h.store.state().result_state,
        ResultState::Error("Error: quota exceeded".into())
    );
}

#[tokio::test(start_paused = true)]
async fn status_failure_stops_polling() {
    let h = harness(
        MockAnalysisService::new()
            .on_start("text", TaskId(8))
            .status_failing(TaskId(8), "gateway timeout"),
    );

    h.store.dispatch(SentimentAction::request("text"));
    settle().await;

    assert_eq!(h.service.status_calls(), vec![TaskId(8)]);
    let failed = h.journal.of_type(SentimentAction::FAILED);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].origin, "analysis_poll");
    assert_eq!(
        h.store.state().result_state,
        ResultState::Error("Error: gateway timeout".into())
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_failure_surfaces_as_error() {
    let h = harness(
        MockAnalysisService::new()
            .on_start("text", TaskId(4))
            .cancel_failing(TaskId(4), "not found"),
    );

    h.store.dispatch(SentimentAction::request("text"));
    advance_ms(100).await;
    h.store
        .dispatch(SentimentAction::AnalysisCancellationRequested);
    settle().await;

    assert_eq!(h.journal.count(SentimentAction::CANCELLED), 0);
    assert_eq!(
        h.store.state().result_state,
        ResultState::Error("Error: not found".into())
    );
}
