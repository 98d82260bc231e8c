//! Integration tests for the store + session loop.
//! Time is paused, so sleeps advance a virtual clock once every task is idle.

use std::time::Duration;

use anyhow::anyhow;
use epicflow_engine::{
    combine_epics, ActionLike, ActionStream, Emitter, EngineError, Epic, MemoryJournal,
    Orchestrator, Reducer, Store, Switch,
};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Test action type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TestAction {
    Start { label: String },
    Middle { label: String },
    End { label: String },
    Slow { label: String, delay_ms: u64 },
    Done { label: String },
}

impl ActionLike for TestAction {
    fn action_type(&self) -> &'static str {
        match self {
            TestAction::Start { .. } => "start",
            TestAction::Middle { .. } => "middle",
            TestAction::End { .. } => "end",
            TestAction::Slow { .. } => "slow",
            TestAction::Done { .. } => "done",
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("TestAction serialization should never fail")
    }
}

// ---------------------------------------------------------------------------
// Test state + reducer
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct TestState {
    seen: Vec<String>,
    end_count: u32,
}

struct TestReducer;

impl Reducer<TestAction, TestState> for TestReducer {
    fn reduce(&self, state: &TestState, action: &TestAction) -> TestState {
        let mut next = state.clone();
        match action {
            TestAction::Start { label }
            | TestAction::Middle { label }
            | TestAction::Done { label } => next.seen.push(label.clone()),
            TestAction::End { label } => {
                next.seen.push(label.clone());
                next.end_count += 1;
            }
            TestAction::Slow { .. } => {}
        }
        next
    }
}

// ---------------------------------------------------------------------------
// Chaining epic: Start → Middle → End, reacting to its own output
// ---------------------------------------------------------------------------

struct ChainingEpic;

impl Epic<TestAction> for ChainingEpic {
    fn name(&self) -> &'static str {
        "chaining"
    }

    fn wire(
        &self,
        mut actions: ActionStream<TestAction>,
        out: Emitter<TestAction>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        async move {
            while let Some(action) = actions.next().await {
                match action {
                    TestAction::Start { label } => {
                        out.emit(TestAction::Middle {
                            label: format!("{label}→middle"),
                        });
                    }
                    TestAction::Middle { label } => {
                        out.emit(TestAction::End {
                            label: format!("{label}→end"),
                        });
                    }
                    _ => {}
                }
            }
            Ok(())
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Fan-out epic: Start emits three Ends
// ---------------------------------------------------------------------------

struct FanOutEpic;

impl Epic<TestAction> for FanOutEpic {
    fn name(&self) -> &'static str {
        "fan_out"
    }

    fn wire(
        &self,
        actions: ActionStream<TestAction>,
        out: Emitter<TestAction>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        let mut starts = actions.of_type("start");
        async move {
            while starts.next().await.is_some() {
                for n in 1..=3 {
                    out.emit(TestAction::End {
                        label: format!("child-{n}"),
                    });
                }
            }
            Ok(())
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Latest-wins epic: Slow → (delay) → Done, superseded by the next Slow
// ---------------------------------------------------------------------------

struct LatestEpic;

impl Epic<TestAction> for LatestEpic {
    fn name(&self) -> &'static str {
        "latest"
    }

    fn wire(
        &self,
        actions: ActionStream<TestAction>,
        out: Emitter<TestAction>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        let (actions, mut switch) = Switch::attach(actions, "latest", &["slow"], &out);
        let mut slows = actions.select(|action| match action {
            TestAction::Slow { label, delay_ms } => Some((label, delay_ms)),
            _ => None,
        });
        async move {
            while let Some((label, delay_ms)) = slows.next().await {
                let ticket = switch.advance();
                let out = out.clone();
                tokio::spawn(async move {
                    if ticket.sleep(Duration::from_millis(delay_ms)).await {
                        out.emit_current(&ticket, TestAction::Done { label });
                    }
                });
            }
            Ok(())
        }
        .boxed()
    }
}

struct FailingEpic;

impl Epic<TestAction> for FailingEpic {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn wire(
        &self,
        _actions: ActionStream<TestAction>,
        _out: Emitter<TestAction>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        async { Err(anyhow!("boom")) }.boxed()
    }
}

fn start(label: &str) -> TestAction {
    TestAction::Start {
        label: label.to_string(),
    }
}

fn slow(label: &str, delay_ms: u64) -> TestAction {
    TestAction::Slow {
        label: label.to_string(),
        delay_ms,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test(start_paused = true)]
async fn derived_actions_feed_back_into_the_same_stream() {
    let journal = Arc::new(MemoryJournal::new());
    let store = Store::with_journal(TestReducer, TestState::default(), journal.clone());
    let _session = Orchestrator::start(&store, ChainingEpic);

    store.dispatch(start("root"));
    settle().await;

    assert_eq!(journal.action_types(), vec!["start", "middle", "end"]);
    assert_eq!(
        store.state().seen,
        vec!["root", "root→middle", "root→middle→end"]
    );

    let entries = journal.entries();
    assert_eq!(entries[0].origin, "user");
    assert_eq!(entries[1].origin, "chaining");
    assert_eq!(entries[2].payload["label"], "root→middle→end");
}

#[tokio::test(start_paused = true)]
async fn combined_epics_both_react_to_one_action() {
    let journal = Arc::new(MemoryJournal::new());
    let store = Store::with_journal(TestReducer, TestState::default(), journal.clone());
    let epic = combine_epics::<TestAction>(vec![Arc::new(ChainingEpic), Arc::new(FanOutEpic)]);
    let _session = Orchestrator::start(&store, epic);

    store.dispatch(start("root"));
    settle().await;

    // Three from fan-out, one from the chain.
    assert_eq!(store.state().end_count, 4);
    assert_eq!(journal.count("middle"), 1);
    assert_eq!(journal.count("end"), 4);
}

#[tokio::test(start_paused = true)]
async fn superseded_effect_never_dispatches() {
    let journal = Arc::new(MemoryJournal::new());
    let store = Store::with_journal(TestReducer, TestState::default(), journal.clone());
    let _session = Orchestrator::start(&store, LatestEpic);

    store.dispatch(slow("first", 500));
    store.dispatch(slow("second", 10));
    settle().await;

    let done = journal.of_type("done");
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].payload["label"], "second");
}

#[tokio::test(start_paused = true)]
async fn sequential_effects_each_dispatch() {
    let journal = Arc::new(MemoryJournal::new());
    let store = Store::with_journal(TestReducer, TestState::default(), journal.clone());
    let _session = Orchestrator::start(&store, LatestEpic);

    store.dispatch(slow("first", 10));
    settle().await;
    store.dispatch(slow("second", 10));
    settle().await;

    assert_eq!(store.state().seen, vec!["first", "second"]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_subscriptions_and_cancels_effects() {
    let journal = Arc::new(MemoryJournal::new());
    let store = Store::with_journal(TestReducer, TestState::default(), journal.clone());
    let session = Orchestrator::start(&store, combine_epics::<TestAction>(vec![]).with(LatestEpic));
    assert!(store.bus().subscriber_count() > 0);

    store.dispatch(slow("never", 1_000));
    tokio::time::sleep(Duration::from_millis(10)).await;
    session.shutdown();
    settle().await;

    assert_eq!(store.bus().subscriber_count(), 0);
    assert_eq!(journal.count("done"), 0);

    // Dispatch still reduces with no epics attached.
    store.dispatch(start("after"));
    assert_eq!(store.state().seen, vec!["after"]);
}

#[tokio::test(start_paused = true)]
async fn closing_the_store_completes_the_session() {
    let store = Store::new(TestReducer, TestState::default());
    let mut session = Orchestrator::start(&store, ChainingEpic);

    store.dispatch(start("root"));
    settle().await;
    store.close();

    session.closed().await.unwrap();
    assert!(session.is_finished());
    assert_eq!(store.state().end_count, 1);
}

#[tokio::test(start_paused = true)]
async fn failing_epic_surfaces_on_close() {
    let store = Store::new(TestReducer, TestState::default());
    let mut session = Orchestrator::start(&store, FailingEpic);

    let err = session.closed().await.unwrap_err();
    match err {
        EngineError::Epic { epic, source } => {
            assert_eq!(epic, "failing");
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("expected epic failure, got {other:?}"),
    }
}
