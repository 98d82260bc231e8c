//! Orchestrator: wires a store to an epic for the lifetime of a session.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::epic::{Emitted, Emitter, Epic};
use crate::error::{EngineError, EngineResult};
use crate::store::Store;
use crate::traits::ActionLike;

/// Starts sessions.
///
/// A session subscribes the epic to the store's bus, runs it, and pumps
/// every action the epic emits back into `Store::dispatch` in emission
/// order. Derived actions are therefore visible to all epics, including the
/// one that produced them.
pub struct Orchestrator;

impl Orchestrator {
    /// Wire `epic` onto `store` and start running it. Must be called inside a
    /// Tokio runtime. Actions dispatched after this returns reach the epic.
    pub fn start<A, S, E>(store: &Store<A, S>, epic: E) -> Session
    where
        A: ActionLike,
        S: Send + Sync + 'static,
        E: Epic<A>,
    {
        let id = Uuid::new_v4();
        let epic_name = epic.name();
        let shutdown = CancellationToken::new();
        let span = info_span!("session", session_id = %id, epic = epic_name);

        let (out, rx) = Emitter::channel(epic_name);
        let out = out.with_shutdown(shutdown.clone());

        // Subscriptions are taken here, synchronously.
        let run = epic.wire(store.subscribe(), out);

        let epic_task = tokio::spawn(run.instrument(span.clone()));
        let pump = tokio::spawn(pump_emitted(store.clone(), rx).instrument(span.clone()));

        span.in_scope(|| info!("session started"));

        Session {
            id,
            epic: epic_name,
            shutdown,
            epic_task: Some(epic_task),
            pump: Some(pump),
        }
    }
}

async fn pump_emitted<A, S>(store: Store<A, S>, mut rx: mpsc::UnboundedReceiver<Emitted<A>>)
where
    A: ActionLike,
    S: Send + Sync + 'static,
{
    while let Some(emitted) = rx.recv().await {
        store.dispatch_emitted(emitted);
    }
}

/// A running orchestration. Dropping it shuts the session down.
pub struct Session {
    id: Uuid,
    epic: &'static str,
    shutdown: CancellationToken,
    epic_task: Option<JoinHandle<anyhow::Result<()>>>,
    pump: Option<JoinHandle<()>>,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn epic(&self) -> &'static str {
        self.epic
    }

    pub fn is_finished(&self) -> bool {
        self.epic_task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the epic to complete (its streams end when the store is
    /// closed), then for every action it emitted to be dispatched.
    pub async fn closed(&mut self) -> EngineResult<()> {
        let result = match self.epic_task.take() {
            Some(task) => match task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(source)) => Err(EngineError::Epic {
                    epic: self.epic,
                    source,
                }),
                Err(join) => Err(EngineError::Join {
                    epic: self.epic,
                    message: join.to_string(),
                }),
            },
            None => Ok(()),
        };

        if result.is_err() {
            // Effects spawned by the epic still hold emitters.
            self.shutdown.cancel();
        }
        if let Some(pump) = self.pump.take() {
            if let Err(join) = pump.await {
                warn!(session_id = %self.id, error = %join, "pump task did not complete");
            }
        }
        result
    }

    /// Cancel every in-flight effect and stop the session's tasks.
    /// Bus subscriptions held by the epic are released as its future drops.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.cancel();
        let running = self.epic_task.is_some() || self.pump.is_some();
        if let Some(task) = self.epic_task.take() {
            task.abort();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if running {
            info!(session_id = %self.id, epic = self.epic, "session stopped");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("epic", &self.epic)
            .field("finished", &self.is_finished())
            .finish()
    }
}
