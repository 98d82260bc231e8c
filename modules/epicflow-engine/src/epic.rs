//! Epics and the combinator that merges them.

use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::bus::ActionStream;
use crate::switch::Ticket;
use crate::traits::ActionLike;

/// Effectful handler over the action stream.
///
/// `wire` receives a subscription to the store's bus and an emitter for
/// derived actions, and returns the future that does the work. Every extra
/// subscription an epic needs (forks, switches) must be taken inside `wire`
/// itself, before returning, so no action dispatched after wiring is missed.
///
/// Epics hold no mutable state of their own. Anything remembered across
/// actions is folded from the stream inside the returned future.
pub trait Epic<A: ActionLike>: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn wire(
        &self,
        actions: ActionStream<A>,
        out: Emitter<A>,
    ) -> BoxFuture<'static, anyhow::Result<()>>;
}

impl<A: ActionLike, E: Epic<A> + ?Sized> Epic<A> for Arc<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn wire(
        &self,
        actions: ActionStream<A>,
        out: Emitter<A>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        (**self).wire(actions, out)
    }
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// An action queued by an epic, waiting for the session pump to dispatch it.
#[derive(Debug)]
pub struct Emitted<A> {
    pub action: A,
    pub origin: &'static str,
    /// Present when the action must be dropped if its trigger was superseded.
    pub ticket: Option<Ticket>,
}

/// Output handle for one epic. Clones share the same session queue.
pub struct Emitter<A> {
    tx: mpsc::UnboundedSender<Emitted<A>>,
    origin: &'static str,
    shutdown: CancellationToken,
}

impl<A> Clone for Emitter<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            origin: self.origin,
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<A: ActionLike> Emitter<A> {
    /// A standalone emitter with its own queue. Sessions build theirs this
    /// way; tests use it to drive a single epic without a store.
    pub fn channel(origin: &'static str) -> (Self, mpsc::UnboundedReceiver<Emitted<A>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = Self {
            tx,
            origin,
            shutdown: CancellationToken::new(),
        };
        (emitter, rx)
    }

    pub(crate) fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Same queue, different origin label.
    pub fn named(&self, origin: &'static str) -> Self {
        Self {
            tx: self.tx.clone(),
            origin,
            shutdown: self.shutdown.clone(),
        }
    }

    /// Cancelled when the owning session shuts down.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Queue `action` for dispatch. Returns `false` once the session is gone.
    pub fn emit(&self, action: A) -> bool {
        self.send(action, None)
    }

    /// Queue `action` on behalf of the effect holding `ticket`. The action is
    /// discarded, now or at dispatch time, if the ticket has been superseded.
    pub fn emit_current(&self, ticket: &Ticket, action: A) -> bool {
        if !ticket.is_current() {
            tracing::debug!(
                origin = self.origin,
                action = action.action_type(),
                generation = ticket.generation(),
                "discarding action from superseded effect"
            );
            return false;
        }
        self.send(action, Some(ticket.clone()))
    }

    fn send(&self, action: A, ticket: Option<Ticket>) -> bool {
        self.tx
            .send(Emitted {
                action,
                origin: self.origin,
                ticket,
            })
            .is_ok()
    }
}

// ---------------------------------------------------------------------------
// combine_epics
// ---------------------------------------------------------------------------

/// Fan-out/fan-in of several epics over one upstream.
///
/// Each child gets its own fork of the upstream and a clone of the shared
/// emitter labelled with the child's name. Outputs interleave in emission
/// order; nothing is deduplicated.
pub struct CombinedEpic<A> {
    name: &'static str,
    epics: Vec<Arc<dyn Epic<A>>>,
}

pub fn combine_epics<A: ActionLike>(epics: Vec<Arc<dyn Epic<A>>>) -> CombinedEpic<A> {
    CombinedEpic {
        name: "combined",
        epics,
    }
}

impl<A: ActionLike> CombinedEpic<A> {
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with(mut self, epic: impl Epic<A>) -> Self {
        self.epics.push(Arc::new(epic));
        self
    }

    pub fn len(&self) -> usize {
        self.epics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epics.is_empty()
    }
}

impl<A: ActionLike> Epic<A> for CombinedEpic<A> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn wire(
        &self,
        actions: ActionStream<A>,
        out: Emitter<A>,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        let runs: Vec<_> = self
            .epics
            .iter()
            .map(|epic| {
                let name = epic.name();
                let run = epic.wire(actions.fork(), out.named(name));
                async move {
                    run.await.map_err(|e| e.context(format!("epic `{name}` failed")))
                }
            })
            .collect();
        // Children hold their own forks; the combined upstream is not read.
        drop(actions);

        async move {
            future::try_join_all(runs).await?;
            Ok(())
        }
        .boxed()
    }
}
