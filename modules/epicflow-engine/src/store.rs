//! The dispatch path.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use crate::bus::{lock, ActionBus, ActionStream};
use crate::epic::Emitted;
use crate::journal::{ActionJournal, JournalEntry};
use crate::switch::Ticket;
use crate::traits::{ActionLike, Reducer};

/// Origin label for actions dispatched from outside any epic.
pub const USER_ORIGIN: &str = "user";

/// Holds the current state snapshot and the action bus.
///
/// Dispatch → reduce → record → publish, all under one lock, so every
/// subscriber observes actions in the order the reducer applied them.
/// Cheap to clone; clones share everything.
pub struct Store<A, S> {
    inner: Arc<StoreInner<A, S>>,
}

struct StoreInner<A, S> {
    reducer: Box<dyn Reducer<A, S>>,
    bus: ActionBus<A>,
    state: watch::Sender<Arc<S>>,
    journal: Option<Box<dyn ActionJournal>>,
    /// Guards reducer application + publish. Holds the last sequence number.
    dispatch: Mutex<u64>,
}

impl<A, S> Clone for Store<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A, S> Store<A, S>
where
    A: ActionLike,
    S: Send + Sync + 'static,
{
    pub fn new<R: Reducer<A, S>>(reducer: R, initial: S) -> Self {
        Self::build(Box::new(reducer), initial, None)
    }

    /// Like `new`, recording every dispatch in `journal`.
    pub fn with_journal<R, J>(reducer: R, initial: S, journal: J) -> Self
    where
        R: Reducer<A, S>,
        J: ActionJournal + 'static,
    {
        Self::build(Box::new(reducer), initial, Some(Box::new(journal)))
    }

    fn build(
        reducer: Box<dyn Reducer<A, S>>,
        initial: S,
        journal: Option<Box<dyn ActionJournal>>,
    ) -> Self {
        let (state, _) = watch::channel(Arc::new(initial));
        Self {
            inner: Arc::new(StoreInner {
                reducer,
                bus: ActionBus::new(),
                state,
                journal,
                dispatch: Mutex::new(0),
            }),
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> Arc<S> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state replacement.
    pub fn watch(&self) -> watch::Receiver<Arc<S>> {
        self.inner.state.subscribe()
    }

    pub fn bus(&self) -> &ActionBus<A> {
        &self.inner.bus
    }

    pub fn subscribe(&self) -> ActionStream<A> {
        self.inner.bus.subscribe()
    }

    /// Apply `action` to the state and publish it to every subscriber before
    /// returning. Never suspends.
    pub fn dispatch(&self, action: A) {
        self.apply(action, USER_ORIGIN, None);
    }

    /// Dispatch an epic's output. Returns `false` if it was dropped because
    /// its trigger was superseded.
    pub fn dispatch_emitted(&self, emitted: Emitted<A>) -> bool {
        self.apply(emitted.action, emitted.origin, emitted.ticket.as_ref())
    }

    /// Drop every bus subscriber. Epic streams end once drained.
    pub fn close(&self) {
        self.inner.bus.close();
    }

    fn apply(&self, action: A, origin: &str, ticket: Option<&Ticket>) -> bool {
        let mut seq = lock(&self.inner.dispatch);

        if let Some(ticket) = ticket {
            if !ticket.is_current() {
                debug!(
                    origin,
                    action = action.action_type(),
                    "dropping action from superseded effect"
                );
                return false;
            }
        }

        let next = {
            let current = self.inner.state.borrow();
            self.inner.reducer.reduce(&current, &action)
        };
        self.inner.state.send_replace(Arc::new(next));

        *seq += 1;
        if let Some(journal) = &self.inner.journal {
            journal.record(JournalEntry {
                seq: *seq,
                ts: Utc::now(),
                action_type: action.action_type().to_string(),
                origin: origin.to_string(),
                payload: action.to_payload(),
            });
        }
        debug!(seq = *seq, action = action.action_type(), origin, "dispatched");

        self.inner.bus.publish(&action);
        true
    }
}
