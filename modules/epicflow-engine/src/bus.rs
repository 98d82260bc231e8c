//! The action bus: an ordered, multi-subscriber broadcast of actions.
//!
//! Subscribers are synchronous callbacks invoked in registration order on
//! every publish. `ActionStream` adapts one subscription into an async
//! `Stream` backed by an unbounded channel, so nothing published after the
//! subscription is taken is ever dropped or reordered.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures::future;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::traits::ActionLike;

type Callback<A> = Box<dyn Fn(&A) + Send + Sync>;

struct Registry<A> {
    next_id: u64,
    subscribers: Vec<(u64, Callback<A>)>,
}

/// Removal hook held by `Subscription`, erased over the action type.
trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64);
}

impl<A: 'static> Unsubscribe for Mutex<Registry<A>> {
    fn unsubscribe(&self, id: u64) {
        lock(self).subscribers.retain(|(sid, _)| *sid != id);
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Broadcast channel of actions. Cheap to clone; clones share subscribers.
pub struct ActionBus<A> {
    registry: Arc<Mutex<Registry<A>>>,
}

impl<A> Clone for ActionBus<A> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<A: ActionLike> Default for ActionBus<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ActionLike> ActionBus<A> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 1,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Register a callback. It runs synchronously inside `publish`, so it must
    /// not block and must not publish on this bus.
    pub fn subscribe_fn<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push((id, Box::new(callback)));
        drop(registry);
        self.guard(id)
    }

    /// Open a stream receiving every action published from now on.
    pub fn subscribe(&self) -> ActionStream<A> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe_fn(move |action: &A| {
            let _ = tx.send(action.clone());
        });
        ActionStream {
            bus: self.clone(),
            rx,
            pending: VecDeque::new(),
            subscription,
        }
    }

    /// Deliver `action` to every subscriber, in registration order.
    pub fn publish(&self, action: &A) {
        let registry = lock(&self.registry);
        for (_, callback) in registry.subscribers.iter() {
            callback(action);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }

    /// Drop every subscriber. Open streams end once drained.
    pub fn close(&self) {
        let drained = std::mem::take(&mut lock(&self.registry).subscribers);
        drop(drained);
    }

    /// Swap the callback behind `old` in place, keeping its position in the
    /// delivery order. No publish can observe both callbacks or neither.
    fn replace<F>(&self, mut old: Subscription, callback: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        let slot = registry
            .subscribers
            .iter()
            .position(|(sid, _)| *sid == old.id);
        match slot {
            Some(idx) => registry.subscribers[idx] = (id, Box::new(callback)),
            None => registry.subscribers.push((id, Box::new(callback))),
        }
        drop(registry);
        old.registry = None;
        self.guard(id)
    }

    fn guard(&self, id: u64) -> Subscription {
        let registry: Arc<dyn Unsubscribe> = self.registry.clone();
        Subscription {
            id,
            registry: Some(Arc::downgrade(&registry)),
        }
    }
}

/// Scoped subscription. Dropping it removes the subscriber from the bus.
pub struct Subscription {
    id: u64,
    registry: Option<Weak<dyn Unsubscribe>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.unsubscribe(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// One subscription on an `ActionBus`, consumed as an async stream.
///
/// The stream ends only when the bus is closed.
pub struct ActionStream<A> {
    bus: ActionBus<A>,
    rx: mpsc::UnboundedReceiver<A>,
    pending: VecDeque<A>,
    subscription: Subscription,
}

impl<A: ActionLike> ActionStream<A> {
    /// Open an independent subscription on the same bus. It sees actions
    /// published after this call, not what this stream has buffered.
    pub fn fork(&self) -> Self {
        self.bus.subscribe()
    }

    /// Run `hook` synchronously inside publish for every action this stream
    /// receives, before the stream itself sees it. Actions already buffered
    /// are passed through the hook immediately, so the hook observes exactly
    /// the actions this stream will yield.
    pub fn with_hook<H>(self, hook: H) -> Self
    where
        H: Fn(&A) + Send + Sync + 'static,
    {
        let ActionStream {
            bus,
            mut rx,
            mut pending,
            subscription,
        } = self;

        let hook = Arc::new(hook);
        let (tx, new_rx) = mpsc::unbounded_channel();
        let subscription = {
            let hook = hook.clone();
            bus.replace(subscription, move |action: &A| {
                (*hook)(action);
                let _ = tx.send(action.clone());
            })
        };

        // Everything left in the old channel was published before the swap.
        while let Ok(action) = rx.try_recv() {
            pending.push_back(action);
        }
        for action in pending.iter() {
            (*hook)(action);
        }

        ActionStream {
            bus,
            rx: new_rx,
            pending,
            subscription,
        }
    }

    /// Keep only actions whose discriminant equals `tag`. Payloads pass through untouched.
    pub fn of_type(self, tag: &'static str) -> impl Stream<Item = A> + Send + Unpin {
        self.filter(move |action| future::ready(action.action_type() == tag))
    }

    /// Keep only actions `project` accepts, narrowed to the projected shape.
    pub fn select<T, F>(self, project: F) -> impl Stream<Item = T> + Send + Unpin
    where
        T: Send + 'static,
        F: Fn(A) -> Option<T> + Send + 'static,
    {
        self.filter_map(move |action| future::ready(project(action)))
    }
}

// Nothing in the stream is structurally pinned.
impl<A> Unpin for ActionStream<A> {}

impl<A> Stream for ActionStream<A> {
    type Item = A;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<A>> {
        let this = self.get_mut();
        if let Some(action) = this.pending.pop_front() {
            return Poll::Ready(Some(action));
        }
        this.rx.poll_recv(cx)
    }
}
