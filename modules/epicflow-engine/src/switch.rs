//! Switch-to-latest for one effect family.
//!
//! A `Switch` counts trigger actions twice: once synchronously inside
//! publish (under the store's dispatch lock) and once as the owning epic
//! consumes them from its stream. A `Ticket` issued for the n-th trigger is
//! current only while no later trigger has been published, so an effect that
//! resolves after being superseded is dropped at dispatch time even if the
//! epic has not caught up yet. Each ticket also carries a `CancellationToken`
//! that the next `advance` cancels, which stops the superseded effect at its
//! next await point.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::bus::ActionStream;
use crate::epic::Emitter;
use crate::traits::ActionLike;

pub struct Switch {
    published: Arc<AtomicU64>,
    observed: u64,
    current: Option<CancellationToken>,
    parent: CancellationToken,
    family: &'static str,
}

impl Switch {
    /// Attach a switch to `actions`, counting every action whose discriminant
    /// is in `triggers`. Call `advance` (or `interrupt`) exactly once for each
    /// trigger the returned stream yields.
    pub fn attach<A: ActionLike>(
        actions: ActionStream<A>,
        family: &'static str,
        triggers: &'static [&'static str],
        out: &Emitter<A>,
    ) -> (ActionStream<A>, Self) {
        let published = Arc::new(AtomicU64::new(0));
        let counter = published.clone();
        let actions = actions.with_hook(move |action: &A| {
            if triggers.contains(&action.action_type()) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let switch = Self {
            published,
            observed: 0,
            current: None,
            parent: out.shutdown_token().clone(),
            family,
        };
        (actions, switch)
    }

    /// Supersede the running effect, if any, and issue a ticket for the next one.
    pub fn advance(&mut self) -> Ticket {
        if let Some(previous) = self.current.take() {
            if !previous.is_cancelled() {
                tracing::debug!(family = self.family, "switching away from in-flight effect");
            }
            previous.cancel();
        }
        self.observed += 1;
        let token = self.parent.child_token();
        self.current = Some(token.clone());
        Ticket {
            generation: self.observed,
            published: self.published.clone(),
            token,
        }
    }

    /// Supersede the running effect without starting another.
    pub fn interrupt(&mut self) {
        self.advance().token.cancel();
    }
}

impl Drop for Switch {
    fn drop(&mut self) {
        if let Some(current) = self.current.take() {
            current.cancel();
        }
    }
}

/// Permission for one effect to emit, valid until its trigger is superseded.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    published: Arc<AtomicU64>,
    token: CancellationToken,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while no newer trigger has been published and the effect has not
    /// been cancelled.
    pub fn is_current(&self) -> bool {
        !self.token.is_cancelled() && self.published.load(Ordering::SeqCst) == self.generation
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Race `fut` against cancellation. Cancellation wins ties; `None` means the
    /// future was dropped before completing.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Cancellable delay. Returns `false` if cancelled before it elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        self.run(tokio::time::sleep(duration)).await.is_some()
    }
}
