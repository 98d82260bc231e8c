//! Core traits for the orchestration engine.

/// Actions carry a discriminant and know how to render themselves for the journal.
///
/// Actions are values: cloned on every fan-out, never mutated after creation.
pub trait ActionLike: Clone + Send + Sync + 'static {
    /// The discriminant matched by `of_type` and by switch triggers.
    fn action_type(&self) -> &'static str;

    /// Serialize this action for the journal and for structured logs.
    fn to_payload(&self) -> serde_json::Value;
}

/// Pure state transitions. No I/O, no side effects.
///
/// Called for every dispatched action before any epic observes it. Must be
/// total: actions a reducer has no interest in return an equal state.
/// Every call produces a whole new snapshot; the store swaps it in atomically.
pub trait Reducer<A: ActionLike, S>: Send + Sync + 'static {
    fn reduce(&self, state: &S, action: &A) -> S;
}
