//! Action orchestration engine.
//!
//! Provides a generic action loop: dispatch → reduce → publish → epics →
//! dispatch. Actions fan out to every subscriber in dispatch order; epics turn
//! the stream into derived actions by running effects, and the session feeds
//! those back through the same store.
//!
//! Consumers define their domain by implementing `Reducer` (pure state
//! transitions) and `Epic` (effectful handlers that emit new actions).

pub mod bus;
pub mod epic;
pub mod error;
pub mod journal;
pub mod session;
pub mod store;
pub mod switch;
pub mod traits;

pub use bus::{ActionBus, ActionStream, Subscription};
pub use epic::{combine_epics, CombinedEpic, Emitted, Emitter, Epic};
pub use error::EngineError;
pub use journal::{ActionJournal, JournalEntry, MemoryJournal};
pub use session::{Orchestrator, Session};
pub use store::{Store, USER_ORIGIN};
pub use switch::{Switch, Ticket};
pub use traits::{ActionLike, Reducer};
