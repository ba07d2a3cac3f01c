//! Review Session Module
//!
//! One live review run: the ordered working set of due items, the state
//! machine that presents and judges them, and reconciliation of the
//! fire-and-forget persist calls each judgement produces.

mod coordinator;
mod events;
mod pending;
mod queue;

pub use coordinator::{
    progress_fraction, DueItems, Judgement, SessionCoordinator, SessionError, SessionSnapshot,
    SessionState, SessionSummary,
};
pub use events::SessionEvent;
pub use pending::{AckEffect, PendingPersist, PendingPersists, PersistStatus};
pub use queue::SessionQueue;
