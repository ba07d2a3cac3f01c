//! # Cadence Core
//!
//! Review-session engine for fixed-interval spaced repetition.
//!
//! - **Interval Ladder**: Items climb a fixed ladder of review intervals
//!   (default 1, 3, 7, 14, 30 days). Remembered advances one tier, partial
//!   holds, forgotten resets to the bottom.
//! - **Two or Three Outcomes**: Partial recall is optional per collection.
//! - **Session Coordinator**: Presents due items one at a time, judges them,
//!   requeues or retires them, and tracks progress.
//! - **Fire-and-Forget Persistence**: Judgements update local state at once;
//!   durable writes run in the background and report back as acks.
//! - **SQLite Storage**: Items, schedule state and an append-only review log.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cadence_core::{NewItemInput, Outcome, PersistDispatcher, ReviewConfig, SessionCoordinator, Storage};
//!
//! let storage = Arc::new(Storage::new(None)?);
//! storage.create_item(NewItemInput::new("mitochondria?"), chrono::Utc::now())?;
//!
//! let due = storage.due_items(chrono::Utc::now(), 50)?;
//! let mut session = SessionCoordinator::new(ReviewConfig::default(), due, chrono::Utc::now());
//! let (dispatcher, mut acks) = PersistDispatcher::new(storage.clone());
//!
//! session.present(chrono::Utc::now())?;
//! let judgement = session.judge(Outcome::Remembered, chrono::Utc::now())?;
//! dispatcher.dispatch(judgement.request);
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite from source
//! - `encryption`: SQLCipher encryption keyed by `CADENCE_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod item;
pub mod persist;
pub mod schedule;
pub mod session;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Scheduling
pub use schedule::{
    format_interval, IntervalLadder, Outcome, OutcomeMode, PreviewOption, ScheduleEngine,
    ScheduleError, SchedulePreview, ScheduleUpdate, DEFAULT_LADDER_DAYS, MAX_LADDER_DAYS,
};

// Items
pub use item::{CardRecord, NewItemInput, ReviewableItem};

// Configuration
pub use config::{ConfigError, PartialPolicy, ReviewConfig};

// Persistence
pub use persist::{OutcomeSink, PersistAck, PersistDispatcher, PersistFailure, PersistRequest};

// Sessions
pub use session::{
    progress_fraction, AckEffect, DueItems, Judgement, PendingPersist, PendingPersists,
    PersistStatus, SessionCoordinator, SessionError, SessionEvent, SessionQueue, SessionSnapshot,
    SessionState, SessionSummary,
};

// Storage layer
pub use storage::{Result, ReviewLogEntry, ReviewStats, Storage, StorageError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CardRecord, DueItems, IntervalLadder, NewItemInput, Outcome, OutcomeMode, OutcomeSink,
        PartialPolicy, PersistAck, PersistDispatcher, PersistRequest, ReviewConfig,
        ReviewableItem, ScheduleEngine, SessionCoordinator, SessionError, SessionEvent,
        SessionState, Storage, StorageError,
    };
}
