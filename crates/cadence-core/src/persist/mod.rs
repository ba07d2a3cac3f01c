//! Persist Dispatch
//!
//! The asynchronous boundary between a live review session and wherever
//! review results are stored.
//!
//! A session computes a [`PersistRequest`] per judged card and never waits
//! for it. [`PersistDispatcher`] spawns one task per request against an
//! [`OutcomeSink`] and reports each [`PersistAck`] on a channel; the session
//! drains acks whenever convenient. Acks may arrive in any order, so they
//! carry the item id and the request sequence number.
//!
//! Writes for different items run concurrently. Writes for the same item
//! run one after another in dispatch order, so a requeued card's later
//! judgement is never overwritten by an earlier one still in flight.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::schedule::Outcome;

// ============================================================================
// REQUEST / RESULT TYPES
// ============================================================================

/// Everything needed to persist one judged card
///
/// The schedule result is stored, not just the outcome, so a retry never
/// recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistRequest {
    pub item_id: String,
    pub new_tier: u32,
    pub next_review_at: DateTime<Utc>,
    pub outcome: Outcome,
    pub elapsed_seconds: i64,
    /// Monotonic per session; distinguishes repeat judgements of one item
    pub sequence: u64,
}

/// A persist call that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("Failed to persist review of {item_id}: {message}")]
pub struct PersistFailure {
    pub item_id: String,
    pub message: String,
}

impl PersistFailure {
    pub fn new(item_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            item_id: item_id.into(),
            message: message.to_string(),
        }
    }
}

/// Completion report for one dispatched request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistAck {
    pub item_id: String,
    pub sequence: u64,
    pub result: Result<(), PersistFailure>,
}

impl PersistAck {
    pub fn confirmed(request: &PersistRequest) -> Self {
        Self {
            item_id: request.item_id.clone(),
            sequence: request.sequence,
            result: Ok(()),
        }
    }

    pub fn failed(request: &PersistRequest, message: impl std::fmt::Display) -> Self {
        Self {
            item_id: request.item_id.clone(),
            sequence: request.sequence,
            result: Err(PersistFailure::new(request.item_id.clone(), message)),
        }
    }
}

// ============================================================================
// SINK
// ============================================================================

/// Destination for review results
///
/// Implementations own their transport, including timeouts. Storage is
/// last-write-wins: a sink overwrites whatever schedule it finds.
pub trait OutcomeSink: Send + Sync + 'static {
    fn persist(
        &self,
        request: PersistRequest,
    ) -> impl Future<Output = Result<(), PersistFailure>> + Send;
}

// ============================================================================
// DISPATCHER
// ============================================================================

/// Last write dispatched per item: its ticket and a receiver that resolves
/// once that write has finished
type ItemTails = HashMap<String, (u64, oneshot::Receiver<()>)>;

/// Fire-and-forget dispatch of persist requests
///
/// Must be used from within a tokio runtime.
pub struct PersistDispatcher<S: OutcomeSink> {
    sink: Arc<S>,
    acks: mpsc::UnboundedSender<PersistAck>,
    tails: Arc<Mutex<ItemTails>>,
    next_ticket: Arc<AtomicU64>,
}

impl<S: OutcomeSink> Clone for PersistDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            acks: self.acks.clone(),
            tails: Arc::clone(&self.tails),
            next_ticket: Arc::clone(&self.next_ticket),
        }
    }
}

impl<S: OutcomeSink> PersistDispatcher<S> {
    /// Create a dispatcher and the receiver its acks arrive on
    pub fn new(sink: Arc<S>) -> (Self, mpsc::UnboundedReceiver<PersistAck>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                sink,
                acks: tx,
                tails: Arc::new(Mutex::new(HashMap::new())),
                next_ticket: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Number of items with a write still in flight
    pub fn busy_items(&self) -> usize {
        self.tails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Spawn the persist call; the returned handle may be ignored
    ///
    /// The call starts once every earlier write for the same item has
    /// finished, successfully or not.
    pub fn dispatch(&self, request: PersistRequest) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let acks = self.acks.clone();
        let tails = Arc::clone(&self.tails);

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        // Queue behind the item's previous write before the task exists
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let previous = tails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request.item_id.clone(), (ticket, done_rx))
            .map(|(_, rx)| rx);

        tokio::spawn(async move {
            let item_id = request.item_id.clone();
            let sequence = request.sequence;

            if let Some(previous) = previous {
                tracing::debug!(item_id = %item_id, sequence, "Waiting for earlier write");
                // Resolves with an error when the earlier task drops its sender
                let _ = previous.await;
            }

            let result = sink.persist(request).await;

            {
                let mut tails = tails.lock().unwrap_or_else(PoisonError::into_inner);
                if tails.get(&item_id).is_some_and(|(t, _)| *t == ticket) {
                    tails.remove(&item_id);
                }
            }

            if let Err(e) = &result {
                tracing::warn!(item_id = %item_id, sequence, "Persist failed: {}", e.message);
            } else {
                tracing::debug!(item_id = %item_id, sequence, "Persist confirmed");
            }

            // Receiver gone means the session was abandoned; nothing to report to
            let _ = acks.send(PersistAck {
                item_id,
                sequence,
                result,
            });
            drop(done_tx);
        })
    }
}
