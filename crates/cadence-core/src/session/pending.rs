//! Pending persist tracking
//!
//! Computed schedule results stay here, keyed by item id, until storage
//! confirms them. Failed entries remain available for retry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::persist::{PersistAck, PersistFailure, PersistRequest};

/// Where a pending request stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PersistStatus {
    InFlight,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPersist {
    pub request: PersistRequest,
    pub status: PersistStatus,
    /// Dispatches so far, including the first
    pub attempts: u32,
}

/// What an ack did to the pending set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckEffect {
    Confirmed,
    Failed(PersistFailure),
    /// Ack for a request that has since been superseded or dismissed
    Stale,
}

#[derive(Debug, Default)]
pub struct PendingPersists {
    entries: HashMap<String, PendingPersist>,
}

impl PendingPersists {
    /// Track a freshly computed request, superseding any older one for the item
    pub fn track(&mut self, request: PersistRequest) {
        self.entries.insert(
            request.item_id.clone(),
            PendingPersist {
                request,
                status: PersistStatus::InFlight,
                attempts: 1,
            },
        );
    }

    /// Fold an ack into the set
    pub fn apply(&mut self, ack: PersistAck) -> AckEffect {
        let Some(entry) = self.entries.get_mut(&ack.item_id) else {
            return AckEffect::Stale;
        };
        if entry.request.sequence != ack.sequence {
            return AckEffect::Stale;
        }

        match ack.result {
            Ok(()) => {
                self.entries.remove(&ack.item_id);
                AckEffect::Confirmed
            }
            Err(failure) => {
                entry.status = PersistStatus::Failed {
                    message: failure.message.clone(),
                };
                AckEffect::Failed(failure)
            }
        }
    }

    /// Hand back a failed request for re-dispatch, marking it in flight
    pub fn retry(&mut self, item_id: &str) -> Option<PersistRequest> {
        let entry = self.entries.get_mut(item_id)?;
        if !matches!(entry.status, PersistStatus::Failed { .. }) {
            return None;
        }
        entry.status = PersistStatus::InFlight;
        entry.attempts += 1;
        Some(entry.request.clone())
    }

    /// Drop a failed entry; in-flight entries are left alone
    pub fn dismiss(&mut self, item_id: &str) -> bool {
        match self.entries.get(item_id) {
            Some(entry) if matches!(entry.status, PersistStatus::Failed { .. }) => {
                self.entries.remove(item_id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, item_id: &str) -> Option<&PendingPersist> {
        self.entries.get(item_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn in_flight_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.status == PersistStatus::InFlight)
            .count()
    }

    /// Failed entries, ordered by sequence
    pub fn failures(&self) -> Vec<&PendingPersist> {
        let mut failed: Vec<_> = self
            .entries
            .values()
            .filter(|e| matches!(e.status, PersistStatus::Failed { .. }))
            .collect();
        failed.sort_by_key(|e| e.request.sequence);
        failed
    }
}
