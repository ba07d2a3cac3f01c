//! Scripted outcome sinks
//!
//! Stand-ins for the persistence collaborator: one that records, one that
//! fails on demand, and one that delays per item so acks arrive out of order.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use cadence_core::{OutcomeSink, PersistFailure, PersistRequest};

/// Accepts everything, remembering each request
#[derive(Default)]
pub struct RecordingSink {
    saved: Mutex<Vec<PersistRequest>>,
}

impl RecordingSink {
    pub fn saved(&self) -> Vec<PersistRequest> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl OutcomeSink for RecordingSink {
    async fn persist(&self, request: PersistRequest) -> Result<(), PersistFailure> {
        if let Ok(mut saved) = self.saved.lock() {
            saved.push(request);
        }
        Ok(())
    }
}

/// Fails for selected items until healed
#[derive(Default)]
pub struct FailingSink {
    failing: Mutex<HashSet<String>>,
    inner: RecordingSink,
}

impl FailingSink {
    pub fn failing_for(ids: &[&str]) -> Self {
        Self {
            failing: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
            inner: RecordingSink::default(),
        }
    }

    /// Let every item through from now on
    pub fn heal(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }

    pub fn saved(&self) -> Vec<PersistRequest> {
        self.inner.saved()
    }
}

impl OutcomeSink for FailingSink {
    async fn persist(&self, request: PersistRequest) -> Result<(), PersistFailure> {
        let fails = self
            .failing
            .lock()
            .map(|f| f.contains(&request.item_id))
            .unwrap_or(false);
        if fails {
            return Err(PersistFailure::new(request.item_id, "connection reset"));
        }
        self.inner.persist(request).await
    }
}

/// Sleeps a per-item delay before accepting
#[derive(Default)]
pub struct SlowSink {
    delays: HashMap<String, Duration>,
    inner: RecordingSink,
}

impl SlowSink {
    pub fn with_delays(delays: &[(&str, u64)]) -> Self {
        Self {
            delays: delays
                .iter()
                .map(|(id, ms)| (id.to_string(), Duration::from_millis(*ms)))
                .collect(),
            inner: RecordingSink::default(),
        }
    }

    /// Item ids in the order their writes completed
    pub fn completion_order(&self) -> Vec<String> {
        self.inner.saved().into_iter().map(|r| r.item_id).collect()
    }
}

impl OutcomeSink for SlowSink {
    async fn persist(&self, request: PersistRequest) -> Result<(), PersistFailure> {
        if let Some(delay) = self.delays.get(&request.item_id) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.persist(request).await
    }
}
