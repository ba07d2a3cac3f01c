//! Session working set

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::item::ReviewableItem;

/// Ordered due items for one review run
///
/// The front item is the one being shown. An id appears at most once, and
/// `len() + completed_count()` only grows through [`push_back`](Self::push_back).
#[derive(Debug, Clone, Default)]
pub struct SessionQueue {
    items: VecDeque<ReviewableItem>,
    completed_count: usize,
    card_started_at: Option<DateTime<Utc>>,
}

impl SessionQueue {
    /// Build from a due-items seed, dropping repeated ids
    ///
    /// Returns the queue and the ids that were dropped.
    pub fn from_seed(seed: Vec<ReviewableItem>) -> (Self, Vec<String>) {
        let mut queue = Self::default();
        let mut dropped = Vec::new();
        for item in seed {
            let id = item.id.clone();
            if !queue.push_back(item) {
                dropped.push(id);
            }
        }
        (queue, dropped)
    }

    pub fn front(&self) -> Option<&ReviewableItem> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    /// Remaining plus completed
    pub fn total(&self) -> usize {
        self.items.len() + self.completed_count
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn items(&self) -> impl Iterator<Item = &ReviewableItem> {
        self.items.iter()
    }

    pub fn card_started_at(&self) -> Option<DateTime<Utc>> {
        self.card_started_at
    }

    pub fn stamp(&mut self, now: DateTime<Utc>) {
        self.card_started_at = Some(now);
    }

    pub fn clear_stamp(&mut self) {
        self.card_started_at = None;
    }

    /// Append an item unless its id is already queued
    pub fn push_back(&mut self, item: ReviewableItem) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        self.items.push_back(item);
        true
    }

    pub(crate) fn front_mut(&mut self) -> Option<&mut ReviewableItem> {
        self.items.front_mut()
    }

    /// Remove the front item and count it as completed
    pub fn retire_front(&mut self) -> Option<ReviewableItem> {
        let item = self.items.pop_front()?;
        self.completed_count += 1;
        Some(item)
    }

    /// Move the front item to the back
    ///
    /// With a single item this leaves the queue unchanged.
    pub fn requeue_front(&mut self) {
        if let Some(item) = self.items.pop_front() {
            self.items.push_back(item);
        }
    }
}
