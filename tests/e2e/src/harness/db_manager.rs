//! Test Database Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - Pre-seeded databases with cards at known ladder positions
//! - Reopening the same file to check durability

use std::path::PathBuf;
use std::sync::Arc;

use cadence_core::{NewItemInput, Outcome, PersistRequest, Storage};
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Storage is held in an `Arc` so it can be handed to a persist dispatcher.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
/// let ids = db.seed_cards(5, now);
/// let due = db.storage.due_items(now, 10)?;
/// ```
pub struct TestDatabaseManager {
    /// The storage instance
    pub storage: Arc<Storage>,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: TempDir,
    /// Path to the database file
    db_path: PathBuf,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_cadence.db");

        let storage = Storage::new(Some(db_path.clone())).expect("Failed to create test storage");

        Self {
            storage: Arc::new(storage),
            _temp_dir: temp_dir,
            db_path,
        }
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Open a second storage handle on the same file
    pub fn reopen(&self) -> Storage {
        Storage::new(Some(self.db_path.clone())).expect("Failed to reopen test storage")
    }

    /// Number of cards in the database
    pub fn item_count(&self) -> i64 {
        self.storage
            .stats(Utc::now())
            .map(|s| s.total_items)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    // ========================================================================
    // SEEDING METHODS
    // ========================================================================

    /// Seed `count` cards, each due at `now`; one second apart in creation
    /// so due order is deterministic
    pub fn seed_cards(&self, count: usize, now: DateTime<Utc>) -> Vec<String> {
        (0..count)
            .map(|i| {
                let created = now - Duration::seconds((count - i) as i64);
                self.storage
                    .create_item(NewItemInput::new(format!("Card {}", i)), created)
                    .expect("Failed to seed card")
                    .item
                    .id
            })
            .collect()
    }

    /// Seed one due card already sitting at `tier`
    pub fn seed_at_tier(&self, tier: u32, now: DateTime<Utc>) -> String {
        let id = self
            .storage
            .create_item(NewItemInput::new(format!("Tier {} card", tier)), now)
            .expect("Failed to seed card")
            .item
            .id;
        if tier > 0 {
            let request = PersistRequest {
                item_id: id.clone(),
                new_tier: tier,
                next_review_at: now,
                outcome: Outcome::Remembered,
                elapsed_seconds: 0,
                sequence: 0,
            };
            self.storage
                .record_outcome(&request, now)
                .expect("Failed to place card on tier");
        }
        id
    }

    /// Seed cards that are not yet due
    pub fn seed_future(&self, count: usize, offset_days: u32, now: DateTime<Utc>) -> Vec<String> {
        (0..count)
            .map(|i| {
                let input = NewItemInput {
                    initial_offset_days: offset_days,
                    ..NewItemInput::new(format!("Future card {}", i))
                };
                self.storage
                    .create_item(input, now)
                    .expect("Failed to seed card")
                    .item
                    .id
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_database_starts_empty() {
        let db = TestDatabaseManager::new_temp();
        assert!(db.is_empty());
        assert!(db.path().exists());
    }

    #[test]
    fn test_seed_cards_due_in_order() {
        let db = TestDatabaseManager::new_temp();
        let now = Utc::now();
        let ids = db.seed_cards(3, now);
        let due = db.storage.due_items(now, 10).unwrap();
        let due_ids: Vec<_> = due.items.into_iter().map(|i| i.id).collect();
        assert_eq!(due_ids, ids);
    }

    #[test]
    fn test_seed_at_tier() {
        let db = TestDatabaseManager::new_temp();
        let now = Utc::now();
        let id = db.seed_at_tier(2, now);
        let item = db.storage.get_item(&id).unwrap().unwrap();
        assert_eq!(item.current_tier, 2);
        assert!(item.is_due(now));
    }

    #[test]
    fn test_seed_future_not_due() {
        let db = TestDatabaseManager::new_temp();
        let now = Utc::now();
        db.seed_future(2, 3, now);
        assert_eq!(db.item_count(), 2);
        assert_eq!(db.storage.due_items(now, 10).unwrap().total, 0);
    }
}
