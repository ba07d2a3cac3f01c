//! SQLite Storage Implementation
//!
//! Durable home of reviewable items and their review history. Serves the
//! due-items query that seeds a session and receives persist requests as an
//! [`OutcomeSink`].

use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

use crate::item::{CardRecord, NewItemInput, ReviewableItem};
use crate::persist::{OutcomeSink, PersistFailure, PersistRequest};
use crate::schedule::Outcome;
use crate::session::DueItems;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// One persisted judgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLogEntry {
    pub item_id: String,
    pub outcome: Outcome,
    pub new_tier: u32,
    pub next_review_at: DateTime<Utc>,
    pub reviewed_at: DateTime<Utc>,
    pub elapsed_seconds: i64,
    pub sequence: u64,
}

/// Collection-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_items: i64,
    pub due_items: i64,
    pub never_reviewed: i64,
    /// `(tier, item count)`, ascending by tier
    pub tier_counts: Vec<(u32, i64)>,
    pub reviews_today: i64,
    pub remembered_today: i64,
    pub partial_today: i64,
    pub forgotten_today: i64,
}

/// Largest instant with a four-digit year (9999-12-31T23:59:59.999999999Z)
const MAX_STORED_SECS: i64 = 253_402_300_799;
/// Smallest instant with a four-digit year (0000-01-01T00:00:00Z)
const MIN_STORED_SECS: i64 = -62_167_219_200;

/// Clamp to the range RFC 3339 can express
///
/// Years outside 0000..=9999 render with a sign, which neither parses back
/// nor sorts as text.
fn clamp_storable(dt: DateTime<Utc>) -> DateTime<Utc> {
    let max = DateTime::from_timestamp(MAX_STORED_SECS, 999_999_999).unwrap_or(dt);
    let min = DateTime::from_timestamp(MIN_STORED_SECS, 0).unwrap_or(dt);
    dt.clamp(min, max)
}

/// Fixed-width UTC timestamps so text comparison matches time order
fn ts(dt: DateTime<Utc>) -> String {
    clamp_storable(dt).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

// ============================================================================
// STORAGE
// ============================================================================

/// SQLite-backed item store
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, making Storage `Send + Sync` so a dispatcher
/// can share it as `Arc<Storage>`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("CADENCE_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA temp_store = MEMORY;",
        )?;

        Ok(())
    }

    /// Default database location in the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "cadence", "cadence").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(data_dir, perms);
        }
        Ok(data_dir.join("cadence.db"))
    }

    /// Create new storage instance
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_path()?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        tracing::debug!(path = %path.display(), "Storage opened");

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    fn writer(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))
    }

    fn reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))
    }

    // ========================================================================
    // AUTHORING
    // ========================================================================

    /// Author a new item at tier 0
    pub fn create_item(&self, input: NewItemInput, now: DateTime<Utc>) -> Result<CardRecord> {
        let id = Uuid::new_v4().to_string();
        let due_at = input.first_due(now);
        let tags_json = serde_json::to_string(&input.tags)?;

        {
            let writer = self.writer()?;
            writer.execute(
                "INSERT INTO reviewable_items (
                    id, front, back, tags, created_at, updated_at,
                    current_tier, next_review_at, last_outcome, review_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, NULL, 0)",
                params![
                    id,
                    input.front,
                    input.back,
                    tags_json,
                    ts(now),
                    ts(now),
                    ts(due_at),
                ],
            )?;
        }

        tracing::info!(item_id = %id, due_at = %due_at, "Item created");

        self.get_card(&id)?
            .ok_or_else(|| StorageError::NotFound(id))
    }

    /// Delete an item and its review log
    pub fn delete_item(&self, id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute("DELETE FROM reviewable_items WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Get a card by ID
    pub fn get_card(&self, id: &str) -> Result<Option<CardRecord>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT * FROM reviewable_items WHERE id = ?1")?;
        let card = stmt
            .query_row(params![id], |row| Self::row_to_card(row))
            .optional()?;
        Ok(card)
    }

    /// Get the scheduling view of an item
    pub fn get_item(&self, id: &str) -> Result<Option<ReviewableItem>> {
        Ok(self.get_card(id)?.map(|card| card.item))
    }

    /// Cards ordered by creation time
    pub fn list_cards(&self, limit: i64, offset: i64) -> Result<Vec<CardRecord>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM reviewable_items
             ORDER BY created_at ASC, id ASC
             LIMIT ?1 OFFSET ?2",
        )?;
        let cards = stmt.query_map(params![limit, offset], |row| Self::row_to_card(row))?;

        let mut result = Vec::new();
        for card in cards {
            result.push(card?);
        }
        Ok(result)
    }

    /// Parse RFC3339 timestamp
    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(StorageError::InvalidTimestamp(format!(
                        "{} '{}': {}",
                        field_name, value, e
                    ))),
                )
            })
    }

    /// Convert a row to CardRecord
    fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<CardRecord> {
        let id: String = row.get("id")?;
        let tags_json: String = row.get("tags")?;
        let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_else(|e| {
            tracing::warn!(item_id = %id, error = %e, "Unreadable tags column, treating as empty");
            Vec::new()
        });

        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;
        let next_review_at: String = row.get("next_review_at")?;
        let last_outcome: Option<String> = row.get("last_outcome")?;
        let last_outcome = last_outcome.and_then(|name| match Outcome::parse_name(&name) {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                tracing::warn!(item_id = %id, outcome = %name, "Unknown last outcome, ignoring");
                None
            }
        });

        Ok(CardRecord {
            item: ReviewableItem {
                id,
                current_tier: row.get("current_tier")?,
                next_review_at: Self::parse_timestamp(&next_review_at, "next_review_at")?,
                last_outcome,
            },
            front: row.get("front")?,
            back: row.get("back")?,
            tags,
            review_count: row.get("review_count")?,
            created_at: Self::parse_timestamp(&created_at, "created_at")?,
            updated_at: Self::parse_timestamp(&updated_at, "updated_at")?,
        })
    }

    // ========================================================================
    // DUE-ITEMS QUERY
    // ========================================================================

    /// Cards due at `now`, most overdue first
    pub fn due_cards(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<CardRecord>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM reviewable_items
             WHERE next_review_at <= ?1
             ORDER BY next_review_at ASC, created_at ASC
             LIMIT ?2",
        )?;
        let cards = stmt.query_map(params![ts(now), limit], |row| Self::row_to_card(row))?;

        let mut result = Vec::new();
        for card in cards {
            result.push(card?);
        }
        Ok(result)
    }

    /// Count of items due at `now`
    pub fn count_due(&self, now: DateTime<Utc>) -> Result<i64> {
        let reader = self.reader()?;
        let count = reader.query_row(
            "SELECT COUNT(*) FROM reviewable_items WHERE next_review_at <= ?1",
            params![ts(now)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Session seed: up to `limit` due items plus the full due count
    pub fn due_items(&self, now: DateTime<Utc>, limit: i64) -> Result<DueItems> {
        Ok(self.due_items_with_cards(now, limit)?.0)
    }

    /// Session seed together with the cards it was built from
    ///
    /// Both come from one due query, so every seeded item has its card.
    pub fn due_items_with_cards(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<(DueItems, Vec<CardRecord>)> {
        let cards = self.due_cards(now, limit)?;
        let total = usize::try_from(self.count_due(now)?).unwrap_or(0);
        let due = DueItems {
            items: cards.iter().map(|card| card.item.clone()).collect(),
            // A card added between the two queries must not make total < items
            total: total.max(cards.len()),
        };
        Ok((due, cards))
    }

    // ========================================================================
    // OUTCOMES
    // ========================================================================

    /// Write a judged card's new schedule and log the review
    ///
    /// Last write wins: the stored tier and due date are overwritten
    /// regardless of what another device wrote in the meantime. Due dates
    /// past year 9999 are stored as the last instant of 9999.
    pub fn record_outcome(&self, request: &PersistRequest, now: DateTime<Utc>) -> Result<CardRecord> {
        {
            let mut writer = self.writer()?;
            let tx = writer.transaction()?;

            let rows = tx.execute(
                "UPDATE reviewable_items SET
                    current_tier = ?1,
                    next_review_at = ?2,
                    last_outcome = ?3,
                    review_count = review_count + 1,
                    updated_at = ?4
                WHERE id = ?5",
                params![
                    request.new_tier,
                    ts(request.next_review_at),
                    request.outcome.as_str(),
                    ts(now),
                    request.item_id,
                ],
            )?;
            if rows == 0 {
                return Err(StorageError::NotFound(request.item_id.clone()));
            }

            tx.execute(
                "INSERT INTO review_log (
                    item_id, outcome, new_tier, next_review_at, reviewed_at, elapsed_seconds, sequence
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    request.item_id,
                    request.outcome.as_str(),
                    request.new_tier,
                    ts(request.next_review_at),
                    ts(now),
                    request.elapsed_seconds,
                    i64::try_from(request.sequence).unwrap_or(i64::MAX),
                ],
            )?;

            tx.commit()?;
        }

        self.get_card(&request.item_id)?
            .ok_or_else(|| StorageError::NotFound(request.item_id.clone()))
    }

    /// Most recent reviews of an item, newest first
    pub fn review_history(&self, id: &str, limit: i64) -> Result<Vec<ReviewLogEntry>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT item_id, outcome, new_tier, next_review_at, reviewed_at, elapsed_seconds, sequence
             FROM review_log
             WHERE item_id = ?1
             ORDER BY reviewed_at DESC, id DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![id, limit], |row| {
            let outcome: String = row.get("outcome")?;
            let next_review_at: String = row.get("next_review_at")?;
            let reviewed_at: String = row.get("reviewed_at")?;
            let sequence: i64 = row.get("sequence")?;
            Ok(ReviewLogEntry {
                item_id: row.get("item_id")?,
                outcome: Outcome::parse_name(&outcome).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
                new_tier: row.get("new_tier")?,
                next_review_at: Self::parse_timestamp(&next_review_at, "next_review_at")?,
                reviewed_at: Self::parse_timestamp(&reviewed_at, "reviewed_at")?,
                elapsed_seconds: row.get("elapsed_seconds")?,
                sequence: u64::try_from(sequence).unwrap_or(0),
            })
        })?;

        let mut result = Vec::new();
        for entry in rows {
            result.push(entry?);
        }
        Ok(result)
    }

    // ========================================================================
    // STATS
    // ========================================================================

    /// Collection statistics as of `now`
    pub fn stats(&self, now: DateTime<Utc>) -> Result<ReviewStats> {
        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| StorageError::InvalidTimestamp(now.to_rfc3339()))?;

        let reader = self.reader()?;

        let (total_items, never_reviewed): (i64, i64) = reader.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN review_count = 0 THEN 1 ELSE 0 END), 0)
             FROM reviewable_items",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let due_items: i64 = reader.query_row(
            "SELECT COUNT(*) FROM reviewable_items WHERE next_review_at <= ?1",
            params![ts(now)],
            |row| row.get(0),
        )?;

        let mut tier_counts = Vec::new();
        {
            let mut stmt = reader.prepare(
                "SELECT current_tier, COUNT(*) FROM reviewable_items
                 GROUP BY current_tier ORDER BY current_tier ASC",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?)))?;
            for row in rows {
                tier_counts.push(row?);
            }
        }

        let mut stats = ReviewStats {
            total_items,
            due_items,
            never_reviewed,
            tier_counts,
            ..Default::default()
        };

        let mut stmt = reader.prepare(
            "SELECT outcome, COUNT(*) FROM review_log
             WHERE reviewed_at >= ?1 AND reviewed_at <= ?2
             GROUP BY outcome",
        )?;
        let rows = stmt.query_map(params![ts(day_start), ts(now)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (outcome, count) = row?;
            stats.reviews_today += count;
            match Outcome::parse_name(&outcome) {
                Ok(Outcome::Remembered) => stats.remembered_today += count,
                Ok(Outcome::Partial) => stats.partial_today += count,
                Ok(Outcome::Forgotten) => stats.forgotten_today += count,
                Err(_) => tracing::warn!(outcome = %outcome, "Unknown outcome in review log"),
            }
        }

        Ok(stats)
    }

    /// Copy the database to `path` (VACUUM INTO)
    pub fn backup_to(&self, path: &std::path::Path) -> Result<()> {
        let path_str = path
            .to_str()
            .ok_or_else(|| StorageError::Init("Backup path is not valid UTF-8".into()))?;
        let reader = self.reader()?;
        reader.execute_batch(&format!("VACUUM INTO '{}'", path_str.replace('\'', "''")))?;
        Ok(())
    }
}

impl OutcomeSink for Storage {
    async fn persist(&self, request: PersistRequest) -> std::result::Result<(), PersistFailure> {
        self.record_outcome(&request, Utc::now())
            .map(|_| ())
            .map_err(|e| PersistFailure::new(request.item_id.clone(), e))
    }
}
