use super::types::JobDescriptor;
use crate::error::StoreError;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Storage key for the single persisted research-job slot.
const ACTIVE_JOB_KEY: &str = "active_research_job";

/// String-valued key-value storage that survives process restarts.
///
/// The sole channel for resuming a research job after a restart; everything
/// else in the crate is rebuilt from scratch each run.
pub trait SlotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Sqlite-backed slot store living in the workspace directory.
pub struct SqliteSlotStore {
    db_path: PathBuf,
}

impl SqliteSlotStore {
    pub fn new(workspace_dir: &Path) -> Self {
        Self {
            db_path: workspace_dir.join("state").join("slots.db"),
        }
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open slot DB: {}", self.db_path.display()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS slots (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .context("Failed to initialize slot schema")?;

        f(&conn)
    }
}

impl SlotStore for SqliteSlotStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM slots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Sqlite(e).into())
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(StoreError::Sqlite)?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM slots WHERE key = ?1", params![key])
                .map_err(StoreError::Sqlite)?;
            Ok(())
        })
    }
}

/// In-memory slot store for tests.
#[derive(Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemorySlotStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| StoreError::Write(e.to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| StoreError::Write(e.to_string()))?;
        slots.remove(key);
        Ok(())
    }
}

/// Persists and retrieves the single research-job descriptor.
///
/// Failures on save/clear are logged, never propagated; losing the resume
/// slot degrades a restart, not the running job. Corrupted stored bytes are
/// treated identically to an empty slot: resumption must never fail because
/// of what a previous process wrote.
pub struct JobStateStore {
    slot: std::sync::Arc<dyn SlotStore>,
    expiry: Duration,
}

impl JobStateStore {
    pub fn new(slot: std::sync::Arc<dyn SlotStore>, expiry: Duration) -> Self {
        Self { slot, expiry }
    }

    /// Overwrite the single persisted slot with this descriptor.
    pub fn save(&self, descriptor: &JobDescriptor) {
        let serialized = match serde_json::to_string(descriptor) {
            Ok(serialized) => serialized,
            Err(e) => {
                tracing::warn!("Failed to serialize job state: {e}");
                return;
            }
        };
        if let Err(e) = self.slot.set(ACTIVE_JOB_KEY, &serialized) {
            tracing::warn!("Failed to save job state: {e}");
        }
    }

    /// Load the persisted descriptor together with its age.
    ///
    /// Returns `None` (deleting the slot) when the descriptor is older than
    /// the expiry window or does not parse.
    pub fn load(&self) -> Option<(JobDescriptor, Duration)> {
        let raw = match self.slot.get(ACTIVE_JOB_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read job state: {e}");
                return None;
            }
        };

        let descriptor: JobDescriptor = match serde_json::from_str(&raw) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!("Discarding corrupted job state: {e}");
                self.clear();
                return None;
            }
        };

        let elapsed = (Utc::now() - descriptor.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if elapsed > self.expiry {
            tracing::info!(
                "Persisted job is {}s old (expiry {}s), clearing",
                elapsed.as_secs(),
                self.expiry.as_secs()
            );
            self.clear();
            return None;
        }

        Some((descriptor, elapsed))
    }

    /// Remove the slot. Idempotent; called on completion, cancellation, and
    /// on start failure.
    pub fn clear(&self) {
        if let Err(e) = self.slot.remove(ACTIVE_JOB_KEY) {
            tracing::warn!("Failed to clear job state: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::types::{Modifiers, RequestParameters};
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn parameters() -> RequestParameters {
        RequestParameters {
            capability: "Traditional Analysis".into(),
            framework: "DCF Valuation".into(),
            context: "NVDA".into(),
            modifiers: Modifiers {
                scope: "Assets".into(),
                depth: "Comprehensive".into(),
                rigor: "Exhaustive Research".into(),
                perspective: "Investment".into(),
            },
        }
    }

    fn store_with_expiry(expiry_secs: u64) -> JobStateStore {
        JobStateStore::new(
            Arc::new(MemorySlotStore::new()),
            Duration::from_secs(expiry_secs),
        )
    }

    #[test]
    fn save_then_load_round_trips_fresh_descriptor() {
        let store = store_with_expiry(1800);
        let descriptor = JobDescriptor::new(parameters());

        store.save(&descriptor);
        let (loaded, elapsed) = store.load().expect("fresh job should load");

        assert_eq!(loaded, descriptor);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn load_discards_descriptor_older_than_expiry() {
        let store = store_with_expiry(1800);
        let mut descriptor = JobDescriptor::new(parameters());
        descriptor.started_at = Utc::now() - ChronoDuration::seconds(1801);

        store.save(&descriptor);

        assert!(store.load().is_none());
        // The slot was deleted, not merely skipped.
        assert!(store.load().is_none());
    }

    #[test]
    fn load_keeps_descriptor_just_inside_expiry() {
        let store = store_with_expiry(1800);
        let mut descriptor = JobDescriptor::new(parameters());
        descriptor.started_at = Utc::now() - ChronoDuration::seconds(1700);

        store.save(&descriptor);
        let (_, elapsed) = store.load().expect("unexpired job should load");

        assert!(elapsed >= Duration::from_secs(1700));
    }

    #[test]
    fn corrupted_slot_is_treated_as_absent() {
        let slot = Arc::new(MemorySlotStore::new());
        slot.set(ACTIVE_JOB_KEY, "{not json at all").unwrap();
        let store = JobStateStore::new(Arc::clone(&slot) as Arc<dyn SlotStore>, Duration::from_secs(1800));

        assert!(store.load().is_none());
        // Corrupted bytes are cleared on first load.
        assert!(slot.get(ACTIVE_JOB_KEY).unwrap().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let store = store_with_expiry(1800);
        store.save(&JobDescriptor::new(parameters()));

        store.clear();
        store.clear();

        assert!(store.load().is_none());
    }

    #[test]
    fn future_start_time_clamps_elapsed_to_zero() {
        let store = store_with_expiry(1800);
        let mut descriptor = JobDescriptor::new(parameters());
        descriptor.started_at = Utc::now() + ChronoDuration::seconds(60);

        store.save(&descriptor);
        let (_, elapsed) = store.load().expect("future-dated job should load");

        assert_eq!(elapsed, Duration::ZERO);
    }

    #[test]
    fn sqlite_slot_store_survives_reopen() {
        let tmp = TempDir::new().unwrap();

        {
            let slot = SqliteSlotStore::new(tmp.path());
            slot.set("k", "v1").unwrap();
            slot.set("k", "v2").unwrap();
        }

        let slot = SqliteSlotStore::new(tmp.path());
        assert_eq!(slot.get("k").unwrap().as_deref(), Some("v2"));

        slot.remove("k").unwrap();
        assert!(slot.get("k").unwrap().is_none());
        // Removing an absent key is a no-op.
        slot.remove("k").unwrap();
    }
}
