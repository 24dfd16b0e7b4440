// Downstream booking store
// Parsed bookings are handed here keyed by confirmation number; last write wins.

use crate::error::{BookingError, Result};
use crate::fixtures::validate_confirmation_no;
use crate::xml::{ParsedNode, ProjectedBooking};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

// Output of one retrieval, whichever converter produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BookingRecord {
    Tree(Value),
    Node(ParsedNode),
    Projected(ProjectedBooking),
}

impl BookingRecord {
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// Store trait, shared by the in-memory and the file-backed implementation
#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    // Store the record for a confirmation number, replacing any earlier one
    async fn store(&self, confirmation_no: &str, record: BookingRecord) -> Result<()>;

    // Fetch the record; NotFound if nothing was stored under this key
    async fn get(&self, confirmation_no: &str) -> Result<BookingRecord>;

    fn stats(&self) -> StoreStatsReport;
}

#[derive(Debug, Default)]
pub struct StoreStats {
    pub writes: AtomicUsize,
    pub overwrites: AtomicUsize,
    pub hits: AtomicUsize,
    pub misses: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StoreStatsReport {
    pub writes: usize,
    pub overwrites: usize,
    pub hits: usize,
    pub misses: usize,
}

impl StoreStats {
    fn record_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::SeqCst);
        } else {
            self.misses.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn report(&self) -> StoreStatsReport {
        StoreStatsReport {
            writes: self.writes.load(Ordering::SeqCst),
            overwrites: self.overwrites.load(Ordering::SeqCst),
            hits: self.hits.load(Ordering::SeqCst),
            misses: self.misses.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBookingStore {
    bookings: DashMap<String, BookingRecord>,
    stats: StoreStats,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn store(&self, confirmation_no: &str, record: BookingRecord) -> Result<()> {
        let previous = self.bookings.insert(confirmation_no.to_string(), record);
        self.stats.writes.fetch_add(1, Ordering::SeqCst);
        if previous.is_some() {
            self.stats.overwrites.fetch_add(1, Ordering::SeqCst);
        }
        debug!(confirmation_no, replaced = previous.is_some(), "stored booking in memory");
        Ok(())
    }

    async fn get(&self, confirmation_no: &str) -> Result<BookingRecord> {
        // Clone out so no shard guard outlives this call
        let found = self
            .bookings
            .get(confirmation_no)
            .map(|entry| entry.value().clone());
        self.stats.record_lookup(found.is_some());
        found.ok_or_else(|| BookingError::not_found(format!("stored booking {}", confirmation_no)))
    }

    fn stats(&self) -> StoreStatsReport {
        self.stats.report()
    }
}

// Persists each booking as stored_booking_<id>.json, pretty-printed
#[derive(Debug)]
pub struct JsonFileBookingStore {
    dir: PathBuf,
    stats: StoreStats,
}

impl JsonFileBookingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stats: StoreStats::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, confirmation_no: &str) -> Result<PathBuf> {
        validate_confirmation_no(confirmation_no)?;
        Ok(self
            .dir
            .join(format!("stored_booking_{}.json", confirmation_no)))
    }
}

#[async_trait]
impl BookingStore for JsonFileBookingStore {
    async fn store(&self, confirmation_no: &str, record: BookingRecord) -> Result<()> {
        let path = self.path_for(confirmation_no)?;
        let json = record.to_json_pretty()?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let existed = tokio::fs::try_exists(&path).await?;
        tokio::fs::write(&path, json).await?;

        self.stats.writes.fetch_add(1, Ordering::SeqCst);
        if existed {
            self.stats.overwrites.fetch_add(1, Ordering::SeqCst);
        }
        info!(path = %path.display(), "persisted booking");
        Ok(())
    }

    async fn get(&self, confirmation_no: &str) -> Result<BookingRecord> {
        let path = self.path_for(confirmation_no)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.stats.record_lookup(false);
                return Err(BookingError::not_found(path));
            }
            Err(e) => return Err(e.into()),
        };
        self.stats.record_lookup(true);
        // Once persisted the original shape is opaque, so it comes back as a tree
        Ok(BookingRecord::Tree(serde_json::from_str(&content)?))
    }

    fn stats(&self) -> StoreStatsReport {
        self.stats.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn tree(amount: &str) -> BookingRecord {
        BookingRecord::Tree(json!({ "reservation": { "amount": [amount] } }))
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip_and_overwrite() {
        let store = MemoryBookingStore::new();
        store.store("173903", tree("100")).await.unwrap();
        store.store("173903", tree("120.5")).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("173903").await.unwrap(), tree("120.5"));

        let stats = store.stats();
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.overwrites, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_memory_store_missing_key_is_not_found() {
        let store = MemoryBookingStore::new();
        let err = store.get("does-not-exist").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_memory_store_concurrent_writers() {
        let store = Arc::new(MemoryBookingStore::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.store("shared", tree(&i.to_string())).await.unwrap();
                store.store(&format!("own{}", i), tree("1")).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 9);
        assert!(store.get("shared").await.is_ok());
        assert_eq!(store.stats().writes, 16);
    }

    #[tokio::test]
    async fn test_json_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileBookingStore::new(dir.path().join("stored"));

        store.store("173903", tree("120.5")).await.unwrap();
        let path = store.path_for("173903").unwrap();
        assert!(path.ends_with("stored_booking_173903.json"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  \"reservation\""), "expected 2-space indent: {}", written);

        assert_eq!(store.get("173903").await.unwrap(), tree("120.5"));
    }

    #[tokio::test]
    async fn test_json_file_store_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileBookingStore::new(dir.path());
        let err = store.get("does-not-exist").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_json_file_store_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileBookingStore::new(dir.path().join("stored"));

        let err = store.store("../escaped", tree("1")).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidConfirmationNo(_)));
        assert!(matches!(
            store.get("../escaped").await,
            Err(BookingError::InvalidConfirmationNo(_))
        ));
        assert_eq!(store.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_json_file_store_surfaces_filesystem_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileBookingStore::new(dir.path());

        // File name longer than any filesystem allows
        let id = "9".repeat(300);
        let err = store.store(&id, tree("1")).await.unwrap_err();
        assert!(matches!(err, BookingError::Io(_)), "got {:?}", err);
        assert_eq!(store.stats().writes, 0);
        assert_eq!(store.stats().overwrites, 0);
    }
}
