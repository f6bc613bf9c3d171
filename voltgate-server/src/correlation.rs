//! Correlation table for in-flight exchanges.
//!
//! Response and error frames carry no action field, so the only way to know
//! which action a `CallResult`/`CallError` answers is the entry recorded
//! here when the exchange started. Entries survive completion with a
//! terminal status instead of being deleted, so a late status query still
//! gets an answer.
//!
//! One store per session. Both flows of the session touch it; every access
//! goes through one mutex, and the size check and insert happen under the
//! same lock acquisition. Nothing awaits while the lock is held.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

/// Default store capacity when the config does not override it
pub const DEFAULT_CAPACITY: usize = 10;

/// Which side initiated the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Locally initiated; we sent the Call and await its response
    Sent,
    /// Remotely initiated; the device sent the Call
    Received,
}

/// Lifecycle of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryStatus {
    /// Created locally, not yet written to the socket
    New,
    /// Written to the socket, awaiting the correlated response
    Sent,
    /// Inbound frame recorded, not yet fully processed
    Received,
    /// Terminal: the exchange finished normally
    Completed,
    /// Terminal: the exchange finished with a CallError
    Error,
}

/// One exchange keyed by its uniqueId
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationEntry {
    /// The action this exchange carries; filled in lazily for inbound calls
    pub action: String,
    pub direction: Direction,
    pub status: EntryStatus,
    /// Outbound wire text for this exchange, if any
    pub sent_text: String,
    /// Inbound wire text for this exchange, if any
    pub received_text: String,
}

impl CorrelationEntry {
    /// Entry for a locally initiated request about to be queued
    pub fn sent(action: impl Into<String>, sent_text: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            direction: Direction::Sent,
            status: EntryStatus::New,
            sent_text: sent_text.into(),
            received_text: String::new(),
        }
    }

    /// Entry for an inbound frame with a fresh uniqueId
    pub fn received(received_text: impl Into<String>) -> Self {
        Self {
            action: String::new(),
            direction: Direction::Received,
            status: EntryStatus::Received,
            sent_text: String::new(),
            received_text: received_text.into(),
        }
    }
}

/// Store operation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The table is at capacity; the insert is refused, never queued
    #[error("correlation store full (capacity {0})")]
    QueueFull(usize),

    /// No entry under that uniqueId
    #[error("no correlation entry for uniqueId {0}")]
    NotFound(String),
}

/// Capacity-bounded table of exchanges keyed by uniqueId
#[derive(Debug)]
pub struct CorrelationStore {
    capacity: usize,
    entries: Mutex<HashMap<String, CorrelationEntry>>,
}

impl CorrelationStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Insert an entry; fails `QueueFull` when a new key would exceed capacity
    pub fn put(&self, unique_id: &str, entry: CorrelationEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(unique_id) && entries.len() >= self.capacity {
            return Err(StoreError::QueueFull(self.capacity));
        }
        entries.insert(unique_id.to_string(), entry);
        Ok(())
    }

    /// Fetch a copy of an entry
    pub fn get(&self, unique_id: &str) -> Option<CorrelationEntry> {
        self.entries.lock().get(unique_id).cloned()
    }

    /// Overwrite an existing entry; fails `NotFound` if absent
    pub fn replace(&self, unique_id: &str, entry: CorrelationEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        match entries.get_mut(unique_id) {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(StoreError::NotFound(unique_id.to_string())),
        }
    }

    /// Remove an entry; fails `NotFound` if absent
    pub fn remove(&self, unique_id: &str) -> Result<(), StoreError> {
        match self.entries.lock().remove(unique_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(unique_id.to_string())),
        }
    }

    /// Record an inbound frame: update the matching exchange or open a new one
    ///
    /// The single store step the inbound flow performs per frame. A fresh
    /// uniqueId opens a `Received` entry and can fail `QueueFull`; a known
    /// uniqueId gets the raw text and `Received` status attached.
    pub fn record_received(&self, unique_id: &str, raw: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(unique_id) {
            entry.received_text = raw.to_string();
            entry.status = EntryStatus::Received;
            return Ok(());
        }
        if entries.len() >= self.capacity {
            return Err(StoreError::QueueFull(self.capacity));
        }
        entries.insert(unique_id.to_string(), CorrelationEntry::received(raw));
        Ok(())
    }

    /// Attach the action to an existing entry
    pub fn set_action(&self, unique_id: &str, action: &str) -> Result<(), StoreError> {
        self.update(unique_id, |entry| entry.action = action.to_string())
    }

    /// Attach outbound wire text to an existing entry
    pub fn set_sent_text(&self, unique_id: &str, text: &str) -> Result<(), StoreError> {
        self.update(unique_id, |entry| entry.sent_text = text.to_string())
    }

    /// Move an existing entry to a new status
    pub fn set_status(&self, unique_id: &str, status: EntryStatus) -> Result<(), StoreError> {
        self.update(unique_id, |entry| entry.status = status)
    }

    fn update(
        &self,
        unique_id: &str,
        apply: impl FnOnce(&mut CorrelationEntry),
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        match entries.get_mut(unique_id) {
            Some(entry) => {
                apply(entry);
                Ok(())
            }
            None => Err(StoreError::NotFound(unique_id.to_string())),
        }
    }
}

impl Default for CorrelationStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let store = CorrelationStore::new(4);
        store
            .put("id-1", CorrelationEntry::sent("TriggerMessage", "[2,...]"))
            .unwrap();

        let entry = store.get("id-1").unwrap();
        assert_eq!(entry.action, "TriggerMessage");
        assert_eq!(entry.direction, Direction::Sent);
        assert_eq!(entry.status, EntryStatus::New);
    }

    #[test]
    fn test_get_missing() {
        let store = CorrelationStore::default();
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn test_put_beyond_capacity_refused() {
        let capacity = 3;
        let store = CorrelationStore::new(capacity);
        for i in 0..capacity {
            store
                .put(&format!("id-{}", i), CorrelationEntry::received("[2,...]"))
                .unwrap();
        }

        let result = store.put("id-overflow", CorrelationEntry::received("[2,...]"));
        assert_eq!(result, Err(StoreError::QueueFull(capacity)));
        assert_eq!(store.len(), capacity);
    }

    #[test]
    fn test_put_existing_key_at_capacity_is_overwrite() {
        let store = CorrelationStore::new(1);
        store.put("id-1", CorrelationEntry::received("a")).unwrap();
        // Same key does not grow the table, so it must not fail
        store.put("id-1", CorrelationEntry::received("b")).unwrap();
        assert_eq!(store.get("id-1").unwrap().received_text, "b");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_missing() {
        let store = CorrelationStore::default();
        let result = store.replace("ghost", CorrelationEntry::received("x"));
        assert_eq!(result, Err(StoreError::NotFound("ghost".into())));
    }

    #[test]
    fn test_remove() {
        let store = CorrelationStore::default();
        store.put("id-1", CorrelationEntry::received("x")).unwrap();
        store.remove("id-1").unwrap();
        assert!(store.get("id-1").is_none());
        assert_eq!(store.remove("id-1"), Err(StoreError::NotFound("id-1".into())));
    }

    #[test]
    fn test_record_received_fresh() {
        let store = CorrelationStore::default();
        store.record_received("id-1", "[2,\"id-1\",\"Heartbeat\",{}]").unwrap();

        let entry = store.get("id-1").unwrap();
        assert_eq!(entry.direction, Direction::Received);
        assert_eq!(entry.status, EntryStatus::Received);
        assert!(entry.action.is_empty());
    }

    #[test]
    fn test_record_received_updates_sent_exchange() {
        let store = CorrelationStore::default();
        store
            .put("id-1", CorrelationEntry::sent("TriggerMessage", "[2,...]"))
            .unwrap();
        store.set_status("id-1", EntryStatus::Sent).unwrap();

        store.record_received("id-1", "[3,\"id-1\",{}]").unwrap();

        let entry = store.get("id-1").unwrap();
        // The exchange keeps its direction and action; only the inbound leg lands
        assert_eq!(entry.direction, Direction::Sent);
        assert_eq!(entry.action, "TriggerMessage");
        assert_eq!(entry.status, EntryStatus::Received);
        assert_eq!(entry.received_text, "[3,\"id-1\",{}]");
    }

    #[test]
    fn test_record_received_full_store() {
        let store = CorrelationStore::new(1);
        store.record_received("id-1", "a").unwrap();
        let result = store.record_received("id-2", "b");
        assert_eq!(result, Err(StoreError::QueueFull(1)));
        // Updates of a known uniqueId still work at capacity
        store.record_received("id-1", "c").unwrap();
    }

    #[test]
    fn test_field_updates() {
        let store = CorrelationStore::default();
        store.record_received("id-1", "raw").unwrap();

        store.set_action("id-1", "BootNotification").unwrap();
        store.set_sent_text("id-1", "[3,\"id-1\",{}]").unwrap();
        store.set_status("id-1", EntryStatus::Completed).unwrap();

        let entry = store.get("id-1").unwrap();
        assert_eq!(entry.action, "BootNotification");
        assert_eq!(entry.sent_text, "[3,\"id-1\",{}]");
        assert_eq!(entry.status, EntryStatus::Completed);
    }

    #[test]
    fn test_field_updates_missing_entry() {
        let store = CorrelationStore::default();
        assert!(store.set_action("ghost", "X").is_err());
        assert!(store.set_sent_text("ghost", "t").is_err());
        assert!(store.set_status("ghost", EntryStatus::Error).is_err());
    }

    #[test]
    fn test_completed_entry_is_retained() {
        let store = CorrelationStore::default();
        store.record_received("id-1", "raw").unwrap();
        store.set_status("id-1", EntryStatus::Completed).unwrap();

        // A late query still sees the terminal status instead of not-found
        let entry = store.get("id-1").unwrap();
        assert_eq!(entry.status, EntryStatus::Completed);
    }

    #[test]
    fn test_entry_serializes_for_status_queries() {
        let entry = CorrelationEntry::sent("TriggerMessage", "[2,...]");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "TriggerMessage");
        assert_eq!(json["direction"], "Sent");
        assert_eq!(json["status"], "New");
    }
}
