//! Chain persistence over a Web-Storage-shaped key-value area.
//!
//! [`Storage`] mirrors `localStorage`: string keys, string values, writes that
//! can fail when storage is disabled or full. [`ChainStore`] keeps one JSON
//! record per chain id on top of it and never fails on reads — a missing or
//! corrupt record is simply absent.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::StorageError;
use crate::game::chain::Chain;

/// A durable string key-value area.
pub trait Storage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct MemoryArea {
    items: HashMap<String, String>,
    quota: Option<usize>,
    disabled: bool,
}

impl MemoryArea {
    fn used_bytes(&self) -> usize {
        self.items.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

/// In-memory storage area. Clones share the same items, the way two pages of
/// one browser profile share `localStorage`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    area: Rc<RefCell<MemoryArea>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that refuses writes once keys plus values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        let storage = Self::default();
        storage.area.borrow_mut().quota = Some(bytes);
        storage
    }

    /// Storage that rejects every read and write, like a browser with site
    /// data blocked.
    pub fn disabled() -> Self {
        let storage = Self::default();
        storage.area.borrow_mut().disabled = true;
        storage
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.area.borrow_mut().disabled = disabled;
    }

    /// Seed a raw value, bypassing quota. Used to mirror what the browser
    /// already holds.
    pub fn hydrate(&self, key: &str, value: &str) {
        self.area
            .borrow_mut()
            .items
            .insert(key.to_string(), value.to_string());
    }

    /// Drop every item and lift any quota or disabled flag.
    pub fn clear(&self) {
        *self.area.borrow_mut() = MemoryArea::default();
    }

    pub fn len(&self) -> usize {
        self.area.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let area = self.area.borrow();
        if area.disabled {
            return Err(StorageError::Disabled);
        }
        Ok(area.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut area = self.area.borrow_mut();
        if area.disabled {
            return Err(StorageError::Disabled);
        }
        if let Some(quota) = area.quota {
            let replaced = area.items.get(key).map_or(0, |v| key.len() + v.len());
            let used = area.used_bytes() - replaced;
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(StorageError::QuotaExceeded { needed, available });
            }
        }
        area.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A record as written: the storage key and its JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub key: String,
    pub json: String,
}

/// One serialized chain per id.
#[derive(Debug, Clone)]
pub struct ChainStore<S> {
    storage: S,
    prefix: String,
}

impl<S: Storage> ChainStore<S> {
    pub fn new(storage: S, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    pub fn key_for(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }

    /// Look up the chain stored under `id`.
    pub fn get(&self, id: &str) -> Option<Chain> {
        let key = self.key_for(id);
        let raw = match self.storage.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(%key, error = %e, "storage read failed; treating chain as absent");
                return None;
            }
        };
        match serde_json::from_str::<Chain>(&raw) {
            Ok(chain) => {
                let chain = chain.normalized(id);
                if chain.is_none() {
                    tracing::warn!(%key, "stored chain violates its invariants; ignoring");
                }
                chain
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "corrupt chain record; ignoring");
                None
            }
        }
    }

    /// Serialize and store the full chain under its id, replacing any prior
    /// record.
    pub fn put(&mut self, chain: &Chain) -> Result<StoredRecord, StorageError> {
        let key = self.key_for(chain.id());
        let json = serde_json::to_string(chain)?;
        self.storage.set_item(&key, &json)?;
        tracing::debug!(%key, lines = chain.lines().len(), "chain persisted");
        Ok(StoredRecord { key, json })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ChainStore<MemoryStorage> {
        ChainStore::new(MemoryStorage::new(), "fuse_chain_")
    }

    fn sample() -> Chain {
        let mut c = Chain::started("K7Q2ZP", "The pigeons formed a union because…").unwrap();
        c.append("Breadcrumbs were no longer enough").unwrap();
        c
    }

    #[test]
    fn put_then_get_roundtrips() {
        let mut s = store();
        let chain = sample();
        let record = s.put(&chain).unwrap();
        assert_eq!(record.key, "fuse_chain_K7Q2ZP");
        assert_eq!(s.get("K7Q2ZP"), Some(chain));
    }

    #[test]
    fn put_overwrites() {
        let mut s = store();
        let mut chain = sample();
        s.put(&chain).unwrap();
        chain.append("They picketed the park").unwrap();
        s.put(&chain).unwrap();
        assert_eq!(s.get("K7Q2ZP").unwrap().lines().len(), 2);
        assert_eq!(s.storage().len(), 1);
    }

    #[test]
    fn unknown_id_is_absent() {
        assert!(store().get("NOPE").is_none());
    }

    #[test]
    fn corrupt_record_is_absent() {
        let s = store();
        s.storage().hydrate("fuse_chain_BAD", "{not json");
        assert!(s.get("BAD").is_none());
        s.storage().hydrate("fuse_chain_HALF", r#"{"id":"HALF","prompt":"p"}"#);
        assert!(s.get("HALF").is_none());
    }

    #[test]
    fn record_under_wrong_key_is_absent() {
        let mut s = store();
        let record = s.put(&sample()).unwrap();
        s.storage().hydrate("fuse_chain_OTHER", &record.json);
        assert!(s.get("OTHER").is_none());
    }

    #[test]
    fn disabled_storage_fails_softly_on_read_and_loudly_on_write() {
        let mut s = ChainStore::new(MemoryStorage::disabled(), "fuse_chain_");
        assert!(s.get("K7Q2ZP").is_none());
        assert_eq!(s.put(&sample()), Err(StorageError::Disabled));
    }

    #[test]
    fn quota_is_enforced() {
        let mut s = ChainStore::new(MemoryStorage::with_quota(32), "fuse_chain_");
        match s.put(&sample()) {
            Err(StorageError::QuotaExceeded { available, .. }) => assert_eq!(available, 32),
            other => panic!("expected quota error, got {other:?}"),
        }
        assert!(s.storage().is_empty());
    }

    #[test]
    fn overwrite_does_not_count_old_value_against_quota() {
        let chain = sample();
        let json_len = serde_json::to_string(&chain).unwrap().len();
        let key_len = "fuse_chain_K7Q2ZP".len();
        let mut s = ChainStore::new(MemoryStorage::with_quota(key_len + json_len), "fuse_chain_");
        s.put(&chain).unwrap();
        s.put(&chain).unwrap();
    }

    #[test]
    fn clones_share_the_same_area() {
        let storage = MemoryStorage::new();
        let mut writer = ChainStore::new(storage.clone(), "fuse_chain_");
        let reader = ChainStore::new(storage, "fuse_chain_");
        writer.put(&sample()).unwrap();
        assert!(reader.get("K7Q2ZP").is_some());
    }
}
