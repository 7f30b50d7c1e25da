//! In-memory storage backend
//!
//! Non-persistent; used to drive the router deterministically in tests.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{CacheStorage, EntryInfo};
use crate::error::StoreError;
use crate::http::{RequestKey, Response};

type Result<T> = std::result::Result<T, StoreError>;

struct StoredEntry {
    key: RequestKey,
    response: Response,
    created_at: i64,
}

/// In-memory storage backend. Stores keep their creation order.
#[derive(Default)]
pub struct MemoryCacheStorage {
    stores: Mutex<Vec<(String, HashMap<String, StoredEntry>)>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<(String, HashMap<String, StoredEntry>)>>> {
        self.stores
            .lock()
            .map_err(|_| StoreError::Io("memory store lock poisoned".to_string()))
    }

    /// Number of entries in one store
    pub fn len(&self, store: &str) -> usize {
        self.lock()
            .map(|stores| {
                stores
                    .iter()
                    .find(|(name, _)| name == store)
                    .map(|(_, entries)| entries.len())
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn open(&self, store: &str) -> Result<()> {
        let mut stores = self.lock()?;
        if !stores.iter().any(|(name, _)| name == store) {
            stores.push((store.to_string(), HashMap::new()));
        }
        Ok(())
    }

    fn store_names(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.iter().map(|(name, _)| name.clone()).collect())
    }

    fn delete_store(&self, store: &str) -> Result<bool> {
        let mut stores = self.lock()?;
        let before = stores.len();
        stores.retain(|(name, _)| name != store);
        Ok(stores.len() != before)
    }

    fn get(&self, store: &str, key: &RequestKey) -> Result<Option<Response>> {
        let stores = self.lock()?;
        Ok(stores
            .iter()
            .find(|(name, _)| name == store)
            .and_then(|(_, entries)| entries.get(&key.digest))
            .map(|entry| entry.response.clone()))
    }

    fn put(&self, store: &str, key: &RequestKey, response: &Response) -> Result<()> {
        self.open(store)?;
        let mut stores = self.lock()?;
        if let Some((_, entries)) = stores.iter_mut().find(|(name, _)| name == store) {
            entries.insert(
                key.digest.clone(),
                StoredEntry {
                    key: key.clone(),
                    response: response.clone(),
                    created_at: Utc::now().timestamp(),
                },
            );
        }
        Ok(())
    }

    fn entries(&self, store: Option<&str>) -> Result<Vec<EntryInfo>> {
        let stores = self.lock()?;
        let mut entries: Vec<EntryInfo> = stores
            .iter()
            .filter(|(name, _)| store.is_none_or(|s| s == name.as_str()))
            .flat_map(|(name, entries)| {
                entries.values().map(move |e| EntryInfo {
                    store: name.clone(),
                    method: e.key.method.clone(),
                    url: e.key.url.clone(),
                    status: e.response.status,
                    size_bytes: e.response.body.len(),
                    created_at: e.created_at,
                })
            })
            .collect();
        entries.sort_by(|a, b| (&a.store, &a.url).cmp(&(&b.store, &b.url)));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, Url};

    fn key(url: &str) -> RequestKey {
        RequestKey::new(&Method::GET, &Url::parse(url).unwrap())
    }

    #[test]
    fn test_put_get_and_delete() {
        let storage = MemoryCacheStorage::new();
        let k = key("http://localhost/api/users");

        storage.put("a", &k, &Response::new(200, "x")).unwrap();
        assert_eq!(storage.len("a"), 1);
        assert!(storage.get("a", &k).unwrap().is_some());
        assert!(storage.get("b", &k).unwrap().is_none());

        assert!(storage.delete_store("a").unwrap());
        assert!(storage.get("a", &k).unwrap().is_none());
    }

    #[test]
    fn test_match_any_prefers_oldest_store() {
        let storage = MemoryCacheStorage::new();
        let k = key("http://localhost/");

        storage.put("first", &k, &Response::new(200, "one")).unwrap();
        storage.put("second", &k, &Response::new(200, "two")).unwrap();

        let hit = storage.match_any(&k).unwrap().unwrap();
        assert_eq!(hit.body, b"one");
    }
}
