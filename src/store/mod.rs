//! Named cache stores
//!
//! A [`CacheStorage`] holds any number of named stores, each a mapping from
//! [`RequestKey`] to [`Response`]. The router never touches the storage
//! directly; it holds one [`CacheHandle`] per store it owns.

pub mod sqlite;

#[cfg(test)]
pub mod memory;

use serde::Serialize;
use std::sync::Arc;

use crate::error::StoreError;
use crate::http::{Request, RequestKey, Response};

#[cfg(test)]
pub use memory::MemoryCacheStorage;
pub use sqlite::SqliteCacheStorage;

type Result<T> = std::result::Result<T, StoreError>;

/// Backend holding every named store.
///
/// Writes to the same key overwrite (last write wins). Writing to a store
/// that has not been opened creates it.
pub trait CacheStorage: Send + Sync {
    /// Create the store if it does not exist yet
    fn open(&self, store: &str) -> Result<()>;

    /// All store names, oldest first
    fn store_names(&self) -> Result<Vec<String>>;

    /// Delete a store and everything in it. Returns false if it did not exist.
    fn delete_store(&self, store: &str) -> Result<bool>;

    /// Look up one entry in one store
    fn get(&self, store: &str, key: &RequestKey) -> Result<Option<Response>>;

    /// Store a response under a key
    fn put(&self, store: &str, key: &RequestKey, response: &Response) -> Result<()>;

    /// Entry listing, optionally restricted to one store
    fn entries(&self, store: Option<&str>) -> Result<Vec<EntryInfo>>;

    /// Look up a key across every store, oldest store first
    fn match_any(&self, key: &RequestKey) -> Result<Option<Response>> {
        for store in self.store_names()? {
            if let Some(response) = self.get(&store, key)? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Per-store entry counts and sizes
    fn stats(&self) -> Result<Vec<StoreStats>> {
        let entries = self.entries(None)?;
        Ok(self
            .store_names()?
            .into_iter()
            .map(|name| {
                let (count, size) = entries
                    .iter()
                    .filter(|e| e.store == name)
                    .fold((0, 0), |(c, s), e| (c + 1, s + e.size_bytes));
                StoreStats {
                    name,
                    entries: count,
                    size_bytes: size,
                }
            })
            .collect())
    }
}

/// Handle on one named store
#[derive(Clone)]
pub struct CacheHandle {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl CacheHandle {
    pub fn new(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> Self {
        Self {
            storage,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn open(&self) -> Result<()> {
        self.storage.open(&self.name)
    }

    pub fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        self.storage.get(&self.name, &request.key())
    }

    pub fn put(&self, request: &Request, response: &Response) -> Result<()> {
        self.storage.put(&self.name, &request.key(), response)
    }
}

/// Listing row for one cached entry
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub store: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub size_bytes: usize,
    /// Unix timestamp (seconds)
    pub created_at: i64,
}

/// Aggregate numbers for one store
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub name: String,
    pub entries: usize,
    pub size_bytes: usize,
}
