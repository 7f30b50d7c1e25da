//! SQLite-based cache storage with file blob support
//!
//! Small bodies are stored inline, large ones (>32KB) as files under
//! `blobs/<sha256(store)>/<shard>/`.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{CacheStorage, EntryInfo};
use crate::error::StoreError;
use crate::http::{RequestKey, Response};

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 2;

/// Bodies larger than this are stored as external blobs
const INLINE_THRESHOLD: usize = 32 * 1024; // 32KB

type Result<T> = std::result::Result<T, StoreError>;

/// SQLite-backed cache storage with file blob support
pub struct SqliteCacheStorage {
    conn: Mutex<Connection>,
    blobs_dir: PathBuf,
}

impl SqliteCacheStorage {
    /// Get the cache directory path (~/.cache/nearly on Linux)
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(StoreError::NoHome)?;
        Ok(cache_base.join("nearly"))
    }

    /// Open storage at a specific directory
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| StoreError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = cache_dir.join("cache.db");
        let blobs_dir = cache_dir.join("blobs");
        std::fs::create_dir_all(&blobs_dir)
            .map_err(|e| StoreError::Io(format!("Failed to create blobs dir: {}", e)))?;

        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path, &blobs_dir)?;
            return Self::open_at(cache_dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_stores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cache_entries (
                store_name TEXT NOT NULL,
                request_key TEXT NOT NULL,
                method TEXT NOT NULL,
                url TEXT NOT NULL,
                status INTEGER NOT NULL,
                headers TEXT NOT NULL,
                body BLOB,
                blob_path TEXT,
                created_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                PRIMARY KEY (store_name, request_key)
            );

            CREATE INDEX IF NOT EXISTS idx_entries_store ON cache_entries(store_name);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn: Mutex::new(conn),
            blobs_dir,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Io("cache connection lock poisoned".to_string()))
    }

    fn ensure_store(conn: &Connection, store: &str) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
            params![store, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// Directory holding one store's blobs, named by a digest of the store
    /// name so distinct names never share a directory
    fn store_blob_dir(&self, store: &str) -> PathBuf {
        self.blobs_dir.join(format!("{:x}", Sha256::digest(store.as_bytes())))
    }

    /// Write a blob file, sharded by first 2 chars of the key digest
    fn write_blob(&self, store: &str, digest: &str, data: &[u8]) -> Result<String> {
        let store_dir = self.store_blob_dir(store);
        let shard = &digest[..2.min(digest.len())];
        let shard_dir = store_dir.join(shard);
        std::fs::create_dir_all(&shard_dir)
            .map_err(|e| StoreError::Io(format!("Failed to create shard dir: {}", e)))?;

        let filename = format!("{}.bin", digest);
        let full_path = shard_dir.join(&filename);

        std::fs::write(&full_path, data)
            .map_err(|e| StoreError::Io(format!("Failed to write blob: {}", e)))?;

        let rel = full_path
            .strip_prefix(&self.blobs_dir)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(rel.to_string_lossy().into_owned())
    }

    fn remove_blob(&self, rel_path: &str) {
        let full_path = self.blobs_dir.join(rel_path);
        if let Err(e) = std::fs::remove_file(&full_path) {
            log::warn!("Failed to remove blob {}: {}", rel_path, e);
        }
    }

    /// Nuke the cache (delete DB and all blobs)
    fn nuke(db_path: &Path, blobs_dir: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| StoreError::Io(format!("Failed to remove cache DB: {}", e)))?;
        }
        if blobs_dir.exists() {
            std::fs::remove_dir_all(blobs_dir)
                .map_err(|e| StoreError::Io(format!("Failed to remove blobs dir: {}", e)))?;
        }
        Ok(())
    }
}

impl CacheStorage for SqliteCacheStorage {
    fn open(&self, store: &str) -> Result<()> {
        let conn = self.conn()?;
        Self::ensure_store(&conn, store)
    }

    fn store_names(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn delete_store(&self, store: &str) -> Result<bool> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM cache_entries WHERE store_name = ?1", [store])?;
        let deleted = conn.execute("DELETE FROM cache_stores WHERE name = ?1", [store])?;
        drop(conn);

        let blob_dir = self.store_blob_dir(store);
        if blob_dir.exists()
            && let Err(e) = std::fs::remove_dir_all(&blob_dir)
        {
            log::warn!("Failed to remove blobs for store {}: {}", store, e);
        }

        Ok(deleted > 0)
    }

    fn get(&self, store: &str, key: &RequestKey) -> Result<Option<Response>> {
        let conn = self.conn()?;
        let row: Option<(u16, String, Option<Vec<u8>>, Option<String>)> = conn
            .query_row(
                "SELECT status, headers, body, blob_path FROM cache_entries
                 WHERE store_name = ?1 AND request_key = ?2",
                params![store, key.digest],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((status, headers, body, blob_path)) = row else {
            return Ok(None);
        };

        let headers: Vec<(String, String)> = serde_json::from_str(&headers)
            .map_err(|e| StoreError::Corrupt(format!("headers for {}: {}", key.url, e)))?;

        let body = match (body, blob_path) {
            (Some(body), None) => body,
            (None, Some(blob_path)) => match std::fs::read(self.blobs_dir.join(&blob_path)) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!("Failed to read blob {}: {}", blob_path, e);
                    // Delete stale entry
                    let _ = conn.execute(
                        "DELETE FROM cache_entries WHERE store_name = ?1 AND request_key = ?2",
                        params![store, key.digest],
                    );
                    return Ok(None);
                }
            },
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "entry for {} has no body",
                    key.url
                )));
            }
        };

        Ok(Some(Response {
            status,
            headers,
            body,
        }))
    }

    fn put(&self, store: &str, key: &RequestKey, response: &Response) -> Result<()> {
        let now = Utc::now().timestamp();
        let headers = serde_json::to_string(&response.headers)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let conn = self.conn()?;
        Self::ensure_store(&conn, store)?;

        let previous_blob: Option<String> = conn
            .query_row(
                "SELECT blob_path FROM cache_entries WHERE store_name = ?1 AND request_key = ?2",
                params![store, key.digest],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        if response.body.len() <= INLINE_THRESHOLD {
            conn.execute(
                "INSERT OR REPLACE INTO cache_entries
                 (store_name, request_key, method, url, status, headers, body, blob_path, created_at, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?9)",
                params![
                    store,
                    key.digest,
                    key.method,
                    key.url,
                    response.status,
                    headers,
                    response.body,
                    now,
                    response.body.len() as i64
                ],
            )?;
            if let Some(old) = previous_blob {
                self.remove_blob(&old);
            }
        } else {
            let blob_path = self.write_blob(store, &key.digest, &response.body)?;
            conn.execute(
                "INSERT OR REPLACE INTO cache_entries
                 (store_name, request_key, method, url, status, headers, body, blob_path, created_at, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8, ?9)",
                params![
                    store,
                    key.digest,
                    key.method,
                    key.url,
                    response.status,
                    headers,
                    blob_path,
                    now,
                    response.body.len() as i64
                ],
            )?;
        }
        Ok(())
    }

    fn entries(&self, store: Option<&str>) -> Result<Vec<EntryInfo>> {
        let conn = self.conn()?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(EntryInfo {
                store: row.get(0)?,
                method: row.get(1)?,
                url: row.get(2)?,
                status: row.get(3)?,
                size_bytes: row.get::<_, i64>(4)? as usize,
                created_at: row.get(5)?,
            })
        };

        let sql = "SELECT store_name, method, url, status, size_bytes, created_at
                   FROM cache_entries";
        let entries = match store {
            Some(name) => {
                let mut stmt =
                    conn.prepare(&format!("{} WHERE store_name = ?1 ORDER BY url", sql))?;
                stmt.query_map([name], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!("{} ORDER BY store_name, url", sql))?;
                stmt.query_map([], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(entries)
    }
}
