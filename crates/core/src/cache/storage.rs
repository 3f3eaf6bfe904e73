//! Bucket-level operations (`caches.keys()`, `caches.open()`, ...).

use super::entries::{Cache, row_to_response};
use super::hash::{compute_cache_key, match_url};
use crate::http::{Request, Response};
use crate::migrations::CACHE_MIGRATIONS;
use crate::{Error, connection};
use std::path::Path;
use tokio_rusqlite::{Connection, params, rusqlite};

/// Cache Storage handle.
///
/// Cloning is cheap; every clone talks to the same background connection,
/// so writes from all clones are serialized.
#[derive(Clone, Debug)]
pub struct CacheStorage {
    pub(crate) conn: Connection,
}

impl CacheStorage {
    /// Open (or create) the Cache Storage database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = connection::open(path, CACHE_MIGRATIONS).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory Cache Storage for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = connection::open_in_memory(CACHE_MIGRATIONS).await?;
        Ok(Self { conn })
    }

    /// Bucket names in creation order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_buckets ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a bucket with this name exists.
    pub async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_buckets WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Open a bucket, creating it when missing.
    pub async fn open_cache(&self, name: &str) -> Result<Cache, Error> {
        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_buckets (name, created_at) VALUES (?1, ?2)",
                    params![owned, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Cache::new(self.clone(), name))
    }

    /// Delete a bucket and all of its entries.
    ///
    /// Returns false if no bucket had that name.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE bucket = ?1", params![name])?;
                let removed = tx.execute("DELETE FROM cache_buckets WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up across every bucket, oldest bucket first.
    pub async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let url = match_url(&request.url);
        let key_hash = compute_cache_key(&request.method, &url);
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.url, e.status, e.status_text, e.headers_json, e.body
                     FROM cache_entries e JOIN cache_buckets b ON b.name = e.bucket
                     WHERE e.key_hash = ?1
                     ORDER BY b.rowid ASC LIMIT 1",
                )?;
                match stmt.query_row(params![key_hash], row_to_response) {
                    Ok(resp) => Ok(Some(resp)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn test_open_lists_buckets_in_creation_order() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        caches.open_cache("app-v2").await.unwrap();
        caches.open_cache("app-v1").await.unwrap();
        caches.open_cache("app-v2").await.unwrap();

        assert_eq!(caches.keys().await.unwrap(), vec!["app-v2", "app-v1"]);
        assert!(caches.has("app-v1").await.unwrap());
        assert!(!caches.has("app-v3").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_bucket_drops_entries() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let cache = caches.open_cache("app-v1").await.unwrap();
        let req = Request::get(Url::parse("https://app.example/a.js").unwrap());
        cache.put(&req, &Response::new(200, "a")).await.unwrap();

        assert!(caches.delete("app-v1").await.unwrap());
        assert!(!caches.delete("app-v1").await.unwrap());
        assert!(caches.match_any(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_any_searches_all_buckets() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let old = caches.open_cache("app-v1").await.unwrap();
        caches.open_cache("app-v2").await.unwrap();
        let req = Request::get(Url::parse("https://app.example/a.js").unwrap());
        old.put(&req, &Response::new(200, "old")).await.unwrap();

        let found = caches.match_any(&req).await.unwrap().unwrap();
        assert_eq!(found.text(), "old");
    }
}
