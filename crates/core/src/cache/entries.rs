//! Entry operations inside one named bucket.

use super::hash::{compute_cache_key, match_url};
use super::storage::CacheStorage;
use crate::Error;
use crate::http::{Request, Response};
use bytes::Bytes;
use tokio_rusqlite::{params, rusqlite};

/// Handle to one named bucket.
#[derive(Clone, Debug)]
pub struct Cache {
    storage: CacheStorage,
    name: String,
}

/// Row values for one entry, prepared outside the connection thread.
struct EntryRow {
    key_hash: String,
    url: String,
    method: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("cannot cache {} request", request.method)));
        }
        let url = match_url(&request.url);
        Ok(Self {
            key_hash: compute_cache_key(&request.method, &url),
            url,
            method: request.method.to_ascii_uppercase(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, bucket: &str, stored_at: &str) -> Result<(), Error> {
        conn.execute(
            "INSERT OR IGNORE INTO cache_buckets (name, created_at) VALUES (?1, ?2)",
            params![bucket, stored_at],
        )?;
        conn.execute(
            "INSERT INTO cache_entries (
                bucket, key_hash, url, method, status, status_text, headers_json, body, stored_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(bucket, key_hash) DO UPDATE SET
                url = excluded.url,
                method = excluded.method,
                status = excluded.status,
                status_text = excluded.status_text,
                headers_json = excluded.headers_json,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![
                bucket,
                &self.key_hash,
                &self.url,
                &self.method,
                self.status,
                &self.status_text,
                &self.headers_json,
                &self.body,
                stored_at,
            ],
        )?;
        Ok(())
    }
}

/// Map a `(url, status, status_text, headers_json, body)` row to a response.
pub(crate) fn row_to_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<Response> {
    let headers_json: String = row.get(3)?;
    let headers = serde_json::from_str(&headers_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e)))?;
    let body: Vec<u8> = row.get(4)?;
    Ok(Response {
        url: Some(row.get(0)?),
        status: row.get(1)?,
        status_text: row.get(2)?,
        headers,
        body: Bytes::from(body),
    })
}

impl Cache {
    pub(crate) fn new(storage: CacheStorage, name: &str) -> Self {
        Self { storage, name: name.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response for the request, replacing any previous entry.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let row = EntryRow::new(request, response)?;
        let bucket = self.name.clone();
        self.storage
            .conn
            .call(move |conn| -> Result<(), Error> {
                row.insert(conn, &bucket, &chrono::Utc::now().to_rfc3339())
            })
            .await
            .map_err(Error::from)
    }

    /// Store several responses atomically: either all entries land or none.
    pub async fn put_all(&self, pairs: &[(Request, Response)]) -> Result<usize, Error> {
        let rows = pairs
            .iter()
            .map(|(req, resp)| EntryRow::new(req, resp))
            .collect::<Result<Vec<_>, _>>()?;
        let bucket = self.name.clone();
        self.storage
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                let stored_at = chrono::Utc::now().to_rfc3339();
                for row in &rows {
                    row.insert(&tx, &bucket, &stored_at)?;
                }
                tx.commit()?;
                Ok(rows.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look the request up in this bucket only.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key_hash = compute_cache_key(&request.method, &match_url(&request.url));
        let bucket = self.name.clone();
        self.storage
            .conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, status_text, headers_json, body
                     FROM cache_entries WHERE bucket = ?1 AND key_hash = ?2",
                )?;
                match stmt.query_row(params![bucket, key_hash], row_to_response) {
                    Ok(resp) => Ok(Some(resp)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for the request. Returns false when nothing matched.
    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        let key_hash = compute_cache_key(&request.method, &match_url(&request.url));
        let bucket = self.name.clone();
        self.storage
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE bucket = ?1 AND key_hash = ?2",
                    params![bucket, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in this bucket, oldest write first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let bucket = self.name.clone();
        self.storage
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM cache_entries WHERE bucket = ?1 ORDER BY stored_at ASC, rowid ASC")?;
                let urls = stmt
                    .query_map(params![bucket], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(path: &str) -> Request {
        Request::get(Url::parse("https://app.example/").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let cache = caches.open_cache("app-v1").await.unwrap();
        let resp = Response::new(200, "body").with_header("Content-Type", "text/css");

        cache.put(&get("style.css"), &resp).await.unwrap();

        let found = cache.match_request(&get("style.css")).await.unwrap().unwrap();
        assert_eq!(found.status, 200);
        assert_eq!(found.text(), "body");
        assert_eq!(found.content_type(), Some("text/css"));
        assert_eq!(found.url.as_deref(), Some("https://app.example/style.css"));
    }

    #[tokio::test]
    async fn test_put_overwrites_last_write_wins() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let cache = caches.open_cache("app-v1").await.unwrap();
        cache.put(&get("a.js"), &Response::new(200, "one")).await.unwrap();
        cache.put(&get("a.js"), &Response::new(200, "two")).await.unwrap();

        let found = cache.match_request(&get("a.js")).await.unwrap().unwrap();
        assert_eq!(found.text(), "two");
        assert_eq!(cache.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_match_ignores_fragment() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let cache = caches.open_cache("app-v1").await.unwrap();
        cache.put(&get("index.html"), &Response::new(200, "<html>")).await.unwrap();

        let found = cache.match_request(&get("index.html#word-12")).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_buckets_are_isolated() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let v1 = caches.open_cache("app-v1").await.unwrap();
        let v2 = caches.open_cache("app-v2").await.unwrap();
        v1.put(&get("a.js"), &Response::new(200, "v1")).await.unwrap();

        assert!(v2.match_request(&get("a.js")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let cache = caches.open_cache("app-v1").await.unwrap();
        let mut req = get("api");
        req.method = "POST".into();

        let result = cache.put(&req, &Response::new(200, "")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_put_all_and_delete() {
        let caches = CacheStorage::open_in_memory().await.unwrap();
        let cache = caches.open_cache("app-v1").await.unwrap();
        let pairs = vec![
            (get("a.js"), Response::new(200, "a")),
            (get("b.js"), Response::new(200, "b")),
        ];

        assert_eq!(cache.put_all(&pairs).await.unwrap(), 2);
        assert!(cache.delete(&get("a.js")).await.unwrap());
        assert!(!cache.delete(&get("a.js")).await.unwrap());
        assert_eq!(cache.keys().await.unwrap(), vec!["https://app.example/b.js"]);
    }
}
