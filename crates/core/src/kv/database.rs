//! Database handle: open/upgrade and per-store operations.

use super::key::{Direction, Key, KeyRange};
use super::schema::{Catalog, ObjectStoreSchema, UpgradeTransaction, load_catalog, write_index_entries};
use crate::migrations::KV_MIGRATIONS;
use crate::{Error, connection};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio_rusqlite::{Connection, params, params_from_iter, rusqlite};

/// Outcome of a batch write: how many records landed and how many were skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct BulkWriteResult {
    pub succeeded: usize,
    pub failed: usize,
}

/// One step of a cursor walk.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorRecord {
    /// Index key when walking an index, otherwise the primary key.
    pub key: Key,
    pub primary_key: Key,
    pub value: Value,
}

/// Live handle to one versioned database.
///
/// Cloning shares the underlying connection.
#[derive(Clone, Debug)]
pub struct Database {
    conn: Connection,
    name: String,
    version: u32,
    catalog: Arc<Catalog>,
}

impl Database {
    /// Open `name` at `version`, running `upgrade` when the stored version is older.
    ///
    /// The upgrade closure receives `(tx, old_version, new_version)` and runs
    /// in the same transaction as the version bump.
    pub async fn open<F>(path: impl AsRef<Path>, name: &str, version: u32, upgrade: F) -> Result<Self, Error>
    where
        F: FnOnce(&UpgradeTransaction<'_>, u32, u32) -> Result<(), Error> + Send + 'static,
    {
        let conn = connection::open(path, KV_MIGRATIONS)
            .await
            .map_err(|e| Error::Connection(format!("cannot open {name}: {e}")))?;
        Self::prepare(conn, name, version, upgrade).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory<F>(name: &str, version: u32, upgrade: F) -> Result<Self, Error>
    where
        F: FnOnce(&UpgradeTransaction<'_>, u32, u32) -> Result<(), Error> + Send + 'static,
    {
        let conn = connection::open_in_memory(KV_MIGRATIONS)
            .await
            .map_err(|e| Error::Connection(format!("cannot open {name}: {e}")))?;
        Self::prepare(conn, name, version, upgrade).await
    }

    async fn prepare<F>(conn: Connection, name: &str, version: u32, upgrade: F) -> Result<Self, Error>
    where
        F: FnOnce(&UpgradeTransaction<'_>, u32, u32) -> Result<(), Error> + Send + 'static,
    {
        if version == 0 {
            return Err(Error::InvalidInput("database version must be at least 1".into()));
        }

        let db_name = name.to_string();
        let catalog = conn
            .call(move |conn| -> Result<Catalog, Error> {
                let tx = conn.transaction()?;
                let old: u32 = tx.query_row("PRAGMA user_version", [], |row| row.get(0))?;
                if old > version {
                    return Err(Error::Connection(format!(
                        "{db_name} is at version {old}, cannot open at older version {version}"
                    )));
                }
                if old < version {
                    tracing::info!(database = %db_name, old, new = version, "upgrading database");
                    upgrade(&UpgradeTransaction::new(&tx), old, version)
                        .map_err(|e| Error::Connection(format!("upgrade of {db_name} failed: {e}")))?;
                    tx.execute_batch(&format!("PRAGMA user_version = {version}"))?;
                }
                let catalog = load_catalog(&tx)?;
                tx.commit()?;
                Ok(catalog)
            })
            .await
            .map_err(Error::from)?;

        Ok(Self { conn, name: name.to_string(), version, catalog: Arc::new(catalog) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn object_store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.catalog.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn schema(&self, store: &str) -> Result<&ObjectStoreSchema, Error> {
        self.catalog
            .get(store)
            .ok_or_else(|| Error::UnknownStore(store.to_string()))
    }

    pub async fn get(&self, store: &str, key: impl Into<Key>) -> Result<Option<Value>, Error> {
        let store = self.schema(store)?.name.clone();
        let key = key.into();
        self.conn
            .call(move |conn| -> Result<Option<Value>, Error> {
                let raw = conn.query_row(
                    "SELECT value FROM _records WHERE store = ?1 AND key = ?2",
                    params![store, key],
                    |row| row.get::<_, String>(0),
                );
                match raw {
                    Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a record, returning its primary key.
    pub async fn put(&self, store: &str, value: Value) -> Result<Key, Error> {
        let schema = self.schema(store)?.clone();
        self.conn
            .call(move |conn| -> Result<Key, Error> {
                let tx = conn.transaction()?;
                let key = put_record(&tx, &schema, &value)?;
                tx.commit()?;
                Ok(key)
            })
            .await
            .map_err(Error::from)
    }

    /// Write many records in one transaction.
    ///
    /// A record that cannot be stored is rolled back on its own and counted
    /// as failed; the rest of the batch still commits.
    pub async fn put_all(&self, store: &str, values: Vec<Value>) -> Result<BulkWriteResult, Error> {
        let schema = self.schema(store)?.clone();
        self.conn
            .call(move |conn| -> Result<BulkWriteResult, Error> {
                let mut tx = conn.transaction()?;
                let mut result = BulkWriteResult::default();
                for value in &values {
                    let sp = tx.savepoint()?;
                    match put_record(&sp, &schema, value) {
                        Ok(_) => {
                            sp.commit()?;
                            result.succeeded += 1;
                        }
                        Err(e) => {
                            tracing::debug!(store = %schema.name, error = %e, "skipping record");
                            result.failed += 1;
                        }
                    }
                }
                tx.commit()?;
                Ok(result)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one record. Returns false when the key was absent.
    pub async fn delete(&self, store: &str, key: impl Into<Key>) -> Result<bool, Error> {
        let store = self.schema(store)?.name.clone();
        let key = key.into();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM _index_entries WHERE store = ?1 AND pkey = ?2",
                    params![store, key],
                )?;
                let removed = tx.execute("DELETE FROM _records WHERE store = ?1 AND key = ?2", params![store, key])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn clear(&self, store: &str) -> Result<(), Error> {
        let store = self.schema(store)?.name.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM _index_entries WHERE store = ?1", params![store])?;
                tx.execute("DELETE FROM _records WHERE store = ?1", params![store])?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of records whose primary key falls in `range`.
    pub async fn count(&self, store: &str, range: Option<KeyRange>) -> Result<usize, Error> {
        let store = self.schema(store)?.name.clone();
        let (clause, bounds) = range.unwrap_or_default().sql_clause("key");
        let mut binds = vec![Key::Text(store)];
        binds.extend(bounds);
        let sql = format!("SELECT COUNT(*) FROM _records WHERE store = ? AND {clause}");
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 = conn.query_row(&sql, params_from_iter(binds.iter()), |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    /// All record values in ascending key order (index key order when
    /// `index` is given).
    pub async fn get_all(&self, store: &str, index: Option<&str>, range: Option<KeyRange>) -> Result<Vec<Value>, Error> {
        let records = self.cursor(store, index, range, Direction::Next).await?;
        Ok(records.into_iter().map(|r| r.value).collect())
    }

    /// Walk a store or one of its indexes in `direction`, materialized.
    ///
    /// Index walks order by index key, then primary key.
    pub async fn cursor(
        &self, store: &str, index: Option<&str>, range: Option<KeyRange>, direction: Direction,
    ) -> Result<Vec<CursorRecord>, Error> {
        let schema = self.schema(store)?;
        let range = range.unwrap_or_default();
        let dir = direction.sql();

        let (sql, binds) = match index {
            None => {
                let (clause, bounds) = range.sql_clause("key");
                let mut binds = vec![Key::Text(schema.name.clone())];
                binds.extend(bounds);
                let sql = format!(
                    "SELECT key, key, value FROM _records WHERE store = ? AND {clause} ORDER BY key {dir}"
                );
                (sql, binds)
            }
            Some(index) => {
                let index = schema
                    .index(index)
                    .ok_or_else(|| Error::UnknownStore(format!("{}.{index}", schema.name)))?;
                let (clause, bounds) = range.sql_clause("e.ikey");
                let mut binds = vec![Key::Text(schema.name.clone()), Key::Text(index.name.clone())];
                binds.extend(bounds);
                let sql = format!(
                    "SELECT e.ikey, r.key, r.value
                     FROM _index_entries e JOIN _records r ON r.store = e.store AND r.key = e.pkey
                     WHERE e.store = ? AND e.idx = ? AND {clause}
                     ORDER BY e.ikey {dir}, e.pkey {dir}"
                );
                (sql, binds)
            }
        };

        self.conn
            .call(move |conn| -> Result<Vec<CursorRecord>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(binds.iter()), |row| {
                        Ok((row.get::<_, Key>(0)?, row.get::<_, Key>(1)?, row.get::<_, String>(2)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter()
                    .map(|(key, primary_key, raw)| {
                        Ok(CursorRecord { key, primary_key, value: serde_json::from_str(&raw)? })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }
}

/// Upsert one record and rebuild its index rows.
fn put_record(conn: &rusqlite::Connection, schema: &ObjectStoreSchema, value: &Value) -> Result<Key, Error> {
    if !value.is_object() {
        return Err(Error::Data("record must be a JSON object".into()));
    }
    let key = schema.key_for(value)?;
    conn.execute(
        "INSERT INTO _records (store, key, value) VALUES (?1, ?2, ?3)
         ON CONFLICT(store, key) DO UPDATE SET value = excluded.value",
        params![schema.name, key, serde_json::to_string(value)?],
    )?;
    conn.execute(
        "DELETE FROM _index_entries WHERE store = ?1 AND pkey = ?2",
        params![schema.name, key],
    )?;
    for index in &schema.indexes {
        write_index_entries(conn, &schema.name, index, &key, value)?;
    }
    Ok(key)
}
