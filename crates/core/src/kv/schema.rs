//! Object store catalog and the upgrade transaction API.

use super::key::{Key, resolve_key_path};
use crate::Error;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tokio_rusqlite::{params, rusqlite};

/// Options for [`UpgradeTransaction::create_index`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    pub unique: bool,
    pub multi_entry: bool,
}

/// A secondary index definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSchema {
    pub name: String,
    pub key_path: String,
    pub unique: bool,
    pub multi_entry: bool,
}

impl IndexSchema {
    /// Keys this index holds for `record`; empty when the key path is
    /// missing or not a valid key.
    pub fn keys_for(&self, record: &Value) -> Vec<Key> {
        match resolve_key_path(record, &self.key_path) {
            Some(Value::Array(items)) if self.multi_entry => items
                .iter()
                .filter_map(Key::from_index_json)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Some(v) => Key::from_index_json(v).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

/// An object store definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStoreSchema {
    pub name: String,
    pub key_path: String,
    pub indexes: Vec<IndexSchema>,
}

impl ObjectStoreSchema {
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Primary key of `record`.
    pub fn key_for(&self, record: &Value) -> Result<Key, Error> {
        let raw = resolve_key_path(record, &self.key_path)
            .ok_or_else(|| Error::Data(format!("record has no value at key path '{}'", self.key_path)))?;
        Key::from_json(raw).ok_or_else(|| Error::Data(format!("value at key path '{}' is not a valid key", self.key_path)))
    }
}

pub(crate) type Catalog = HashMap<String, ObjectStoreSchema>;

pub(crate) fn load_catalog(conn: &rusqlite::Connection) -> Result<Catalog, Error> {
    let mut catalog = Catalog::new();
    {
        let mut stmt = conn.prepare("SELECT name, key_path FROM _object_stores")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (name, key_path) in rows {
            catalog.insert(name.clone(), ObjectStoreSchema { name, key_path, indexes: Vec::new() });
        }
    }

    let mut stmt = conn.prepare("SELECT store, name, key_path, is_unique, multi_entry FROM _indexes ORDER BY store, name")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                IndexSchema {
                    name: row.get(1)?,
                    key_path: row.get(2)?,
                    unique: row.get::<_, i64>(3)? == 1,
                    multi_entry: row.get::<_, i64>(4)? == 1,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (store, index) in rows {
        if let Some(schema) = catalog.get_mut(&store) {
            schema.indexes.push(index);
        }
    }

    Ok(catalog)
}

/// Write the index rows for one record.
pub(crate) fn write_index_entries(
    conn: &rusqlite::Connection, store: &str, index: &IndexSchema, pkey: &Key, record: &Value,
) -> Result<(), Error> {
    for ikey in index.keys_for(record) {
        if index.unique {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM _index_entries
                 WHERE store = ?1 AND idx = ?2 AND ikey = ?3 AND pkey != ?4)",
                params![store, index.name, ikey, pkey],
                |row| row.get(0),
            )?;
            if taken {
                return Err(Error::Data(format!("unique index '{}' already holds key {ikey}", index.name)));
            }
        }
        conn.execute(
            "INSERT OR IGNORE INTO _index_entries (store, idx, ikey, pkey) VALUES (?1, ?2, ?3, ?4)",
            params![store, index.name, ikey, pkey],
        )?;
    }
    Ok(())
}

/// Schema operations available while a version upgrade is in progress.
///
/// Everything done through this handle commits together with the version
/// bump, or not at all.
pub struct UpgradeTransaction<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> UpgradeTransaction<'a> {
    pub(crate) fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn object_store_names(&self) -> Result<Vec<String>, Error> {
        let mut stmt = self.conn.prepare("SELECT name FROM _object_stores ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn contains_object_store(&self, name: &str) -> Result<bool, Error> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM _object_stores WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn create_object_store(&self, name: &str, key_path: &str) -> Result<(), Error> {
        if self.contains_object_store(name)? {
            return Err(Error::InvalidInput(format!("object store '{name}' already exists")));
        }
        if key_path.is_empty() {
            return Err(Error::InvalidInput("key path must not be empty".into()));
        }
        self.conn.execute(
            "INSERT INTO _object_stores (name, key_path) VALUES (?1, ?2)",
            params![name, key_path],
        )?;
        Ok(())
    }

    /// Drop a store with all of its records and indexes.
    pub fn delete_object_store(&self, name: &str) -> Result<(), Error> {
        if !self.contains_object_store(name)? {
            return Err(Error::UnknownStore(name.to_string()));
        }
        self.conn.execute("DELETE FROM _index_entries WHERE store = ?1", params![name])?;
        self.conn.execute("DELETE FROM _indexes WHERE store = ?1", params![name])?;
        self.conn.execute("DELETE FROM _records WHERE store = ?1", params![name])?;
        self.conn.execute("DELETE FROM _object_stores WHERE name = ?1", params![name])?;
        Ok(())
    }

    /// Create an index and populate it from the records already stored.
    pub fn create_index(&self, store: &str, name: &str, key_path: &str, options: IndexOptions) -> Result<(), Error> {
        if !self.contains_object_store(store)? {
            return Err(Error::UnknownStore(store.to_string()));
        }
        let index = IndexSchema {
            name: name.to_string(),
            key_path: key_path.to_string(),
            unique: options.unique,
            multi_entry: options.multi_entry,
        };
        self.conn.execute(
            "INSERT INTO _indexes (store, name, key_path, is_unique, multi_entry) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![store, name, key_path, options.unique as i64, options.multi_entry as i64],
        )?;

        let mut stmt = self.conn.prepare("SELECT key, value FROM _records WHERE store = ?1")?;
        let records = stmt
            .query_map(params![store], |row| Ok((row.get::<_, Key>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (pkey, raw) in records {
            let record: Value = serde_json::from_str(&raw)?;
            write_index_entries(self.conn, store, &index, &pkey, &record)?;
        }
        Ok(())
    }

    pub fn delete_index(&self, store: &str, name: &str) -> Result<(), Error> {
        self.conn.execute(
            "DELETE FROM _index_entries WHERE store = ?1 AND idx = ?2",
            params![store, name],
        )?;
        let removed = self.conn.execute(
            "DELETE FROM _indexes WHERE store = ?1 AND name = ?2",
            params![store, name],
        )?;
        if removed == 0 {
            return Err(Error::UnknownStore(format!("{store}.{name}")));
        }
        Ok(())
    }
}
