//! Flat key → string store (the page's `localStorage`).
//!
//! Each key is one file in the storage directory, so values survive restarts
//! and can be inspected by hand. File access goes through `tokio::fs`.

use crate::Error;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
enum Backend {
    Dir(PathBuf),
    Memory(Arc<Mutex<HashMap<String, String>>>),
}

/// Handle to a local storage area. Clones share the same area.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    backend: Backend,
}

impl LocalStorage {
    /// Use `dir` as the storage area, creating it when missing.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { backend: Backend::Dir(dir) })
    }

    pub fn in_memory() -> Self {
        Self { backend: Backend::Memory(Arc::default()) }
    }

    fn item_path(dir: &std::path::Path, key: &str) -> Result<PathBuf, Error> {
        let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::InvalidInput(format!("invalid storage key '{key}'")));
        }
        Ok(dir.join(format!("{key}.json")))
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        match &self.backend {
            Backend::Dir(dir) => {
                let path = Self::item_path(dir, key)?;
                match tokio::fs::read_to_string(&path).await {
                    Ok(value) => Ok(Some(value)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            Backend::Memory(items) => Ok(lock(items)?.get(key).cloned()),
        }
    }

    pub async fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        match &self.backend {
            Backend::Dir(dir) => {
                tokio::fs::write(Self::item_path(dir, key)?, value).await?;
                Ok(())
            }
            Backend::Memory(items) => {
                lock(items)?.insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    pub async fn remove_item(&self, key: &str) -> Result<(), Error> {
        match &self.backend {
            Backend::Dir(dir) => match tokio::fs::remove_file(Self::item_path(dir, key)?).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            },
            Backend::Memory(items) => {
                lock(items)?.remove(key);
                Ok(())
            }
        }
    }

    /// Read and decode a JSON value; `None` when absent or undecodable.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let Some(raw) = self.get_item(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring undecodable local storage item");
                Ok(None)
            }
        }
    }

    pub async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        self.set_item(key, &serde_json::to_string(value)?).await
    }
}

fn lock(
    items: &Mutex<HashMap<String, String>>,
) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, Error> {
    items
        .lock()
        .map_err(|_| Error::InvalidState("local storage lock poisoned".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dir_roundtrip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path().join("ls")).await.unwrap();
        assert_eq!(storage.get_item("vocab_data_version").await.unwrap(), None);

        storage.set_item("vocab_data_version", "1.0.5").await.unwrap();
        let reopened = LocalStorage::open(dir.path().join("ls")).await.unwrap();
        assert_eq!(reopened.get_item("vocab_data_version").await.unwrap().as_deref(), Some("1.0.5"));

        reopened.remove_item("vocab_data_version").await.unwrap();
        reopened.remove_item("vocab_data_version").await.unwrap();
        assert_eq!(storage.get_item("vocab_data_version").await.unwrap(), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_dir_writes_interleave_on_one_thread() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path().join("nested/ls")).await.unwrap();
        let favorites = vec!["3"];
        let (a, b, c) = tokio::join!(
            storage.set_item("vocab_fallback_data", "[]"),
            storage.set_item("vocab_last_update", "2024-03-09T00:00:00Z"),
            storage.set_json("vocab_favorites", &favorites),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(storage.get_item("vocab_fallback_data").await.unwrap().as_deref(), Some("[]"));
        let ids: Option<Vec<String>> = storage.get_json("vocab_favorites").await.unwrap();
        assert_eq!(ids, Some(vec!["3".to_string()]));
        assert!(dir.path().join("nested/ls/vocab_last_update.json").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path()).await.unwrap();
        assert!(matches!(storage.set_item("../escape", "x").await, Err(Error::InvalidInput(_))));
        assert!(matches!(storage.get_item("").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let storage = LocalStorage::in_memory();
        storage.set_json("vocab_favorites", &vec!["1", "2"]).await.unwrap();
        let ids: Option<Vec<String>> = storage.get_json("vocab_favorites").await.unwrap();
        assert_eq!(ids, Some(vec!["1".to_string(), "2".to_string()]));

        storage.set_item("vocab_favorites", "{not json").await.unwrap();
        let broken: Option<Vec<String>> = storage.get_json("vocab_favorites").await.unwrap();
        assert!(broken.is_none());
    }
}
