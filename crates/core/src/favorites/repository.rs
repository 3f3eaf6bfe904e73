//! Favorites repository over either backend.

use super::entry::FavoriteEntry;
use crate::Error;
use crate::kv::{Database, Direction, IndexOptions, Key, UpgradeTransaction};
use crate::local_storage::LocalStorage;
use crate::vocab::{VocabEntry, VocabRepository};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const FAVORITES_DB_NAME: &str = "VocabFavoritesDB";
pub const FAVORITES_DB_VERSION: u32 = 1;
pub const FAVORITES_STORE: &str = "favorites";
pub const FALLBACK_KEY: &str = "vocab_favorites";

/// How the backend is picked at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FavoritesMode {
    /// Structured store when it opens, flat list otherwise.
    #[default]
    Auto,
    Structured,
    FlatList,
}

#[derive(Clone, Debug)]
pub enum FavoritesBackend {
    Structured(Database),
    FlatList(LocalStorage),
}

fn upgrade(tx: &UpgradeTransaction<'_>, _old: u32, _new: u32) -> Result<(), Error> {
    if !tx.contains_object_store(FAVORITES_STORE)? {
        tx.create_object_store(FAVORITES_STORE, "word")?;
        tx.create_index(FAVORITES_STORE, "timestamp", "timestamp", IndexOptions::default())?;
        tx.create_index(FAVORITES_STORE, "tags", "tags", IndexOptions { unique: false, multi_entry: true })?;
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct FavoritesRepository {
    backend: FavoritesBackend,
}

impl FavoritesRepository {
    /// Pick the backend for `mode`, probing the structured store at `path`
    /// in `Auto` mode.
    ///
    /// Only a forced `Structured` mode surfaces an open failure.
    pub async fn open(path: impl AsRef<Path>, local: LocalStorage, mode: FavoritesMode) -> Result<Self, Error> {
        let backend = match mode {
            FavoritesMode::FlatList => FavoritesBackend::FlatList(local),
            FavoritesMode::Structured => {
                FavoritesBackend::Structured(Database::open(path, FAVORITES_DB_NAME, FAVORITES_DB_VERSION, upgrade).await?)
            }
            FavoritesMode::Auto => {
                match Database::open(path.as_ref(), FAVORITES_DB_NAME, FAVORITES_DB_VERSION, upgrade).await {
                    Ok(db) => FavoritesBackend::Structured(db),
                    Err(e) => {
                        tracing::warn!(error = %e, "favorites store unavailable, using flat list");
                        FavoritesBackend::FlatList(local)
                    }
                }
            }
        };
        Ok(Self { backend })
    }

    /// Structured backend over an in-memory database, for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let db = Database::open_in_memory(FAVORITES_DB_NAME, FAVORITES_DB_VERSION, upgrade).await?;
        Ok(Self { backend: FavoritesBackend::Structured(db) })
    }

    pub fn flat_list(local: LocalStorage) -> Self {
        Self { backend: FavoritesBackend::FlatList(local) }
    }

    pub fn backend(&self) -> &FavoritesBackend {
        &self.backend
    }

    /// Whether the structured store backs this repository.
    pub fn is_supported(&self) -> bool {
        matches!(self.backend, FavoritesBackend::Structured(_))
    }

    /// Upsert a favorite, stamping it with the current time when it has none.
    pub async fn save(&self, mut entry: FavoriteEntry) -> Result<FavoriteEntry, Error> {
        if entry.word.is_empty() {
            return Err(Error::InvalidInput("favorite word id must not be empty".into()));
        }
        if entry.timestamp.is_none() {
            entry.timestamp = Some(chrono::Utc::now().timestamp_millis());
        }
        match &self.backend {
            FavoritesBackend::Structured(db) => {
                db.put(FAVORITES_STORE, serde_json::to_value(&entry)?).await?;
            }
            FavoritesBackend::FlatList(local) => {
                let mut ids = read_list(local).await?;
                if !ids.contains(&entry.word) {
                    ids.push(entry.word.clone());
                    local.set_json(FALLBACK_KEY, &ids).await?;
                }
            }
        }
        Ok(entry)
    }

    pub async fn get(&self, id: &str) -> Result<Option<FavoriteEntry>, Error> {
        match &self.backend {
            FavoritesBackend::Structured(db) => db
                .get(FAVORITES_STORE, id)
                .await?
                .map(|v| serde_json::from_value(v).map_err(Error::from))
                .transpose(),
            FavoritesBackend::FlatList(local) => {
                Ok(read_list(local).await?.into_iter().find(|w| w == id).map(FavoriteEntry::bare))
            }
        }
    }

    /// Every favorite, newest first.
    pub async fn get_all(&self) -> Result<Vec<FavoriteEntry>, Error> {
        match &self.backend {
            FavoritesBackend::Structured(db) => db
                .cursor(FAVORITES_STORE, Some("timestamp"), None, Direction::Prev)
                .await?
                .into_iter()
                .map(|record| serde_json::from_value(record.value).map_err(Error::from))
                .collect(),
            FavoritesBackend::FlatList(local) => {
                Ok(read_list(local).await?.into_iter().rev().map(FavoriteEntry::bare).collect())
            }
        }
    }

    /// Remove a favorite. Returns false when it was not present.
    pub async fn delete(&self, id: &str) -> Result<bool, Error> {
        match &self.backend {
            FavoritesBackend::Structured(db) => db.delete(FAVORITES_STORE, id).await,
            FavoritesBackend::FlatList(local) => {
                let mut ids = read_list(local).await?;
                let before = ids.len();
                ids.retain(|w| w != id);
                local.set_json(FALLBACK_KEY, &ids).await?;
                Ok(ids.len() != before)
            }
        }
    }

    /// Favorited ids, newest first.
    pub async fn ids(&self) -> Result<Vec<String>, Error> {
        Ok(self.get_all().await?.into_iter().map(|f| f.word).collect())
    }

    pub async fn is_favorite(&self, id: &str) -> Result<bool, Error> {
        Ok(self.get(id).await?.is_some())
    }

    pub async fn add(&self, word: &VocabEntry, translation: Option<&str>) -> Result<FavoriteEntry, Error> {
        self.save(FavoriteEntry::from_vocab(word, translation)).await
    }

    pub async fn remove(&self, id: &str) -> Result<bool, Error> {
        self.delete(id).await
    }

    /// Flip the favorite state of `word`. Returns the new state.
    pub async fn toggle(&self, word: &VocabEntry, translation: Option<&str>) -> Result<bool, Error> {
        let id = word.id.to_string_key();
        if self.is_favorite(&id).await? {
            self.remove(&id).await?;
            Ok(false)
        } else {
            self.add(word, translation).await?;
            Ok(true)
        }
    }

    /// Vocabulary entries for every favorite, newest first, skipping ids
    /// whose word no longer exists.
    pub async fn resolve(&self, vocab: &VocabRepository) -> Result<Vec<VocabEntry>, Error> {
        let mut words = Vec::new();
        for id in self.ids().await? {
            let numeric = id.parse::<i64>().ok().map(Key::Int);
            let mut found = None;
            for key in numeric.into_iter().chain([Key::Text(id.clone())]) {
                found = vocab.get_by_id(key).await?;
                if found.is_some() {
                    break;
                }
            }
            match found {
                Some(word) => words.push(word),
                None => tracing::debug!(id, "dropping favorite without a vocabulary entry"),
            }
        }
        Ok(words)
    }

    /// Every favorite as a pretty-printed JSON array.
    pub async fn export_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(&self.get_all().await?)?)
    }
}

/// Flat list ids as strings; numbers from older lists are stringified.
async fn read_list(local: &LocalStorage) -> Result<Vec<String>, Error> {
    let raw: Vec<Value> = local.get_json(FALLBACK_KEY).await?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn word(id: i64, chinese: &str, english: &str) -> VocabEntry {
        VocabEntry::from_record(json!({"ID": id, "chinese_cn": chinese, "pinyin": "", "english_en": english})).unwrap()
    }

    fn stamped(id: &str, timestamp: i64) -> FavoriteEntry {
        FavoriteEntry { timestamp: Some(timestamp), ..FavoriteEntry::bare(id) }
    }

    #[tokio::test]
    async fn test_add_remove_roundtrip() {
        let favorites = FavoritesRepository::open_in_memory().await.unwrap();
        let book = word(12, "书", "book");

        let saved = favorites.add(&book, Some("libro")).await.unwrap();
        assert_eq!(saved.word, "12");
        assert_eq!(saved.translation, "libro");
        assert!(saved.timestamp.is_some());
        assert!(favorites.is_favorite("12").await.unwrap());

        assert!(favorites.remove("12").await.unwrap());
        assert!(!favorites.is_favorite("12").await.unwrap());
        assert!(!favorites.remove("12").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_all_newest_first() {
        let favorites = FavoritesRepository::open_in_memory().await.unwrap();
        favorites.save(stamped("1", 1_000)).await.unwrap();
        favorites.save(stamped("2", 3_000)).await.unwrap();
        favorites.save(stamped("3", 2_000)).await.unwrap();

        let all = favorites.get_all().await.unwrap();
        let stamps: Vec<i64> = all.iter().map(|f| f.timestamp.unwrap()).collect();
        assert_eq!(stamps, vec![3_000, 2_000, 1_000]);
        assert_eq!(favorites.ids().await.unwrap(), vec!["2", "3", "1"]);
    }

    #[tokio::test]
    async fn test_save_keeps_given_timestamp_and_tags() {
        let favorites = FavoritesRepository::open_in_memory().await.unwrap();
        let entry = FavoriteEntry { tags: vec!["food".into()], ..stamped("7", 42) };
        favorites.save(entry.clone()).await.unwrap();
        assert_eq!(favorites.get("7").await.unwrap(), Some(entry));
        assert!(favorites.get("8").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_toggle() {
        let favorites = FavoritesRepository::open_in_memory().await.unwrap();
        let water = word(3, "水", "water");
        assert!(favorites.toggle(&water, None).await.unwrap());
        assert_eq!(favorites.get("3").await.unwrap().unwrap().translation, "water");
        assert!(!favorites.toggle(&water, None).await.unwrap());
        assert!(favorites.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flat_list_backend() {
        let local = LocalStorage::in_memory();
        let favorites = FavoritesRepository::flat_list(local.clone());
        assert!(!favorites.is_supported());

        favorites.add(&word(1, "一", "one"), None).await.unwrap();
        favorites.add(&word(2, "二", "two"), None).await.unwrap();
        favorites.add(&word(1, "一", "one"), None).await.unwrap();
        assert_eq!(local.get_item(FALLBACK_KEY).await.unwrap().as_deref(), Some(r#"["1","2"]"#));
        assert_eq!(favorites.ids().await.unwrap(), vec!["2", "1"]);

        assert!(favorites.remove("1").await.unwrap());
        assert!(!favorites.is_favorite("1").await.unwrap());
        assert!(favorites.is_favorite("2").await.unwrap());
    }

    #[tokio::test]
    async fn test_flat_list_accepts_numeric_ids() {
        let local = LocalStorage::in_memory();
        local.set_item(FALLBACK_KEY, "[5, \"6\"]").await.unwrap();
        let favorites = FavoritesRepository::flat_list(local);
        assert!(favorites.is_favorite("5").await.unwrap());
        assert!(favorites.is_favorite("6").await.unwrap());
    }

    #[tokio::test]
    async fn test_auto_mode_falls_back_to_flat_list() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let favorites = FavoritesRepository::open(blocker.join("fav.sqlite"), LocalStorage::in_memory(), FavoritesMode::Auto)
            .await
            .unwrap();
        assert!(!favorites.is_supported());

        let forced = FavoritesRepository::open(blocker.join("fav.sqlite"), LocalStorage::in_memory(), FavoritesMode::Structured).await;
        assert!(forced.is_err());

        let ok = FavoritesRepository::open(dir.path().join("fav.sqlite"), LocalStorage::in_memory(), FavoritesMode::Auto)
            .await
            .unwrap();
        assert!(ok.is_supported());
    }

    #[tokio::test]
    async fn test_resolve_drops_dangling_ids() {
        let vocab = VocabRepository::initialize_in_memory().await.unwrap();
        vocab
            .bulk_upsert(vec![
                json!({"ID": 1, "chinese_cn": "一", "english_en": "one"}),
                json!({"ID": "a2", "chinese_cn": "二", "english_en": "two"}),
            ])
            .await
            .unwrap();

        let favorites = FavoritesRepository::open_in_memory().await.unwrap();
        favorites.save(stamped("1", 1)).await.unwrap();
        favorites.save(stamped("gone", 2)).await.unwrap();
        favorites.save(stamped("a2", 3)).await.unwrap();

        let words = favorites.resolve(&vocab).await.unwrap();
        let chinese: Vec<&str> = words.iter().map(|w| w.chinese_text.as_str()).collect();
        assert_eq!(chinese, vec!["二", "一"]);
    }
}
