//! The `words` object store of `ChineseVocabDB`.

use super::entry::VocabEntry;
use super::search::{Filter, Query, SearchCriteria};
use crate::Error;
use crate::kv::{BulkWriteResult, Database, IndexOptions, Key, KeyRange, UpgradeTransaction};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

pub const VOCAB_DB_NAME: &str = "ChineseVocabDB";
pub const VOCAB_DB_VERSION: u32 = 2;
pub const WORDS_STORE: &str = "words";

const INDEXED_FIELDS: [&str; 6] = ["hsk_level", "word_count", "is_premium", "chinese_cn", "pinyin", "pinyin_no_tone"];

/// Drop and recreate `words` with the full index set on every version bump.
fn upgrade(tx: &UpgradeTransaction<'_>, old: u32, new: u32) -> Result<(), Error> {
    if tx.contains_object_store(WORDS_STORE)? {
        tracing::info!(old, new, "recreating words store, existing vocabulary is discarded");
        tx.delete_object_store(WORDS_STORE)?;
    }
    tx.create_object_store(WORDS_STORE, "ID")?;
    for field in INDEXED_FIELDS {
        tx.create_index(WORDS_STORE, field, field, IndexOptions::default())?;
    }
    Ok(())
}

/// Vocabulary repository.
#[derive(Clone, Debug)]
pub struct VocabRepository {
    db: Database,
}

impl VocabRepository {
    /// Open (or create) the vocabulary database at `path`.
    pub async fn initialize(path: impl AsRef<Path>) -> Result<Self, Error> {
        let db = Database::open(path, VOCAB_DB_NAME, VOCAB_DB_VERSION, upgrade).await?;
        Ok(Self { db })
    }

    pub async fn initialize_in_memory() -> Result<Self, Error> {
        let db = Database::open_in_memory(VOCAB_DB_NAME, VOCAB_DB_VERSION, upgrade).await?;
        Ok(Self { db })
    }

    /// Open the store at `path`, or degrade to an in-memory store holding
    /// only the placeholder entry when it cannot be opened.
    ///
    /// The second value is false in the degraded case.
    pub async fn initialize_or_placeholder(path: impl AsRef<Path>) -> Result<(Self, bool), Error> {
        match Self::initialize(path.as_ref()).await {
            Ok(repo) => Ok((repo, true)),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.as_ref().display(), "vocabulary store unavailable, serving placeholder");
                let repo = Self::initialize_in_memory().await?;
                repo.bulk_upsert(vec![serde_json::to_value(VocabEntry::placeholder())?]).await?;
                Ok((repo, false))
            }
        }
    }

    /// Write every record in one transaction.
    ///
    /// Records that do not decode, lack an `ID`, or state a word count that
    /// disagrees with the headword are counted as failed.
    pub async fn bulk_upsert(&self, records: Vec<Value>) -> Result<BulkWriteResult, Error> {
        let total = records.len();
        let mut rejected = 0;
        let mut valid = Vec::with_capacity(total);
        for record in records {
            match VocabEntry::from_record(record).and_then(|e| Ok(serde_json::to_value(e)?)) {
                Ok(value) => valid.push(value),
                Err(e) => {
                    tracing::debug!(error = %e, "rejecting vocabulary record");
                    rejected += 1;
                }
            }
        }

        let mut result = self.db.put_all(WORDS_STORE, valid).await?;
        result.failed += rejected;
        if result.failed > 0 {
            tracing::warn!(succeeded = result.succeeded, failed = result.failed, "bulk upsert had failures");
        }
        Ok(result)
    }

    pub async fn get_by_id(&self, id: impl Into<Key>) -> Result<Option<VocabEntry>, Error> {
        self.db
            .get(WORDS_STORE, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Point lookups for several ids, in request order; duplicates and
    /// missing ids are skipped.
    pub async fn get_by_ids(&self, ids: &[Key]) -> Result<Vec<VocabEntry>, Error> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            if let Some(entry) = self.get_by_id(id.clone()).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Every entry in key order.
    pub async fn get_all(&self) -> Result<Vec<VocabEntry>, Error> {
        self.db
            .get_all(WORDS_STORE, None, None)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn count(&self) -> Result<usize, Error> {
        self.db.count(WORDS_STORE, None).await
    }

    pub async fn has_data(&self) -> Result<bool, Error> {
        Ok(self.count().await? > 0)
    }

    pub async fn clear(&self) -> Result<(), Error> {
        self.db.clear(WORDS_STORE).await
    }

    /// Filtered, text-matched entries in key order.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<VocabEntry>, Error> {
        let candidates = match (criteria.hsk_level, criteria.word_count) {
            (Filter::Only(level), _) => {
                self.db
                    .get_all(WORDS_STORE, Some("hsk_level"), Some(KeyRange::only(i64::from(level))))
                    .await?
            }
            (Filter::All, Filter::Only(count)) => {
                self.db
                    .get_all(WORDS_STORE, Some("word_count"), Some(KeyRange::only(i64::from(count))))
                    .await?
            }
            (Filter::All, Filter::All) => self.db.get_all(WORDS_STORE, None, None).await?,
        };

        let query = Query::classify(&criteria.text);
        let mut results = Vec::new();
        for value in candidates {
            let entry = decode(value)?;
            if !criteria.passes_filters(&entry) {
                continue;
            }
            if query.as_ref().is_none_or(|q| q.matches(&entry)) {
                results.push(entry);
            }
        }

        tracing::debug!(text = %criteria.text, query = ?query.as_ref().map(kind_name), results = results.len(), "search");
        Ok(results)
    }

    /// Every entry as a pretty-printed JSON array.
    pub async fn export_json(&self) -> Result<String, Error> {
        let entries = self.get_all().await?;
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}

fn decode(value: Value) -> Result<VocabEntry, Error> {
    serde_json::from_value(value).map_err(Error::from)
}

fn kind_name(query: &Query) -> &'static str {
    match query {
        Query::Numeral(_) => "numeral",
        Query::Ideograph(_) => "ideograph",
        Query::Phonetic(_) => "phonetic",
        Query::Translation(_) => "translation",
    }
}
