use crate::vocab::VocabEntry;
use serde::{Deserialize, Serialize};

/// A favorited word with a display snapshot taken when it was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FavoriteEntry {
    /// Stringified vocabulary id.
    pub word: String,
    #[serde(default)]
    pub chinese_cn: String,
    #[serde(default)]
    pub pinyin: String,
    #[serde(default)]
    pub english_en: String,
    #[serde(default)]
    pub translation: String,
    /// Milliseconds since the Unix epoch; assigned on save when absent.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FavoriteEntry {
    /// An entry carrying only the id, as kept by the flat-list backend.
    pub fn bare(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            chinese_cn: String::new(),
            pinyin: String::new(),
            english_en: String::new(),
            translation: String::new(),
            timestamp: None,
            tags: Vec::new(),
        }
    }

    /// Snapshot a vocabulary entry. `translation` is the caller's display
    /// language text, falling back to English.
    pub fn from_vocab(entry: &VocabEntry, translation: Option<&str>) -> Self {
        let english = entry.translations.english_en.clone().unwrap_or_default();
        Self {
            word: entry.id.to_string_key(),
            chinese_cn: entry.chinese_text.clone(),
            pinyin: entry.pinyin.clone(),
            translation: translation.map(str::to_string).unwrap_or_else(|| english.clone()),
            english_en: english,
            timestamp: None,
            tags: Vec::new(),
        }
    }
}
