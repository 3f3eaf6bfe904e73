//! Vocabulary record model and dataset shape checks.

use crate::Error;
use crate::kv::Key;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Translation locales, in the order search tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    English,
    Vietnamese,
    Spanish,
    Hindi,
    Korean,
    Japanese,
    German,
    French,
    Russian,
    Thai,
    Malay,
    Indonesian,
}

impl Locale {
    pub const ALL: [Locale; 12] = [
        Locale::English,
        Locale::Vietnamese,
        Locale::Spanish,
        Locale::Hindi,
        Locale::Korean,
        Locale::Japanese,
        Locale::German,
        Locale::French,
        Locale::Russian,
        Locale::Thai,
        Locale::Malay,
        Locale::Indonesian,
    ];

    /// Record field holding this locale's translation.
    pub fn field(self) -> &'static str {
        match self {
            Locale::English => "english_en",
            Locale::Vietnamese => "vietnamese_vn",
            Locale::Spanish => "spanish_es",
            Locale::Hindi => "hindi_hi",
            Locale::Korean => "korean_kr",
            Locale::Japanese => "japanese_ja",
            Locale::German => "german_de",
            Locale::French => "french_fr",
            Locale::Russian => "russian_ru",
            Locale::Thai => "thai_th",
            Locale::Malay => "malay_my",
            Locale::Indonesian => "indonesian_id",
        }
    }
}

/// Per-locale translations, one optional wire field each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Translations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vietnamese_vn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spanish_es: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hindi_hi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub korean_kr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub japanese_ja: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub german_de: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub french_fr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub russian_ru: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thai_th: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub malay_my: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indonesian_id: Option<String>,
}

impl Translations {
    pub fn get(&self, locale: Locale) -> Option<&str> {
        let value = match locale {
            Locale::English => &self.english_en,
            Locale::Vietnamese => &self.vietnamese_vn,
            Locale::Spanish => &self.spanish_es,
            Locale::Hindi => &self.hindi_hi,
            Locale::Korean => &self.korean_kr,
            Locale::Japanese => &self.japanese_ja,
            Locale::German => &self.german_de,
            Locale::French => &self.french_fr,
            Locale::Russian => &self.russian_ru,
            Locale::Thai => &self.thai_th,
            Locale::Malay => &self.malay_my,
            Locale::Indonesian => &self.indonesian_id,
        };
        value.as_deref()
    }

    /// Non-empty translations in search order.
    pub fn iter(&self) -> impl Iterator<Item = (Locale, &str)> {
        Locale::ALL
            .into_iter()
            .filter_map(|locale| self.get(locale).filter(|t| !t.is_empty()).map(|t| (locale, t)))
    }
}

/// One vocabulary word as stored in the `words` object store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct VocabEntry {
    #[serde(rename = "ID")]
    pub id: Key,
    #[serde(rename = "chinese_cn")]
    pub chinese_text: String,
    #[serde(default)]
    pub pinyin: String,
    #[serde(default)]
    pub pinyin_no_tone: String,
    #[serde(flatten)]
    pub translations: Translations,
    #[serde(default)]
    pub hsk_level: u8,
    /// Ideograph count; 0 on input means "derive it".
    #[serde(default)]
    pub word_count: u8,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_cn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Value>,
}

impl VocabEntry {
    /// The single record served when no vocabulary store can be opened.
    pub fn placeholder() -> Self {
        Self {
            id: Key::from("default-1"),
            chinese_text: "一".into(),
            pinyin: "yī".into(),
            pinyin_no_tone: "yi".into(),
            translations: Translations { english_en: Some("one".into()), ..Default::default() },
            hsk_level: 1,
            word_count: 1,
            is_premium: false,
            example_cn: None,
            example_en: None,
            category_id: None,
        }
    }

    /// Number of ideographs in the headword.
    pub fn ideograph_count(&self) -> usize {
        self.chinese_text.chars().count()
    }

    /// Fill in a missing word count and reject a stated one that disagrees
    /// with the headword.
    pub fn normalize(mut self) -> Result<Self, Error> {
        if self.chinese_text.is_empty() {
            return Err(Error::Data(format!("entry {} has an empty chinese_cn", self.id)));
        }
        let actual = self.ideograph_count();
        match self.word_count {
            0 => {
                self.word_count = u8::try_from(actual)
                    .map_err(|_| Error::Data(format!("entry {} headword is too long", self.id)))?;
            }
            stated if usize::from(stated) != actual => {
                return Err(Error::Data(format!(
                    "entry {} states word_count {stated} but chinese_cn has {actual} ideographs",
                    self.id
                )));
            }
            _ => {}
        }
        Ok(self)
    }

    /// Decode and normalize a raw record.
    pub fn from_record(record: Value) -> Result<Self, Error> {
        let entry: VocabEntry = serde_json::from_value(record).map_err(|e| Error::Data(e.to_string()))?;
        entry.normalize()
    }
}

/// Minimal shape check on a downloaded or imported dataset.
///
/// Only the first record is inspected: it must carry `ID`, `chinese_cn`
/// and at least one translation field.
pub fn validate_dataset(records: &[Value]) -> Result<(), Error> {
    let first = records
        .first()
        .ok_or_else(|| Error::SchemaValidation("dataset is empty".into()))?;
    let object = first
        .as_object()
        .ok_or_else(|| Error::SchemaValidation("records must be JSON objects".into()))?;

    let present = |field: &str| object.get(field).is_some_and(|v| !v.is_null());
    if !present("ID") {
        return Err(Error::SchemaValidation("missing identifier field (ID)".into()));
    }
    if !present("chinese_cn") {
        return Err(Error::SchemaValidation("missing Chinese text field (chinese_cn)".into()));
    }
    if !Locale::ALL.iter().any(|l| present(l.field())) {
        return Err(Error::SchemaValidation("missing translation field (e.g. english_en)".into()));
    }
    Ok(())
}

/// Parse a dataset document and run the shape check.
pub fn parse_dataset(raw: &str) -> Result<Vec<Value>, Error> {
    let doc: Value = serde_json::from_str(raw)
        .map_err(|e| Error::SchemaValidation(format!("not valid JSON: {e}")))?;
    let Value::Array(records) = doc else {
        return Err(Error::SchemaValidation("dataset must be a JSON array".into()));
    };
    validate_dataset(&records)?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let entry: VocabEntry = serde_json::from_value(json!({
            "ID": 12,
            "chinese_cn": "你好",
            "pinyin": "nǐ hǎo",
            "pinyin_no_tone": "ni hao",
            "english_en": "hello",
            "korean_kr": "안녕하세요",
            "hsk_level": 1,
            "word_count": 2,
            "is_premium": false
        }))
        .unwrap();
        assert_eq!(entry.id, Key::from(12));
        assert_eq!(entry.chinese_text, "你好");
        assert_eq!(entry.translations.get(Locale::Korean), Some("안녕하세요"));

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["ID"], 12);
        assert_eq!(back["chinese_cn"], "你好");
        assert_eq!(back["english_en"], "hello");
        assert!(back.get("vietnamese_vn").is_none());
    }

    #[test]
    fn test_translations_iterate_in_locale_order() {
        let t = Translations {
            french_fr: Some("bonjour".into()),
            english_en: Some("hello".into()),
            spanish_es: Some(String::new()),
            ..Default::default()
        };
        let locales: Vec<Locale> = t.iter().map(|(l, _)| l).collect();
        assert_eq!(locales, vec![Locale::English, Locale::French]);
    }

    #[test]
    fn test_normalize_derives_word_count() {
        let entry = VocabEntry::from_record(json!({"ID": "1", "chinese_cn": "图书馆"})).unwrap();
        assert_eq!(entry.word_count, 3);
    }

    #[test]
    fn test_normalize_rejects_mismatched_word_count() {
        let result = VocabEntry::from_record(json!({"ID": "1", "chinese_cn": "图书馆", "word_count": 2}));
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_from_record_rejects_missing_id() {
        let result = VocabEntry::from_record(json!({"chinese_cn": "书"}));
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_placeholder() {
        let entry = VocabEntry::placeholder();
        assert_eq!(entry.id, Key::from("default-1"));
        assert_eq!(entry.chinese_text, "一");
        assert_eq!(entry.pinyin, "yī");
        assert_eq!(entry.translations.english_en.as_deref(), Some("one"));
        assert_eq!(entry.clone().normalize().unwrap(), entry);
    }

    #[test]
    fn test_validate_dataset_names_missing_category() {
        let err = validate_dataset(&[]).unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = validate_dataset(&[json!({"chinese_cn": "书", "english_en": "book"})]).unwrap_err();
        assert!(err.to_string().contains("identifier"));

        let err = validate_dataset(&[json!({"ID": 1, "english_en": "book"})]).unwrap_err();
        assert!(err.to_string().contains("Chinese text"));

        let err = validate_dataset(&[json!({"ID": 1, "chinese_cn": "书"})]).unwrap_err();
        assert!(err.to_string().contains("translation"));

        assert!(validate_dataset(&[json!({"ID": 1, "chinese_cn": "书", "thai_th": "หนังสือ"})]).is_ok());
    }

    #[test]
    fn test_parse_dataset_requires_array() {
        assert!(matches!(parse_dataset("{\"ID\": 1}"), Err(Error::SchemaValidation(_))));
        assert!(matches!(parse_dataset("not json"), Err(Error::SchemaValidation(_))));
        let records = parse_dataset(r#"[{"ID": 1, "chinese_cn": "书", "english_en": "book"}, {}]"#).unwrap();
        assert_eq!(records.len(), 2);
    }
}
