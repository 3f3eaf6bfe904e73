//! Search criteria, query classification and per-record matching.
//!
//! A query is classified exactly once:
//!
//! | Query                 | Kind        | Matches against                           |
//! |-----------------------|-------------|-------------------------------------------|
//! | `"0"`..`"10"`         | Numeral     | `chinese_cn` contains the numeral         |
//! | contains an ideograph | Ideograph   | `chinese_cn` contains the query           |
//! | latin letters/spaces  | Phonetic    | `pinyin` / `pinyin_no_tone` syllables     |
//! | anything else         | Translation | whole-word match in the locale fields     |

use super::entry::VocabEntry;
use crate::Error;
use regex::Regex;
use std::str::FromStr;

const NUMERALS: [(&str, char); 11] = [
    ("0", '零'),
    ("1", '一'),
    ("2", '二'),
    ("3", '三'),
    ("4", '四'),
    ("5", '五'),
    ("6", '六'),
    ("7", '七'),
    ("8", '八'),
    ("9", '九'),
    ("10", '十'),
];

/// Equality filter on a small integer field, or no filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Only(u8),
}

impl Filter {
    pub fn accepts(self, value: u8) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(wanted) => wanted == value,
        }
    }
}

impl From<u8> for Filter {
    fn from(value: u8) -> Self {
        Filter::Only(value)
    }
}

impl FromStr for Filter {
    type Err = Error;

    /// `"all"` (or blank) disables the filter; anything else must be a number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Filter::All);
        }
        s.parse::<u8>()
            .map(Filter::Only)
            .map_err(|_| Error::InvalidInput(format!("expected a number or \"all\", got '{s}'")))
    }
}

/// Criteria for [`super::VocabRepository::search`].
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub text: String,
    pub hsk_level: Filter,
    pub word_count: Filter,
    pub hide_premium: bool,
}

impl SearchCriteria {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    /// Whether an entry passes the non-text filters.
    pub fn passes_filters(&self, entry: &VocabEntry) -> bool {
        self.hsk_level.accepts(entry.hsk_level)
            && self.word_count.accepts(entry.word_count)
            && !(self.hide_premium && entry.is_premium)
    }
}

/// How a non-empty query is matched.
#[derive(Debug, Clone)]
pub enum Query {
    /// Exactly `"0"`..`"10"` mapped to its numeral; `None` for other digit strings
    /// (`"01"` and `"007"` included).
    Numeral(Option<char>),
    Ideograph(String),
    /// Tone-stripped syllables.
    Phonetic(Vec<String>),
    Translation(Option<Regex>),
}

impl Query {
    /// Classify a query. Returns `None` for blank text.
    pub fn classify(text: &str) -> Option<Query> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let query = if text.chars().all(|c| c.is_ascii_digit()) {
            Query::Numeral(NUMERALS.iter().find(|(digits, _)| *digits == text).map(|(_, numeral)| *numeral))
        } else if text.chars().any(is_ideograph) {
            Query::Ideograph(text.to_string())
        } else if text.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '\'') {
            Query::Phonetic(syllables(text))
        } else {
            Query::Translation(whole_word(text))
        };
        Some(query)
    }

    pub fn matches(&self, entry: &VocabEntry) -> bool {
        match self {
            Query::Numeral(Some(numeral)) => entry.chinese_text.contains(*numeral),
            Query::Numeral(None) => false,
            Query::Ideograph(text) => entry.chinese_text.contains(text.as_str()),
            Query::Phonetic(query) => {
                phonetic_match(query, &syllables(&entry.pinyin))
                    || phonetic_match(query, &syllables(&entry.pinyin_no_tone))
            }
            Query::Translation(re) => re.as_ref().is_some_and(|re| translation_match(re, entry)),
        }
    }
}

/// CJK Unified Ideographs block.
pub fn is_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Lowercase, split on whitespace, strip tone marks and tone digits 1-5.
pub fn syllables(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|s| {
            unidecode::unidecode(&s.to_lowercase())
                .chars()
                .filter(|c| !('1'..='5').contains(c))
                .collect::<String>()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// A multi-syllable query must be a syllable-wise prefix of the candidate;
/// a single syllable must equal any one candidate syllable.
pub fn phonetic_match(query: &[String], candidate: &[String]) -> bool {
    match query {
        [] => false,
        [single] => candidate.iter().any(|s| s == single),
        _ => query.len() <= candidate.len() && candidate.iter().zip(query).all(|(c, q)| c == q),
    }
}

fn whole_word(text: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&text.to_lowercase()))).ok()
}

fn translation_match(re: &Regex, entry: &VocabEntry) -> bool {
    entry.translations.iter().any(|(_, text)| re.is_match(text))
}
