//! Vocabulary storage and multi-field search.

pub mod entry;
pub mod repository;
pub mod search;

pub use entry::{Locale, Translations, VocabEntry, parse_dataset, validate_dataset};
pub use repository::{VOCAB_DB_NAME, VOCAB_DB_VERSION, VocabRepository, WORDS_STORE};
pub use search::{Filter, Query, SearchCriteria};
