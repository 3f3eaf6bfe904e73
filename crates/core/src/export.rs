//! Dated JSON export files.

use crate::Error;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub const VOCAB_EXPORT_PREFIX: &str = "chinese_vocab";
pub const FAVORITES_EXPORT_PREFIX: &str = "vocab_favorites";

/// `<prefix>_<YYYY-MM-DD>.json`
pub fn export_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}_{}.json", date.format("%Y-%m-%d"))
}

/// Write `contents` to a file named for today's date in `dir`.
pub async fn write_export(dir: &Path, prefix: &str, contents: &str) -> Result<PathBuf, Error> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(export_file_name(prefix, chrono::Local::now().date_naive()));
    tokio::fs::write(&path, contents).await?;
    tracing::info!(path = %path.display(), bytes = contents.len(), "export written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_file_name(VOCAB_EXPORT_PREFIX, date), "chinese_vocab_2024-03-09.json");
        assert_eq!(export_file_name(FAVORITES_EXPORT_PREFIX, date), "vocab_favorites_2024-03-09.json");
    }

    #[tokio::test]
    async fn test_write_export_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        let path = write_export(&target, FAVORITES_EXPORT_PREFIX, "[]").await.unwrap();
        assert!(path.starts_with(&target));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("vocab_favorites_"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "[]");
    }
}
