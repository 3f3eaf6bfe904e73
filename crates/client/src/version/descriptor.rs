use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `version.json` as published with each release.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct VersionDescriptor {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub assets: BTreeMap<String, AssetCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<Mappings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AssetCategory {
    #[serde(default)]
    pub files: Vec<AssetFile>,
    #[serde(rename = "updateStrategy", default, skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AssetFile {
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Mappings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_version: Option<String>,
}

impl VersionDescriptor {
    /// Declared strategy of the first category (by name) listing `path`,
    /// either exactly or as a suffix of it.
    pub fn strategy_name(&self, path: &str) -> Option<&str> {
        self.assets
            .values()
            .find(|category| {
                category
                    .files
                    .iter()
                    .any(|f| !f.path.is_empty() && (f.path == path || path.ends_with(&f.path)))
            })
            .map(|category| category.update_strategy.as_deref().unwrap_or("stale-while-revalidate"))
    }

    pub fn cache_version(&self) -> Option<&str> {
        self.mappings
            .as_ref()
            .and_then(|m| m.cache_version.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerates_missing_sections() {
        let descriptor: VersionDescriptor = serde_json::from_str(r#"{"version": "1.0.0"}"#).unwrap();
        assert!(descriptor.assets.is_empty());
        assert!(descriptor.cache_version().is_none());
        assert!(descriptor.strategy_name("/index.html").is_none());
    }

    #[test]
    fn test_category_without_strategy_defaults() {
        let descriptor: VersionDescriptor =
            serde_json::from_str(r#"{"assets": {"fonts": {"files": [{"path": "/fonts/a.woff2"}]}}}"#).unwrap();
        assert_eq!(descriptor.strategy_name("/fonts/a.woff2"), Some("stale-while-revalidate"));
    }

    #[test]
    fn test_empty_cache_version_is_ignored() {
        let descriptor: VersionDescriptor = serde_json::from_str(r#"{"mappings": {"cache_version": ""}}"#).unwrap();
        assert!(descriptor.cache_version().is_none());
    }
}
