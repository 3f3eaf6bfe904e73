//! Record keys, key paths and key ranges.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_rusqlite::rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use tokio_rusqlite::rusqlite::{self};

/// A primary or index key.
///
/// Integers sort before strings, both in Rust (`Ord`) and in SQLite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Text(String),
}

impl Key {
    /// Convert a JSON value usable as a primary key (integral number or string).
    pub fn from_json(value: &Value) -> Option<Key> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)).map(Key::Int),
            Value::String(s) => Some(Key::Text(s.clone())),
            _ => None,
        }
    }

    /// Like [`Key::from_json`], but booleans index as 0/1 so flag fields can
    /// back an index.
    pub fn from_index_json(value: &Value) -> Option<Key> {
        match value {
            Value::Bool(b) => Some(Key::Int(i64::from(*b))),
            other => Key::from_json(other),
        }
    }

    /// Key rendered as a plain string (integers in decimal).
    pub fn to_string_key(&self) -> String {
        match self {
            Key::Int(i) => i.to_string(),
            Key::Text(s) => s.clone(),
        }
    }
}

/// Whole floats inside the `i64` range; anything else is not a valid key.
fn integral(f: f64) -> Option<i64> {
    // 2^63 is exactly representable, so the upper bound is exclusive.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int(i64::from(v))
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Text(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Text(v)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl ToSql for Key {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Key::Int(i) => i.to_sql(),
            Key::Text(s) => s.to_sql(),
        }
    }
}

impl FromSql for Key {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(Key::Int(i)),
            ValueRef::Text(t) => std::str::from_utf8(t)
                .map(|s| Key::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// Resolve a dotted key path (`"a.b"`) inside a JSON document.
pub fn resolve_key_path<'v>(value: &'v Value, key_path: &str) -> Option<&'v Value> {
    key_path
        .split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// Iteration order for cursor walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Next,
    Prev,
}

impl Direction {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Direction::Next => "ASC",
            Direction::Prev => "DESC",
        }
    }
}

/// A contiguous interval of keys with open or closed ends.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyRange {
    pub lower: Option<Key>,
    pub lower_open: bool,
    pub upper: Option<Key>,
    pub upper_open: bool,
}

impl KeyRange {
    /// Exactly one key.
    pub fn only(key: impl Into<Key>) -> Self {
        let key = key.into();
        Self { lower: Some(key.clone()), upper: Some(key), ..Default::default() }
    }

    pub fn lower_bound(key: impl Into<Key>, open: bool) -> Self {
        Self { lower: Some(key.into()), lower_open: open, ..Default::default() }
    }

    pub fn upper_bound(key: impl Into<Key>, open: bool) -> Self {
        Self { upper: Some(key.into()), upper_open: open, ..Default::default() }
    }

    pub fn bound(lower: impl Into<Key>, upper: impl Into<Key>, lower_open: bool, upper_open: bool) -> Self {
        Self { lower: Some(lower.into()), lower_open, upper: Some(upper.into()), upper_open }
    }

    /// Whether `key` falls inside the range.
    pub fn contains(&self, key: &Key) -> bool {
        let above = match &self.lower {
            Some(lower) if self.lower_open => key > lower,
            Some(lower) => key >= lower,
            None => true,
        };
        let below = match &self.upper {
            Some(upper) if self.upper_open => key < upper,
            Some(upper) => key <= upper,
            None => true,
        };
        above && below
    }

    /// SQL predicate over `column` using anonymous placeholders, plus the
    /// values to bind in order.
    pub(crate) fn sql_clause(&self, column: &str) -> (String, Vec<Key>) {
        let mut clauses = Vec::new();
        let mut binds = Vec::new();
        if let Some(lower) = &self.lower {
            clauses.push(format!("{column} {} ?", if self.lower_open { ">" } else { ">=" }));
            binds.push(lower.clone());
        }
        if let Some(upper) = &self.upper {
            clauses.push(format!("{column} {} ?", if self.upper_open { "<" } else { "<=" }));
            binds.push(upper.clone());
        }
        if clauses.is_empty() {
            ("1 = 1".to_string(), binds)
        } else {
            (clauses.join(" AND "), binds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_from_json() {
        assert_eq!(Key::from_json(&json!(12)), Some(Key::Int(12)));
        assert_eq!(Key::from_json(&json!(3.0)), Some(Key::Int(3)));
        assert_eq!(Key::from_json(&json!("12")), Some(Key::Text("12".into())));
        assert_eq!(Key::from_json(&json!(1.5)), None);
        assert_eq!(Key::from_json(&json!(true)), None);
        assert_eq!(Key::from_json(&json!(null)), None);
        assert_eq!(Key::from_index_json(&json!(true)), Some(Key::Int(1)));
    }

    #[test]
    fn test_float_keys_outside_i64_are_rejected() {
        assert_eq!(Key::from_json(&json!(u64::MAX)), None);
        assert_eq!(Key::from_json(&json!(1e300)), None);
        assert_eq!(Key::from_json(&json!(-1e19)), None);
        assert_eq!(Key::from_json(&json!(9_223_372_036_854_775_808.0_f64)), None);
        assert_eq!(Key::from_json(&json!(-9_223_372_036_854_775_808.0_f64)), Some(Key::Int(i64::MIN)));
        assert_eq!(Key::from_json(&json!(i64::MAX)), Some(Key::Int(i64::MAX)));
        assert_eq!(Key::from_json(&json!(-0.25)), None);
    }

    #[test]
    fn test_integers_sort_before_strings() {
        let mut keys = vec![Key::from("10"), Key::from(2), Key::from("1"), Key::from(10)];
        keys.sort();
        assert_eq!(keys, vec![Key::from(2), Key::from(10), Key::from("1"), Key::from("10")]);
    }

    #[test]
    fn test_resolve_key_path() {
        let doc = json!({"ID": 7, "meta": {"level": 3}});
        assert_eq!(resolve_key_path(&doc, "ID"), Some(&json!(7)));
        assert_eq!(resolve_key_path(&doc, "meta.level"), Some(&json!(3)));
        assert_eq!(resolve_key_path(&doc, "meta.missing"), None);
        assert_eq!(resolve_key_path(&json!([1]), "ID"), None);
    }

    #[test]
    fn test_range_contains() {
        let range = KeyRange::bound(2, 5, false, true);
        assert!(!range.contains(&Key::from(1)));
        assert!(range.contains(&Key::from(2)));
        assert!(range.contains(&Key::from(4)));
        assert!(!range.contains(&Key::from(5)));

        assert!(KeyRange::only("a").contains(&Key::from("a")));
        assert!(!KeyRange::only("a").contains(&Key::from("b")));
        assert!(KeyRange::lower_bound(3, true).contains(&Key::from("x")));
    }

    #[test]
    fn test_range_sql_clause() {
        let (sql, binds) = KeyRange::bound(1, 9, true, false).sql_clause("key");
        assert_eq!(sql, "key > ? AND key <= ?");
        assert_eq!(binds, vec![Key::from(1), Key::from(9)]);

        let (sql, binds) = KeyRange::default().sql_clause("key");
        assert_eq!(sql, "1 = 1");
        assert!(binds.is_empty());
    }
}
