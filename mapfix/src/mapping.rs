//! Mapping file data model and column-name sanitization

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Source fields that identify the origin column; everything else is
/// engine-specific noise and gets dropped during normalization.
pub const SOURCE_ID_FIELDS: [&str; 2] = ["name", "path"];

/// Errors that can occur while reading or normalizing a mapping file
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("mapping {index} in {path} has neither a source name nor a source path")]
    MissingSourceColumn { path: PathBuf, index: usize },

    #[error("mapping {index} in {path} has no sink name; run `mapfix fix` first")]
    MissingSink { path: PathBuf, index: usize },
}

/// A mapping definition file: a list of column mappings plus whatever
/// other top-level keys the pipeline engine put there. Unknown keys must
/// survive a rewrite untouched, though they serialize after `mappings`
/// regardless of where a hand-edited file placed them; the canonical
/// layout is part of what `fix` normalizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingFile {
    pub mappings: Vec<ColumnMapping>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One source column routed to one sink column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Source descriptor. After normalization only `name` or `path` remains.
    pub source: Map<String, Value>,

    /// Sink descriptor, derived from the source identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<SinkColumn>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sink descriptor. Canonically a single `name` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkColumn {
    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SinkColumn {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Map::new(),
        }
    }
}

impl ColumnMapping {
    /// The source identifier used to derive the sink name: `name` wins,
    /// `path` is the fallback.
    pub fn source_identifier(&self) -> Option<&str> {
        self.source
            .get("name")
            .or_else(|| self.source.get("path"))
            .and_then(Value::as_str)
    }

    /// Source column name, if the descriptor carries one. Used by the
    /// redundancy warning; `path` is deliberately not considered.
    pub fn source_name(&self) -> Option<&str> {
        self.source.get("name").and_then(Value::as_str)
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Characters Parquet column names cannot carry: ,;{}()= and whitespace
    RE.get_or_init(|| Regex::new(r"[,;{}()=\s]+").expect("valid literal regex"))
}

/// Collapse every run of Parquet-unsafe characters to a single underscore.
///
/// Idempotent: sanitizing an already-sanitized name is a no-op.
pub fn sanitize_column_name(name: &str) -> String {
    unsafe_chars().replace_all(name, "_").into_owned()
}

/// Whether a name is already safe for the sink format
pub fn is_sanitized(name: &str) -> bool {
    !unsafe_chars().is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_collapses_runs() {
        // Semicolon + space collapse to a single underscore
        assert_eq!(sanitize_column_name("Order; Qty"), "Order__Qty");
    }

    #[test]
    fn test_sanitize_handles_each_unsafe_char() {
        assert_eq!(sanitize_column_name("a,b"), "a_b");
        assert_eq!(sanitize_column_name("a;b"), "a_b");
        assert_eq!(sanitize_column_name("a{b}c"), "a_b_c");
        assert_eq!(sanitize_column_name("a(b)c"), "a_b_c");
        assert_eq!(sanitize_column_name("a=b"), "a_b");
        assert_eq!(sanitize_column_name("a\tb c"), "a_b_c");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize_column_name("Total {Gross} Amount");
        let twice = sanitize_column_name(&once);
        assert_eq!(once, twice);
        assert!(is_sanitized(&once));
    }

    #[test]
    fn test_sanitize_leaves_safe_names_alone() {
        assert_eq!(sanitize_column_name("order_qty"), "order_qty");
        assert_eq!(sanitize_column_name("OrderQty123"), "OrderQty123");
    }

    #[test]
    fn test_source_identifier_prefers_name() {
        let mapping: ColumnMapping = serde_json::from_value(serde_json::json!({
            "source": {"name": "col_a", "path": "$.col_a"}
        }))
        .unwrap();
        assert_eq!(mapping.source_identifier(), Some("col_a"));
    }

    #[test]
    fn test_source_identifier_falls_back_to_path() {
        let mapping: ColumnMapping = serde_json::from_value(serde_json::json!({
            "source": {"path": "$.col_a"}
        }))
        .unwrap();
        assert_eq!(mapping.source_identifier(), Some("$.col_a"));
        assert_eq!(mapping.source_name(), None);
    }

    #[test]
    fn test_extra_keys_round_trip() {
        let raw = serde_json::json!({
            "name": "orders",
            "mappings": [{
                "source": {"name": "a"},
                "sink": {"name": "a"},
                "format": "string"
            }]
        });
        let file: MappingFile = serde_json::from_value(raw).unwrap();
        assert_eq!(file.extra.get("name").and_then(Value::as_str), Some("orders"));
        assert_eq!(
            file.mappings[0].extra.get("format").and_then(Value::as_str),
            Some("string")
        );

        let back = serde_json::to_value(&file).unwrap();
        assert_eq!(back["name"], "orders");
        assert_eq!(back["mappings"][0]["format"], "string");
    }
}
