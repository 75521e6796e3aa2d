//! Drift re-check for already-normalized mapping files
//!
//! Recomputes the sanitized sink name for every mapping and rewrites the
//! file when the stored name drifted. A rewrite is a validation failure:
//! the CI gate forces the fix to be committed before the check passes.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::mapping::{MappingError, sanitize_column_name};
use crate::normalize;

/// Outcome of validating a single mapping file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,

    /// The file held an unsafe sink name and was rewritten
    pub fixed: bool,

    /// Sink names that equal their source name exactly; such mappings are
    /// probably redundant. Informational only.
    pub redundant: Vec<String>,
}

impl FileReport {
    /// A validation error forces a non-zero exit from the check run
    pub fn is_validation_error(&self) -> bool {
        self.fixed
    }
}

/// Validate one mapping file, rewriting it in place if any sink name was
/// not sanitized.
pub fn validate_file(path: &Path) -> Result<FileReport, MappingError> {
    debug!(path = %path.display(), "validate_file: called");
    let content = fs::read_to_string(path).map_err(|source| MappingError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut file = normalize::parse(path, &content)?;

    let mut fixed = false;
    let mut redundant = Vec::new();

    for (index, mapping) in file.mappings.iter_mut().enumerate() {
        let Some(sink) = mapping.sink.as_mut() else {
            return Err(MappingError::MissingSink {
                path: path.to_path_buf(),
                index,
            });
        };

        let safe_name = sanitize_column_name(&sink.name);
        if safe_name != sink.name {
            debug!(index, from = %sink.name, to = %safe_name, "validate_file: sink name drifted");
            sink.name = safe_name;
            fixed = true;
        }

        // Only the source *name* counts here; a path-derived sink always
        // differs from a missing source name and draws no warning.
        if mapping.source.get("name").and_then(|v| v.as_str()) == Some(sink.name.as_str()) {
            redundant.push(sink.name.clone());
        }
    }

    if fixed {
        let mut rendered = serde_json::to_string_pretty(&file).map_err(|source| MappingError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        rendered.push('\n');
        fs::write(path, rendered).map_err(|source| MappingError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    Ok(FileReport {
        path: path.to_path_buf(),
        fixed,
        redundant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(value: serde_json::Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(value.to_string().as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn test_clean_file_passes_without_rewrite() {
        let file = write_temp(serde_json::json!({
            "mappings": [{
                "source": {"name": "Order Qty"},
                "sink": {"name": "Order_Qty"}
            }]
        }));
        let before = fs::read_to_string(file.path()).unwrap();

        let report = validate_file(file.path()).expect("validate should succeed");

        assert!(!report.fixed);
        assert!(report.redundant.is_empty());
        assert_eq!(fs::read_to_string(file.path()).unwrap(), before, "no rewrite");
    }

    #[test]
    fn test_unsafe_sink_name_is_fixed_and_flagged() {
        let file = write_temp(serde_json::json!({
            "mappings": [{
                "source": {"name": "Order; Qty"},
                "sink": {"name": "Order; Qty"}
            }]
        }));

        let report = validate_file(file.path()).expect("validate should succeed");

        assert!(report.fixed);
        assert!(report.is_validation_error());

        let written = fs::read_to_string(file.path()).unwrap();
        assert!(written.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["mappings"][0]["sink"]["name"], "Order__Qty");
    }

    #[test]
    fn test_identical_source_and_sink_names_warn() {
        let file = write_temp(serde_json::json!({
            "mappings": [{
                "source": {"name": "order_qty"},
                "sink": {"name": "order_qty"}
            }]
        }));

        let report = validate_file(file.path()).expect("validate should succeed");

        assert!(!report.fixed, "identical names alone are not a failure");
        assert_eq!(report.redundant, vec!["order_qty".to_string()]);
    }

    #[test]
    fn test_path_sourced_mapping_draws_no_warning() {
        let file = write_temp(serde_json::json!({
            "mappings": [{
                "source": {"path": "$.a"},
                "sink": {"name": "$.a"}
            }]
        }));

        let report = validate_file(file.path()).expect("validate should succeed");
        assert!(report.redundant.is_empty());
    }

    #[test]
    fn test_missing_sink_is_a_data_error() {
        let file = write_temp(serde_json::json!({
            "mappings": [{"source": {"name": "a"}}]
        }));

        let err = validate_file(file.path()).expect_err("must fail");
        assert!(matches!(err, MappingError::MissingSink { index: 0, .. }));
    }
}
