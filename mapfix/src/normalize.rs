//! In-place normalization of mapping files
//!
//! Restricts each source descriptor to its identifying field, derives a
//! Parquet-safe sink name from it, and rewrites the file in the canonical
//! readable layout. The rewrite is deterministic, so running it twice
//! produces byte-identical output the second time.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::mapping::{MappingError, MappingFile, SOURCE_ID_FIELDS, SinkColumn, sanitize_column_name};

/// Normalize one mapping file and overwrite it in place.
///
/// Not transactional: an interrupted write can leave a partial file. The
/// operational contract is that the fix run is idempotent and re-run on CI.
pub fn normalize_file(path: &Path) -> Result<(), MappingError> {
    debug!(path = %path.display(), "normalize_file: called");
    let content = fs::read_to_string(path).map_err(|source| MappingError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut file: MappingFile = serde_json::from_str(&content).map_err(|source| MappingError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    normalize_mappings(&mut file).map_err(|index| MappingError::MissingSourceColumn {
        path: path.to_path_buf(),
        index,
    })?;

    let rendered = render(&file).map_err(|source| MappingError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, rendered).map_err(|source| MappingError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply the source restriction and sink derivation to every mapping.
///
/// On error returns the index of the offending mapping.
pub fn normalize_mappings(file: &mut MappingFile) -> Result<(), usize> {
    for (index, mapping) in file.mappings.iter_mut().enumerate() {
        // Source keeps only name or path
        mapping.source.retain(|key, _| SOURCE_ID_FIELDS.contains(&key.as_str()));

        let sink_name = mapping
            .source_identifier()
            .map(sanitize_column_name)
            .ok_or(index)?;
        debug!(index, %sink_name, "normalize_mappings: derived sink name");

        mapping.sink = Some(SinkColumn::named(sink_name));
    }
    Ok(())
}

/// Serialize a mapping file in the canonical layout: pretty-printed with
/// single-field `{"name": ...}` / `{"path": ...}` objects reflowed onto one
/// line, trailing newline guaranteed.
pub fn render(file: &MappingFile) -> Result<String, serde_json::Error> {
    let pretty = serde_json::to_string_pretty(file)?;
    Ok(reflow_single_field_objects(&pretty))
}

fn name_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s*\{\s*"name":\s*"([^"]*)"\s*\}"#).expect("valid literal regex"))
}

fn path_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\s*\{\s*"path":\s*"([^"]*)"\s*\}"#).expect("valid literal regex"))
}

/// Cosmetic reflow: the pretty printer spreads `{"name": "..."}` across
/// three lines, which makes mapping files painful to review. Pull those
/// objects back onto the line of the key they belong to.
pub fn reflow_single_field_objects(json: &str) -> String {
    let reflowed = name_object().replace_all(json, r#" {"name": "$1"}"#);
    let reflowed = path_object().replace_all(&reflowed, r#" {"path": "$1"}"#);
    format!("{}\n", reflowed)
}

/// Parse arbitrary JSON text as a mapping file. Shared by the validator.
pub fn parse(path: &Path, content: &str) -> Result<MappingFile, MappingError> {
    serde_json::from_str(content).map_err(|source| MappingError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
