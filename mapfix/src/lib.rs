//! mapfix - column mapping file normalizer and validator
//!
//! Mapping files configure column movement between a source dataset and a
//! columnar sink. `fix` rewrites each file into the canonical shape (source
//! restricted to its identifying field, sink name sanitized for Parquet);
//! `check` re-verifies already-normalized files and fails CI when it had to
//! correct anything.

pub mod cli;
pub mod mapping;
pub mod normalize;
pub mod validate;

pub use mapping::{ColumnMapping, MappingError, MappingFile, sanitize_column_name};
