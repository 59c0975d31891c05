//! The single error type shared by every dataset, split and persistence operation.
//!
//! Failures here are assumed to be caller errors: misaligned arrays, feature
//! collections with inconsistent views, or lookups against entities that were
//! never loaded. Nothing is retried internally.

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Inconsistent feature schema: {0}")]
    SchemaMismatch(String),

    #[error("Entity '{0}' is not present in the feature dataset.")]
    MissingEntity(String),

    #[error("View '{view}' is not available for entity '{entity}'.")]
    MissingView { view: String, entity: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} is not implemented")]
    NotImplemented(String),

    #[error("A {0} must contain at least one entry.")]
    EmptyDataset(&'static str),

    #[error("Entity identifier '{0}' occurs more than once.")]
    DuplicateEntity(String),

    #[error("Non-finite values (NaN or Infinity) were found in '{0}'.")]
    NonFinite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to parse TOML file: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),

    #[error(
        "Missing or null values were found in the required column '{0}'. Response files must be complete."
    )]
    MissingValuesFound(String),

    #[error(
        "The required column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
}

impl DatasetError {
    pub(crate) fn missing_view(view: &str, entity: &str) -> Self {
        DatasetError::MissingView {
            view: view.to_string(),
            entity: entity.to_string(),
        }
    }
}
