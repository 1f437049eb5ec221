use std::path::PathBuf;
use thiserror::Error;

use crate::models::Column;

/// All errors produced by the dashboard pipeline.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// The source could not be reached: missing file, network or auth failure.
    #[error("Source unavailable ({locator}): {reason}")]
    SourceUnavailable { locator: String, reason: String },

    /// A required column is absent after alias resolution.
    #[error("Column '{column}' not found; available columns: {available:?}")]
    SchemaMismatch {
        column: Column,
        available: Vec<String>,
    },

    /// A single cell could not be parsed.
    #[error("Cannot parse {column} value \"{value}\"")]
    ParseFailure { column: Column, value: String },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A CSV document could not be parsed.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub fn source_unavailable(locator: impl ToString, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure aborts a whole refresh cycle (as opposed to
    /// degrading a single output).
    pub fn is_source_level(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::FileRead { .. } | Self::Csv(_) | Self::Io(_)
        )
    }
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashboardError>;
