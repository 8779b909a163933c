//! Error types for budget

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid format spec at '{token}': {reason}")]
    FormatSpec { token: String, reason: String },

    #[error("Row {row}: cannot parse '{value}': {reason}")]
    RowParse {
        row: usize,
        value: String,
        reason: String,
    },

    #[error("Row {row}: expected {expected} columns, found {found}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid rule '{pattern}' ({source_name} line {line}): {reason}")]
    InvalidRule {
        pattern: String,
        line: u64,
        source_name: String,
        reason: String,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    pub(crate) fn format_spec(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FormatSpec {
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn row_parse(row: usize, value: &str, reason: impl Into<String>) -> Self {
        Self::RowParse {
            row,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors that cost a single row and are counted rather than aborting a source
    pub fn is_row_level(&self) -> bool {
        matches!(self, Self::RowParse { .. } | Self::MalformedRow { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
