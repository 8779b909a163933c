//! Budget Core Library
//!
//! Statement analysis for the budget tool:
//! - Format strings that describe arbitrary CSV layouts
//! - Statement readers (AMEX, Bank of America, generic CSV)
//! - Description normalization for robust matching
//! - Location extraction and travel classification
//! - Ordered merchant rules, first match wins
//! - Rule suggestions for unmatched merchants
//! - YAML configuration and the run pipeline

pub mod config;
pub mod discover;
pub mod error;
pub mod format_spec;
pub mod import;
pub mod location;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod rules;

pub use config::{DataSource, Settings, TravelSettings};
pub use discover::{discover, render_csv, render_json, render_text, UnknownCluster};
pub use error::{Error, Result};
pub use format_spec::{ColumnRole, FormatSpec};
pub use import::{detect_format, parse_statement, ParsedStatement, StatementReader};
pub use location::{extract_location, HomeLocations, HomeSource, TravelPolicy};
pub use models::{
    AmountSign, ClassifiedTransaction, LocationKind, RawTransaction, StatementFormat, Transaction,
    UNKNOWN,
};
pub use normalize::{display_description, normalize_description};
pub use pipeline::{
    ingest, ingest_file, load_rules, Analysis, Analyzer, CategoryTotal, SourceImport,
    SourceWarnings, Summary,
};
pub use rules::{CompiledRule, Rule, RuleOrder, RuleSet, BUILTIN_SOURCE};
