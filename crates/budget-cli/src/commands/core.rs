//! Shared command utilities
//!
//! This module contains:
//! - `load_settings` - Find and load the settings file
//! - `run_analysis` - Read every data source and classify it
//! - `format_amount` - Dollar formatting for listings

use std::path::Path;

use anyhow::{bail, Context, Result};
use budget_core::config::{default_path, LOCAL_CONFIG_FILE};
use budget_core::{ingest_file, load_rules, Analysis, Analyzer, Settings};
use rust_decimal::Decimal;
use tracing::info;

/// Load settings from `--config`, ./budget.yaml, or the user config directory;
/// defaults when none exists
pub fn load_settings(config: Option<&Path>) -> Result<Settings> {
    match default_path(config) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => {
            info!("No settings file found; using defaults");
            Ok(Settings::default())
        }
    }
}

/// Read every configured data source and classify it
pub fn run_analysis(settings: &Settings) -> Result<Analysis> {
    if settings.data_sources.is_empty() {
        bail!(
            "No data sources configured. Add `data_sources` to {} or pass --config",
            LOCAL_CONFIG_FILE
        );
    }

    let rules = load_rules(settings).context("Failed to load rules")?;
    let imports = settings
        .data_sources
        .iter()
        .map(|source| {
            ingest_file(source).with_context(|| format!("Failed to read source '{}'", source.name))
        })
        .collect::<Result<Vec<_>>>()?;

    let analyzer = Analyzer::new(rules, settings).context("Invalid home locations")?;
    Ok(analyzer.run(imports))
}

/// "$12.30" for spend, "+$12.30" for refunds and credits
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("+${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded)
    }
}
