//! Discover command: rule suggestions for unknown merchants

use std::str::FromStr;

use anyhow::{Context, Result};
use budget_core::{render_csv, render_json, render_text, Settings, UnknownCluster};

use super::run_analysis;

/// How suggestions are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverFormat {
    Text,
    Csv,
    Json,
}

impl FromStr for DiscoverFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("Unknown output format: {} (use text, csv, json)", other),
        }
    }
}

pub fn cmd_discover(settings: &Settings, format: &str, limit: Option<usize>) -> Result<()> {
    let format: DiscoverFormat = format.parse()?;
    let analysis = run_analysis(settings)?;
    let clusters = analysis.discover(limit);
    print!("{}", render_discovery(&clusters, format)?);
    Ok(())
}

/// Render suggestions; csv and json output carry no decoration so they can be piped
pub fn render_discovery(clusters: &[UnknownCluster], format: DiscoverFormat) -> Result<String> {
    match format {
        DiscoverFormat::Csv => render_csv(clusters).context("Failed to render CSV"),
        DiscoverFormat::Json => render_json(clusters).context("Failed to render JSON"),
        DiscoverFormat::Text => {
            if clusters.is_empty() {
                return Ok("✅ Every transaction matched a rule.\n".to_string());
            }
            let mut out = String::new();
            out.push('\n');
            out.push_str(&format!("🔎 Unknown Merchants ({} suggestions)\n", clusters.len()));
            out.push_str("   ─────────────────────────────────────────────────────────────\n");
            out.push_str(&render_text(clusters));
            out.push('\n');
            out.push_str("Add the rules you want with `budget discover --format csv >> rules.csv`\n");
            out.push_str("and fill in their categories.\n");
            Ok(out)
        }
    }
}
