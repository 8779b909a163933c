//! YAML configuration
//!
//! ```yaml
//! home_locations: [WA]
//! rules_file: rules.csv
//! rule_order: user_first
//! travel:
//!   domestic_out_of_state: false
//!   categories: [Travel]
//! travel_labels:
//!   GB: United Kingdom
//! data_sources:
//!   - name: Amex
//!     type: amex
//!     file: statements/amex.csv
//!   - name: Checking
//!     type: csv
//!     file: statements/checking.csv
//!     format: "{date:%m/%d/%Y}, {_}, {description}, {_}, {amount}"
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::format_spec::FormatSpec;
use crate::import::{detect_format, StatementReader};
use crate::location::{HomeLocations, TravelPolicy};
use crate::models::{AmountSign, StatementFormat};
use crate::rules::RuleOrder;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "budget.yaml";

fn default_true() -> bool {
    true
}

fn default_travel_categories() -> Vec<String> {
    vec!["Travel".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Explicit home region codes; inferred from the data when empty
    pub home_locations: Vec<String>,
    pub rules_file: Option<PathBuf>,
    pub include_builtin_rules: bool,
    pub rule_order: RuleOrder,
    pub travel: TravelSettings,
    /// Display names for location codes
    pub travel_labels: BTreeMap<String, String>,
    pub data_sources: Vec<DataSource>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            home_locations: Vec::new(),
            rules_file: None,
            include_builtin_rules: true,
            rule_order: RuleOrder::default(),
            travel: TravelSettings::default(),
            travel_labels: BTreeMap::new(),
            data_sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TravelSettings {
    /// Treat state codes outside the home set as travel
    #[serde(default)]
    pub domestic_out_of_state: bool,
    /// Rule categories that mark a transaction as travel
    #[serde(default = "default_travel_categories")]
    pub categories: Vec<String>,
}

impl Default for TravelSettings {
    fn default() -> Self {
        Self {
            domestic_out_of_state: false,
            categories: default_travel_categories(),
        }
    }
}

/// One statement file and how to read it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSource {
    pub name: String,
    /// Detected from the file contents when omitted
    #[serde(rename = "type", default)]
    pub kind: Option<StatementFormat>,
    pub file: PathBuf,
    /// Format string for `csv` sources
    #[serde(rename = "format", default)]
    pub format_spec: Option<String>,
    #[serde(default = "default_true")]
    pub has_header: bool,
    #[serde(default)]
    pub amount_sign: AmountSign,
}

impl DataSource {
    /// Build the reader for this source; `text` is only consulted when the
    /// type has to be detected
    pub fn reader(&self, text: &str) -> Result<StatementReader> {
        let kind = match (self.kind, &self.format_spec) {
            (Some(kind), _) => kind,
            (None, Some(_)) => StatementFormat::Csv,
            (None, None) => detect_format(text).ok_or_else(|| {
                Error::Config(format!(
                    "cannot detect the statement type of source '{}'; set `type`",
                    self.name
                ))
            })?,
        };
        debug!("Source {} read as {}", self.name, kind);

        match kind {
            StatementFormat::Amex => Ok(StatementReader::Amex),
            StatementFormat::Boa => Ok(StatementReader::Boa),
            StatementFormat::Csv => {
                let source = self.format_spec.as_deref().ok_or_else(|| {
                    Error::Config(format!("csv source '{}' needs a `format`", self.name))
                })?;
                Ok(StatementReader::Csv {
                    spec: FormatSpec::parse(source)?,
                    has_header: self.has_header,
                    sign: self.amount_sign,
                })
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("data source with an empty name".to_string()));
        }
        match (self.kind, &self.format_spec) {
            (Some(StatementFormat::Csv), None) => Err(Error::Config(format!(
                "csv source '{}' needs a `format`",
                self.name
            ))),
            (Some(kind @ (StatementFormat::Amex | StatementFormat::Boa)), Some(_)) => {
                Err(Error::Config(format!(
                    "source '{}': `format` does not apply to {} statements",
                    self.name, kind
                )))
            }
            (_, Some(source)) => FormatSpec::parse(source).map(|_| ()),
            _ => Ok(()),
        }
    }
}

impl Settings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load a settings file, resolving relative paths against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut settings = Self::from_yaml_str(&content)?;
        if let Some(base) = path.parent() {
            settings.resolve_paths(base);
        }
        debug!(
            "Loaded settings from {} ({} data sources)",
            path.display(),
            settings.data_sources.len()
        );
        Ok(settings)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        self.rules_file = self.rules_file.as_ref().map(|p| base.join(p));
        for source in &mut self.data_sources {
            source.file = base.join(&source.file);
        }
    }

    pub fn validate(&self) -> Result<()> {
        HomeLocations::configured(&self.home_locations)?;

        let mut names = HashSet::new();
        for source in &self.data_sources {
            source.validate()?;
            if !names.insert(source.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate data source name '{}'",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// Configured home set, or None when it should be inferred
    pub fn home_locations(&self) -> Result<Option<HomeLocations>> {
        if self.home_locations.is_empty() {
            return Ok(None);
        }
        HomeLocations::configured(&self.home_locations).map(Some)
    }

    pub fn travel_policy(&self) -> TravelPolicy {
        TravelPolicy {
            domestic_out_of_state: self.travel.domestic_out_of_state,
        }
    }

    pub fn travel_label<'a>(&'a self, code: &'a str) -> &'a str {
        self.travel_labels
            .get(code)
            .map(String::as_str)
            .unwrap_or(code)
    }
}

/// Pick the settings file: an explicit path, then `budget.yaml` in the
/// working directory, then the user config directory
pub fn default_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    user_config_path().filter(|p| p.exists())
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("budget").join("config.yaml"))
}
