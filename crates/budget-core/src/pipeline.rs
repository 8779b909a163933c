//! Run pipeline
//!
//! One run reads every configured source, resolves the home location set
//! once, classifies each transaction against one immutable rule set, and
//! totals the result. Transactions keep their input order.

use std::collections::BTreeMap;
use std::fs;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{DataSource, Settings};
use crate::discover::{discover, UnknownCluster};
use crate::error::{Error, Result};
use crate::import::parse_statement;
use crate::location::{HomeLocations, TravelPolicy};
use crate::models::{ClassifiedTransaction, Transaction};
use crate::rules::RuleSet;

/// Transactions read from one data source plus the rows that were skipped
#[derive(Debug)]
pub struct SourceImport {
    pub source_name: String,
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<Error>,
}

/// Read one source from already-loaded text
pub fn ingest(source: &DataSource, text: &str) -> Result<SourceImport> {
    let reader = source.reader(text)?;
    let parsed = parse_statement(text, &reader)?;
    if !parsed.warnings.is_empty() {
        warn!(
            "{}: skipped {} rows that could not be parsed",
            source.name,
            parsed.warnings.len()
        );
    }
    let transactions = parsed
        .rows
        .into_iter()
        .map(|raw| Transaction::from_raw(raw, &source.name))
        .collect();

    Ok(SourceImport {
        source_name: source.name.clone(),
        transactions,
        warnings: parsed.warnings,
    })
}

/// Read a source's file from disk and ingest it
pub fn ingest_file(source: &DataSource) -> Result<SourceImport> {
    let text = fs::read_to_string(&source.file).map_err(|e| {
        Error::InvalidData(format!(
            "Failed to read {} for source '{}': {}",
            source.file.display(),
            source.name,
            e
        ))
    })?;
    ingest(source, &text)
}

/// Built-in and user rules in the configured order
pub fn load_rules(settings: &Settings) -> Result<RuleSet> {
    let builtin = if settings.include_builtin_rules {
        RuleSet::builtin()?
    } else {
        RuleSet::default()
    };
    let user = match &settings.rules_file {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read rules {}: {}", path.display(), e))
            })?;
            RuleSet::from_csv(&text, &path.display().to_string())?
        }
        None => RuleSet::default(),
    };
    debug!(
        "Rule set: {} built-in, {} user ({:?})",
        builtin.len(),
        user.len(),
        settings.rule_order
    );
    Ok(RuleSet::combine(builtin, user, settings.rule_order)
        .with_travel_categories(&settings.travel.categories))
}

/// Spend and count for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub count: usize,
    pub spend: Decimal,
}

/// Rows skipped while reading one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceWarnings {
    pub source_name: String,
    pub count: usize,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub unknown: usize,
    pub travel: usize,
    pub total_spend: Decimal,
    pub travel_spend: Decimal,
    /// Highest spend first, then by name
    pub by_category: Vec<CategoryTotal>,
    pub warnings: Vec<SourceWarnings>,
}

impl Summary {
    pub fn skipped_rows(&self) -> usize {
        self.warnings.iter().map(|w| w.count).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub home: HomeLocations,
    pub transactions: Vec<ClassifiedTransaction>,
    pub summary: Summary,
}

impl Analysis {
    pub fn unknown(&self) -> impl Iterator<Item = &ClassifiedTransaction> {
        self.transactions.iter().filter(|tx| tx.is_unknown())
    }

    pub fn discover(&self, limit: Option<usize>) -> Vec<UnknownCluster> {
        discover(&self.transactions, limit)
    }
}

/// Classifies a run's transactions against one rule set
#[derive(Debug, Clone)]
pub struct Analyzer {
    rules: RuleSet,
    home: Option<HomeLocations>,
    policy: TravelPolicy,
}

impl Analyzer {
    pub fn new(rules: RuleSet, settings: &Settings) -> Result<Self> {
        Ok(Self {
            rules,
            home: settings.home_locations()?,
            policy: settings.travel_policy(),
        })
    }

    pub fn run(&self, imports: Vec<SourceImport>) -> Analysis {
        let mut warnings = Vec::new();
        let mut transactions = Vec::new();
        for import in imports {
            warnings.push(SourceWarnings {
                source_name: import.source_name,
                count: import.warnings.len(),
                messages: import.warnings.iter().map(ToString::to_string).collect(),
            });
            transactions.extend(import.transactions);
        }

        let home = match &self.home {
            Some(home) => home.clone(),
            None => HomeLocations::infer(&transactions),
        };

        let classified: Vec<ClassifiedTransaction> = transactions
            .into_iter()
            .map(|tx| self.rules.classify(tx, &home, &self.policy))
            .collect();
        let summary = summarize(&classified, warnings);
        info!(
            "Classified {} transactions ({} unknown)",
            summary.total, summary.unknown
        );

        Analysis {
            home,
            transactions: classified,
            summary,
        }
    }
}

fn summarize(transactions: &[ClassifiedTransaction], warnings: Vec<SourceWarnings>) -> Summary {
    let mut categories: BTreeMap<&str, (usize, Decimal)> = BTreeMap::new();
    let mut unknown = 0;
    let mut travel = 0;
    let mut travel_spend = Decimal::ZERO;
    for tx in transactions {
        let entry = categories
            .entry(tx.category.as_str())
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += tx.transaction.amount;
        if tx.is_unknown() {
            unknown += 1;
        }
        if tx.is_travel {
            travel += 1;
            travel_spend += tx.transaction.amount;
        }
    }

    let mut by_category: Vec<CategoryTotal> = categories
        .into_iter()
        .map(|(category, (count, spend))| CategoryTotal {
            category: category.to_string(),
            count,
            spend,
        })
        .collect();
    // BTreeMap order is by name; the stable sort keeps it for equal spend
    by_category.sort_by(|a, b| b.spend.cmp(&a.spend));

    Summary {
        total: transactions.len(),
        unknown,
        travel,
        total_spend: transactions.iter().map(|tx| tx.transaction.amount).sum(),
        travel_spend,
        by_category,
        warnings,
    }
}
