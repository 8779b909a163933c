//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Budget - Classify bank statements with ordered merchant rules
#[derive(Parser)]
#[command(name = "budget")]
#[command(about = "Statement analyzer: merchants, categories, travel", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to ./budget.yaml, then the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read every data source and classify its transactions
    Classify {
        /// Only list transactions no rule matched
        #[arg(long)]
        unknown_only: bool,

        /// Maximum number of transactions to list
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Suggest rules for unmatched merchants, highest spend first
    Discover {
        /// Output format: text, csv, json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Maximum number of suggestions
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Inspect merchant rules
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Work with CSV format strings
    Formats {
        #[command(subcommand)]
        action: FormatsAction,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules in evaluation order
    List,

    /// Show which rule a description matches
    Test {
        /// Description to test
        description: String,
    },
}

#[derive(Subcommand)]
pub enum FormatsAction {
    /// Compile a format string and show its columns
    Check {
        /// Format string, e.g. "{date:%m/%d/%Y}, {_}, {description}, {amount}"
        format: String,
    },
}
