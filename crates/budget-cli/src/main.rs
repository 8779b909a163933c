//! Budget CLI - Bank statement analyzer
//!
//! Usage:
//!   budget classify                  Classify every configured data source
//!   budget discover --format csv     Suggest rules for unknown merchants
//!   budget rules test "SQ *COFFEE"   Show which rule a description matches
//!   budget formats check "{date}, {description}, {amount}"

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Classify {
            unknown_only,
            limit,
        } => {
            let settings = commands::load_settings(config)?;
            commands::cmd_classify(&settings, unknown_only, limit)
        }
        Commands::Discover { format, limit } => {
            let settings = commands::load_settings(config)?;
            commands::cmd_discover(&settings, &format, limit)
        }
        Commands::Rules { action } => {
            let settings = commands::load_settings(config)?;
            match action {
                None | Some(RulesAction::List) => commands::cmd_rules_list(&settings),
                Some(RulesAction::Test { description }) => {
                    commands::cmd_rules_test(&settings, &description)
                }
            }
        }
        Commands::Formats { action } => match action {
            FormatsAction::Check { format } => commands::cmd_formats_check(&format),
        },
    }
}
