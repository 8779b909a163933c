//! Classify command: transaction listing plus run summary

use anyhow::Result;
use budget_core::{Analysis, ClassifiedTransaction, HomeSource, Settings};

use super::{format_amount, run_analysis, truncate};

pub fn cmd_classify(settings: &Settings, unknown_only: bool, limit: Option<usize>) -> Result<()> {
    let analysis = run_analysis(settings)?;
    print_transactions(&analysis, settings, unknown_only, limit);
    print_summary(&analysis, settings);
    Ok(())
}

fn print_transactions(
    analysis: &Analysis,
    settings: &Settings,
    unknown_only: bool,
    limit: Option<usize>,
) {
    let selected: Vec<&ClassifiedTransaction> = analysis
        .transactions
        .iter()
        .filter(|tx| !unknown_only || tx.is_unknown())
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    if selected.is_empty() {
        println!("No transactions to show.");
        return;
    }

    println!();
    if unknown_only {
        println!("❓ Unknown Transactions");
    } else {
        println!("📝 Classified Transactions");
    }
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in selected {
        println!("   {}", transaction_line(tx, settings));
    }
}

/// One listing row: date, amount, merchant, category, description, travel marker
pub fn transaction_line(tx: &ClassifiedTransaction, settings: &Settings) -> String {
    let category = if tx.subcategory.is_empty() {
        tx.category.clone()
    } else {
        format!("{}/{}", tx.category, tx.subcategory)
    };
    let mut line = format!(
        "{} │ {:>10} │ {:<20} │ {:<24} │ {}",
        tx.transaction.date,
        format_amount(tx.transaction.amount),
        truncate(&tx.merchant, 20),
        truncate(&category, 24),
        truncate(&tx.transaction.display_description, 40)
    );
    if tx.is_travel {
        let place = tx
            .transaction
            .location
            .as_deref()
            .map(|code| settings.travel_label(code))
            .unwrap_or("travel");
        line.push_str(&format!(" ✈️  {}", place));
    }
    line
}

fn print_summary(analysis: &Analysis, settings: &Settings) {
    let summary = &analysis.summary;

    println!();
    println!("📊 Summary");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Transactions: {}", summary.total);
    println!("   Total spend:  {}", format_amount(summary.total_spend));
    println!("   Unknown:      {}", summary.unknown);
    println!(
        "   Travel:       {} ({})",
        summary.travel,
        format_amount(summary.travel_spend)
    );

    let home: Vec<&str> = analysis.home.codes().collect();
    match analysis.home.source() {
        HomeSource::Configured => println!("   Home:         {}", home.join(", ")),
        HomeSource::Inferred => println!("   Home:         {} (inferred)", home.join(", ")),
        HomeSource::Empty => println!("   Home:         (unknown)"),
    }

    if !summary.by_category.is_empty() {
        println!();
        println!("   By category:");
        for category in &summary.by_category {
            println!(
                "   {:<24} {:>5}  {:>12}",
                truncate(&category.category, 24),
                category.count,
                format_amount(category.spend)
            );
        }
    }

    let skipped = summary.skipped_rows();
    if skipped > 0 {
        println!();
        println!("   ⚠️  Skipped {} rows that could not be parsed:", skipped);
        for source in summary.warnings.iter().filter(|w| w.count > 0) {
            println!("      {}: {}", source.source_name, source.count);
            for message in &source.messages {
                println!("         {}", message);
            }
        }
    }

    if summary.unknown > 0 && !settings.data_sources.is_empty() {
        println!();
        println!("   Run `budget discover` for rule suggestions.");
    }
    println!();
}
