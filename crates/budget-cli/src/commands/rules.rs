//! Rule command implementations (list, test)

use anyhow::{Context, Result};
use budget_core::{load_rules, normalize_description, Settings};

use super::truncate;

pub fn cmd_rules_list(settings: &Settings) -> Result<()> {
    let rules = load_rules(settings).context("Failed to load rules")?;

    if rules.is_empty() {
        println!("No rules configured. Set `rules_file` in your settings or enable");
        println!("`include_builtin_rules`.");
        return Ok(());
    }

    println!();
    println!("📋 Rules ({} in evaluation order)", rules.len());
    println!("   ─────────────────────────────────────────────────────────────");

    for (index, rule) in rules.rules().enumerate() {
        let category = if rule.subcategory.is_empty() {
            rule.category.clone()
        } else {
            format!("{}/{}", rule.category, rule.subcategory)
        };
        println!(
            "   {:>4} │ {:<14} │ {:<32} │ {:<20} │ {}",
            index,
            truncate(&format!("{}:{}", rule.source_name, rule.line), 14),
            truncate(&rule.pattern, 32),
            truncate(&rule.merchant, 20),
            category
        );
        if let Some(exclude) = &rule.exclude {
            println!("          excluding: {}", exclude);
        }
    }

    Ok(())
}

pub fn cmd_rules_test(settings: &Settings, description: &str) -> Result<()> {
    let rules = load_rules(settings).context("Failed to load rules")?;

    println!("🧪 Testing: {}", description);
    println!("   Normalized: {}", normalize_description(description));

    match rules.test(description) {
        Some((index, rule)) => {
            println!("   ✅ Rule {} ({}:{}): {}", index, rule.source_name, rule.line, rule.pattern);
            println!("      Merchant: {}", rule.merchant);
            if rule.subcategory.is_empty() {
                println!("      Category: {}", rule.category);
            } else {
                println!("      Category: {}/{}", rule.category, rule.subcategory);
            }
        }
        None => println!("   ❓ No rule matches; classified as Unknown"),
    }

    Ok(())
}
