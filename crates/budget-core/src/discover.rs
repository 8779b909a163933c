//! Rule suggestions for unmatched merchants
//!
//! Unknown transactions are grouped by their normalized description with
//! transaction-specific trailing tokens removed. Each group gets a suggested
//! pattern (the shared leading words) and merchant name, and groups are ranked
//! by how much money they account for.

use std::collections::HashMap;
use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::ClassifiedTransaction;

/// A group of unmatched transactions that one new rule would cover
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnknownCluster {
    #[serde(rename = "raw_description")]
    pub representative_description: String,
    pub suggested_pattern: String,
    pub suggested_merchant: String,
    pub count: usize,
    pub total_spend: Decimal,
}

/// Cluster unknown transactions and rank them by total spend, then count,
/// then representative description
pub fn discover(
    transactions: &[ClassifiedTransaction],
    limit: Option<usize>,
) -> Vec<UnknownCluster> {
    let mut groups: Vec<Vec<&ClassifiedTransaction>> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for tx in transactions.iter().filter(|tx| tx.is_unknown()) {
        let key = cluster_key(&tx.transaction.normalized_description);
        let index = *by_key.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[index].push(tx);
    }

    let mut clusters: Vec<UnknownCluster> = groups.iter().map(|g| build_cluster(g)).collect();
    clusters.sort_by(|a, b| {
        b.total_spend
            .cmp(&a.total_spend)
            .then(b.count.cmp(&a.count))
            .then_with(|| a.representative_description.cmp(&b.representative_description))
    });
    if let Some(limit) = limit {
        clusters.truncate(limit);
    }
    clusters
}

fn build_cluster(members: &[&ClassifiedTransaction]) -> UnknownCluster {
    let first = &members[0].transaction;
    let prefix = common_alphabetic_prefix(
        members
            .iter()
            .map(|m| m.transaction.normalized_description.as_str()),
    );
    let words = if prefix.is_empty() {
        first.normalized_description.clone()
    } else {
        prefix.join(" ")
    };

    UnknownCluster {
        representative_description: first.raw_description.clone(),
        suggested_pattern: regex::escape(&words),
        suggested_merchant: title_case(&words),
        count: members.len(),
        total_spend: members.iter().map(|m| m.transaction.amount).sum(),
    }
}

/// Normalized description minus trailing tokens that carry digits or are
/// pure punctuation ("AMZN MKTP US*2K4L51" -> "AMZN MKTP")
fn cluster_key(normalized: &str) -> String {
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    while let Some(last) = tokens.last() {
        let noisy = last.bytes().any(|b| b.is_ascii_digit())
            || !last.chars().any(char::is_alphanumeric);
        if !noisy {
            break;
        }
        tokens.pop();
    }
    if tokens.is_empty() {
        normalized.to_string()
    } else {
        tokens.join(" ")
    }
}

fn is_alphabetic_token(token: &str) -> bool {
    token.chars().any(char::is_alphabetic) && !token.chars().any(|c| c.is_ascii_digit())
}

/// Longest run of leading alphabetic tokens shared by every description
fn common_alphabetic_prefix<'a>(
    mut descriptions: impl Iterator<Item = &'a str>,
) -> Vec<&'a str> {
    let Some(first) = descriptions.next() else {
        return Vec::new();
    };
    let mut prefix: Vec<&str> = first
        .split_whitespace()
        .take_while(|t| is_alphabetic_token(t))
        .collect();

    for description in descriptions {
        let shared = prefix
            .iter()
            .zip(description.split_whitespace())
            .take_while(|(a, b)| *a == b)
            .count();
        prefix.truncate(shared);
        if prefix.is_empty() {
            break;
        }
    }
    prefix
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Human-readable listing, highest spend first
pub fn render_text(clusters: &[UnknownCluster]) -> String {
    let mut out = String::new();
    for (i, cluster) in clusters.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. ${:>10}  {:>4}x  {}",
            i + 1,
            cluster.total_spend.round_dp(2),
            cluster.count,
            cluster.representative_description
        );
        let _ = writeln!(
            out,
            "       pattern: {}   merchant: {}",
            cluster.suggested_pattern, cluster.suggested_merchant
        );
    }
    out
}

/// Stub rows ready to paste into a rules file; category is left blank
pub fn render_csv(clusters: &[UnknownCluster]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["Pattern", "Merchant", "Category", "Subcategory"])?;
    for cluster in clusters {
        wtr.write_record([
            cluster.suggested_pattern.as_str(),
            cluster.suggested_merchant.as_str(),
            "",
            "",
        ])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::InvalidData(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(e.to_string()))
}

pub fn render_json(clusters: &[UnknownCluster]) -> Result<String> {
    Ok(serde_json::to_string_pretty(clusters)?)
}
