//! Domain models for budget

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::location::extract_location;
use crate::normalize::{display_description, normalize_description};

/// Merchant and category assigned when no rule matches
pub const UNKNOWN: &str = "Unknown";

/// Built-in statement layouts plus the format-string driven reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementFormat {
    Amex,
    Boa,
    Csv,
}

impl StatementFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amex => "amex",
            Self::Boa => "boa",
            Self::Csv => "csv",
        }
    }
}

impl std::str::FromStr for StatementFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "amex" | "americanexpress" => Ok(Self::Amex),
            "boa" | "bofa" | "bankofamerica" => Ok(Self::Boa),
            "csv" | "custom" => Ok(Self::Csv),
            _ => Err(format!("Unknown statement format: {}", s)),
        }
    }
}

impl std::fmt::Display for StatementFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a source writes outgoing spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountSign {
    /// Debits are negative (most bank exports)
    #[default]
    ChargesNegative,
    /// Charges are positive (card exports such as AMEX)
    ChargesPositive,
}

impl AmountSign {
    /// Convert a source amount so that spend is a positive magnitude
    pub fn to_spend(self, amount: Decimal) -> Decimal {
        match self {
            Self::ChargesNegative => -amount,
            Self::ChargesPositive => amount,
        }
    }
}

/// One row as produced by a statement reader, sign already normalized
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    pub date: NaiveDate,
    pub description: String,
    /// Positive = money spent
    pub amount: Decimal,
    /// Location column value, when the source has one
    pub location: Option<String>,
}

/// What kind of region a location code names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    State,
    Country,
    #[default]
    None,
}

/// A transaction after reading, normalization, and location extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub raw_description: String,
    /// Uppercased, noise-stripped text used for rule matching
    pub normalized_description: String,
    /// Same cleanup as `normalized_description` with the original casing
    pub display_description: String,
    /// Positive = money spent
    pub amount: Decimal,
    pub location: Option<String>,
    pub location_kind: LocationKind,
    pub source_name: String,
}

impl Transaction {
    pub fn from_raw(raw: RawTransaction, source_name: &str) -> Self {
        let normalized_description = normalize_description(&raw.description);
        let display_description = display_description(&raw.description);

        // An explicit location column wins over text scanning
        let located = raw
            .location
            .as_deref()
            .and_then(|value| extract_location(&normalize_description(value)))
            .or_else(|| extract_location(&normalized_description));
        let (location, location_kind) = match located {
            Some((code, kind)) => (Some(code), kind),
            None => (None, LocationKind::None),
        };

        Self {
            date: raw.date,
            raw_description: raw.description,
            normalized_description,
            display_description,
            amount: raw.amount,
            location,
            location_kind,
            source_name: source_name.to_string(),
        }
    }
}

/// A transaction with its merchant, category, and travel assignment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub merchant: String,
    pub category: String,
    pub subcategory: String,
    pub is_travel: bool,
    /// Position of the winning rule in the rule set
    pub matched_rule_index: Option<usize>,
}

impl ClassifiedTransaction {
    pub fn is_unknown(&self) -> bool {
        self.matched_rule_index.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_statement_format_parse() {
        assert_eq!(StatementFormat::from_str("AMEX"), Ok(StatementFormat::Amex));
        assert_eq!(StatementFormat::from_str("bofa"), Ok(StatementFormat::Boa));
        assert_eq!(StatementFormat::from_str("csv"), Ok(StatementFormat::Csv));
        assert!(StatementFormat::from_str("chase").is_err());
        assert_eq!(StatementFormat::Boa.to_string(), "boa");
    }

    #[test]
    fn test_amount_sign() {
        let charge = Decimal::from_str("-54.32").unwrap();
        assert_eq!(
            AmountSign::ChargesNegative.to_spend(charge),
            Decimal::from_str("54.32").unwrap()
        );
        assert_eq!(AmountSign::ChargesPositive.to_spend(charge), charge);
    }

    #[test]
    fn test_from_raw_normalizes_and_locates() {
        let raw = RawTransaction {
            date: date(2025, 3, 14),
            description: "SQ *Blue Bottle Coffee Portland OR 97209".to_string(),
            amount: Decimal::from_str("6.50").unwrap(),
            location: None,
        };
        let tx = Transaction::from_raw(raw, "Amex");
        assert_eq!(tx.normalized_description, "BLUE BOTTLE COFFEE PORTLAND OR");
        assert_eq!(tx.display_description, "Blue Bottle Coffee Portland OR");
        assert_eq!(tx.location.as_deref(), Some("OR"));
        assert_eq!(tx.location_kind, LocationKind::State);
        assert_eq!(tx.source_name, "Amex");
    }

    #[test]
    fn test_from_raw_prefers_location_column() {
        let raw = RawTransaction {
            date: date(2025, 3, 14),
            description: "HOTEL WA".to_string(),
            amount: Decimal::from_str("210.00").unwrap(),
            location: Some("London, GB".to_string()),
        };
        let tx = Transaction::from_raw(raw, "Visa");
        assert_eq!(tx.location.as_deref(), Some("GB"));
        assert_eq!(tx.location_kind, LocationKind::Country);
    }
}
