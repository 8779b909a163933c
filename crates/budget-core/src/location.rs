//! Location extraction and travel classification
//!
//! Card statements usually end a description with "CITY ST" for domestic
//! purchases and "CITY CC" (ISO country) for foreign ones. State codes are
//! checked first because domestic descriptions rarely carry a country code
//! and several codes collide (CA, DE, IN, ...).

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{LocationKind, Transaction};

/// US states, DC, and territories that appear on card statements
const US_STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY", "PR", "GU", "VI",
];

/// ISO 3166-1 alpha-2 codes for destinations, excluding US
const COUNTRY_CODES: &[&str] = &[
    "AE", "AR", "AT", "AU", "BE", "BG", "BR", "BS", "BZ", "CA", "CH", "CL", "CN", "CO", "CR",
    "CU", "CY", "CZ", "DE", "DK", "DO", "EC", "EE", "EG", "ES", "FI", "FJ", "FR", "GB", "GR",
    "GT", "HK", "HN", "HR", "HU", "ID", "IE", "IL", "IN", "IS", "IT", "JM", "JO", "JP", "KE",
    "KH", "KR", "LA", "LK", "LT", "LU", "LV", "MA", "MC", "MO", "MT", "MV", "MX", "MY", "NG",
    "NI", "NL", "NO", "NP", "NZ", "PA", "PE", "PH", "PL", "PT", "QA", "RO", "RS", "SA", "SE",
    "SG", "SI", "SK", "TH", "TR", "TW", "TZ", "UA", "UK", "UY", "VN", "ZA",
];

pub fn is_state_code(code: &str) -> bool {
    US_STATE_CODES.contains(&code)
}

pub fn is_country_code(code: &str) -> bool {
    COUNTRY_CODES.contains(&code)
}

/// Find a state or country code in a normalized description.
///
/// Tokens are scanned from the end so a trailing "CITY ST" wins over an
/// earlier two-letter word. Country codes are only considered when no token
/// is a state code.
pub fn extract_location(normalized: &str) -> Option<(String, LocationKind)> {
    let tokens: Vec<&str> = normalized
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|t| t.len() == 2 && t.bytes().all(|b| b.is_ascii_uppercase()))
        .collect();

    if let Some(code) = tokens.iter().rev().find(|t| is_state_code(t)) {
        return Some((code.to_string(), LocationKind::State));
    }
    tokens
        .iter()
        .rev()
        .find(|t| is_country_code(t))
        .map(|code| (code.to_string(), LocationKind::Country))
}

/// Where a home location set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeSource {
    Configured,
    Inferred,
    /// No configuration and no state-tagged transactions
    Empty,
}

/// Region codes treated as non-travel for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeLocations {
    codes: BTreeSet<String>,
    source: HomeSource,
}

impl HomeLocations {
    /// Build from configured codes; every code must be two ASCII letters
    pub fn configured<I, S>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for code in codes {
            let code = code.as_ref().trim().to_uppercase();
            if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(Error::Config(format!(
                    "home location '{}' is not a 2-letter code",
                    code
                )));
            }
            set.insert(code);
        }
        Ok(Self {
            codes: set,
            source: HomeSource::Configured,
        })
    }

    /// Most frequent state code among state-tagged transactions; ties go to
    /// the code seen first in input order
    pub fn infer(transactions: &[Transaction]) -> Self {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, tx) in transactions.iter().enumerate() {
            if tx.location_kind != LocationKind::State {
                continue;
            }
            if let Some(code) = tx.location.as_deref() {
                counts.entry(code).or_insert((0, position)).0 += 1;
            }
        }

        let home = counts
            .into_iter()
            .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
                count_a.cmp(count_b).then(first_b.cmp(first_a))
            })
            .map(|(code, _)| code.to_string());

        match home {
            Some(code) => {
                info!("Inferred home location: {}", code);
                Self {
                    codes: BTreeSet::from([code]),
                    source: HomeSource::Inferred,
                }
            }
            None => Self {
                codes: BTreeSet::new(),
                source: HomeSource::Empty,
            },
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    pub fn source(&self) -> HomeSource {
        self.source
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Travel classification policy.
///
/// International transactions are always travel. Out-of-state domestic
/// transactions are travel only when `domestic_out_of_state` is set;
/// otherwise domestic travel comes from merchant rules alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TravelPolicy {
    pub domestic_out_of_state: bool,
}

impl TravelPolicy {
    pub fn is_travel(&self, tx: &Transaction, home: &HomeLocations) -> bool {
        match (tx.location_kind, tx.location.as_deref()) {
            (LocationKind::Country, Some(_)) => true,
            (LocationKind::State, Some(code)) => {
                self.domestic_out_of_state && !home.is_empty() && !home.contains(code)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawTransaction;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn tx(description: &str) -> Transaction {
        Transaction::from_raw(
            RawTransaction {
                date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                description: description.to_string(),
                amount: Decimal::new(1000, 2),
                location: None,
            },
            "test",
        )
    }

    #[test]
    fn test_extract_trailing_state() {
        assert_eq!(
            extract_location("STARBUCKS SEATTLE WA"),
            Some(("WA".to_string(), LocationKind::State))
        );
    }

    #[test]
    fn test_extract_country_when_no_state() {
        assert_eq!(
            extract_location("PRET A MANGER LONDON GB"),
            Some(("GB".to_string(), LocationKind::Country))
        );
        assert_eq!(
            extract_location("HACKERGADGETS HONG KONG HK"),
            Some(("HK".to_string(), LocationKind::Country))
        );
    }

    #[test]
    fn test_state_wins_over_country() {
        // CA is both California and Canada
        assert_eq!(
            extract_location("IN-N-OUT LOS ANGELES CA"),
            Some(("CA".to_string(), LocationKind::State))
        );
        // A state anywhere beats a trailing country code
        assert_eq!(
            extract_location("DUTY FREE NY GB"),
            Some(("NY".to_string(), LocationKind::State))
        );
    }

    #[test]
    fn test_embedded_state() {
        assert_eq!(
            extract_location("LYFT RIDE PORTLAND OR TUE"),
            Some(("OR".to_string(), LocationKind::State))
        );
    }

    #[test]
    fn test_no_location() {
        assert_eq!(extract_location("NETFLIX.COM"), None);
        assert_eq!(extract_location("AMAZON MKTPLACE"), None);
        assert_eq!(extract_location(""), None);
    }

    #[test]
    fn test_punctuation_around_code() {
        assert_eq!(
            extract_location("HOTEL (PARIS, FR)"),
            Some(("FR".to_string(), LocationKind::Country))
        );
    }

    #[test]
    fn test_infer_home_by_mode() {
        let txs = vec![
            tx("COFFEE PORTLAND OR"),
            tx("SAFEWAY SEATTLE WA"),
            tx("QFC SEATTLE WA"),
            tx("PRET LONDON GB"),
            tx("NETFLIX.COM"),
        ];
        let home = HomeLocations::infer(&txs);
        assert_eq!(home.source(), HomeSource::Inferred);
        assert_eq!(home.codes().collect::<Vec<_>>(), vec!["WA"]);
    }

    #[test]
    fn test_infer_home_tie_breaks_by_first_seen() {
        let txs = vec![
            tx("COFFEE PORTLAND OR"),
            tx("SAFEWAY SEATTLE WA"),
            tx("POWELLS PORTLAND OR"),
            tx("QFC SEATTLE WA"),
        ];
        let home = HomeLocations::infer(&txs);
        assert_eq!(home.codes().collect::<Vec<_>>(), vec!["OR"]);
    }

    #[test]
    fn test_infer_home_empty() {
        let home = HomeLocations::infer(&[tx("NETFLIX.COM"), tx("PRET LONDON GB")]);
        assert_eq!(home.source(), HomeSource::Empty);
        assert!(home.is_empty());
    }

    #[test]
    fn test_configured_home_validates_codes() {
        let home = HomeLocations::configured(["wa", " OR "]).unwrap();
        assert!(home.contains("WA"));
        assert!(home.contains("OR"));
        assert_eq!(home.source(), HomeSource::Configured);
        assert!(HomeLocations::configured(["Washington"]).is_err());
        assert!(HomeLocations::configured(["W1"]).is_err());
    }

    #[test]
    fn test_international_is_travel_without_configuration() {
        let home = HomeLocations::infer(&[]);
        let policy = TravelPolicy::default();
        assert!(policy.is_travel(&tx("PRET A MANGER LONDON GB"), &home));
    }

    #[test]
    fn test_out_of_state_is_not_travel_by_default() {
        let home = HomeLocations::configured(["WA"]).unwrap();
        let policy = TravelPolicy::default();
        assert!(!policy.is_travel(&tx("COFFEE PORTLAND OR"), &home));
    }

    #[test]
    fn test_out_of_state_travel_when_opted_in() {
        let home = HomeLocations::configured(["WA"]).unwrap();
        let policy = TravelPolicy {
            domestic_out_of_state: true,
        };
        assert!(policy.is_travel(&tx("COFFEE PORTLAND OR"), &home));
        assert!(!policy.is_travel(&tx("SAFEWAY SEATTLE WA"), &home));
        assert!(!policy.is_travel(&tx("NETFLIX.COM"), &home));
    }
}
