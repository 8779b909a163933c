//! Merchant rules and the first-match-wins matcher
//!
//! Rules come from CSV (`Pattern,Merchant,Category,Subcategory[,Exclude]`)
//! and are evaluated in order against the normalized description with a
//! case-insensitive search. The first matching rule decides the merchant and
//! category; later rules are never consulted.
//!
//! Patterns are compiled with `fancy-regex`, so look-ahead and look-behind
//! work anywhere in a pattern: `COSTCO(?!\s*GAS)` matches the warehouse but
//! not the gas station. The optional `Exclude` column covers "match this
//! unless that appears anywhere" cases without look-around.

use csv::{ReaderBuilder, Trim};
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::location::{HomeLocations, TravelPolicy};
use crate::models::{ClassifiedTransaction, Transaction, UNKNOWN};
use crate::normalize::normalize_description;

/// Source name used for rules shipped with the binary
pub const BUILTIN_SOURCE: &str = "builtin";

const BUILTIN_RULES: &str = include_str!("../../../config/rules.csv");

/// A merchant rule as written in a rules file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub pattern: String,
    pub merchant: String,
    pub category: String,
    pub subcategory: String,
    /// Vetoes the rule when it matches anywhere in the description
    pub exclude: Option<String>,
    pub source_name: String,
    pub line: u64,
}

/// Where user rules go relative to the built-in ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOrder {
    #[default]
    BuiltinFirst,
    UserFirst,
}

/// A rule with its patterns compiled
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: Rule,
    search: Regex,
    exclude: Option<Regex>,
    marks_travel: bool,
}

impl CompiledRule {
    pub fn compile(rule: Rule) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidRule {
            pattern: rule.pattern.clone(),
            line: rule.line,
            source_name: rule.source_name.clone(),
            reason,
        };

        if rule.pattern.is_empty() {
            return Err(invalid("empty pattern".to_string()));
        }

        let search = case_insensitive(&rule.pattern).map_err(|e| invalid(e.to_string()))?;
        let exclude = match rule.exclude.as_deref() {
            Some(pattern) => Some(
                case_insensitive(pattern)
                    .map_err(|e| invalid(format!("exclude '{}': {}", pattern, e)))?,
            ),
            None => None,
        };

        Ok(Self {
            rule,
            search,
            exclude,
            marks_travel: false,
        })
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn marks_travel(&self) -> bool {
        self.marks_travel
    }

    pub fn is_match(&self, description: &str) -> bool {
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|re| self.matches(re, description));
        !excluded && self.matches(&self.search, description)
    }

    /// A search that exhausts the backtracking limit counts as no match
    fn matches(&self, re: &Regex, description: &str) -> bool {
        re.is_match(description).unwrap_or_else(|e| {
            warn!(
                "Rule '{}' ({} line {}) gave up on '{}': {}",
                self.rule.pattern, self.rule.source_name, self.rule.line, description, e
            );
            false
        })
    }
}

fn case_insensitive(pattern: &str) -> std::result::Result<Regex, fancy_regex::Error> {
    Regex::new(&format!("(?i){}", pattern))
}

/// An immutable, ordered list of compiled rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Parse a rules CSV. Lines starting with `#` are comments; a first row
    /// whose first field is `Pattern` is treated as a header.
    pub fn from_csv(text: &str, source_name: &str) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(b'#'))
            .from_reader(text.as_bytes());

        let mut rules = Vec::new();
        for (index, result) in rdr.records().enumerate() {
            let record = result?;
            let line = record.position().map_or(index as u64 + 1, |p| p.line());
            let pattern = record.get(0).unwrap_or_default();
            if index == 0 && pattern.eq_ignore_ascii_case("pattern") {
                continue;
            }
            if record.iter().all(str::is_empty) {
                continue;
            }
            if !(3..=5).contains(&record.len()) {
                return Err(Error::InvalidRule {
                    pattern: pattern.to_string(),
                    line,
                    source_name: source_name.to_string(),
                    reason: format!(
                        "expected Pattern,Merchant,Category[,Subcategory[,Exclude]], found {} columns",
                        record.len()
                    ),
                });
            }

            let field = |i: usize| record.get(i).unwrap_or_default().to_string();
            rules.push(Rule {
                pattern: pattern.to_string(),
                merchant: field(1),
                category: field(2),
                subcategory: field(3),
                exclude: record.get(4).filter(|v| !v.is_empty()).map(str::to_string),
                source_name: source_name.to_string(),
                line,
            });
        }

        let set = Self::new(rules)?;
        debug!("Loaded {} rules from {}", set.len(), source_name);
        Ok(set)
    }

    /// Rules embedded in the binary
    pub fn builtin() -> Result<Self> {
        Self::from_csv(BUILTIN_RULES, BUILTIN_SOURCE)
    }

    /// Join built-in and user rules in the configured order
    pub fn combine(builtin: RuleSet, user: RuleSet, order: RuleOrder) -> Self {
        let (first, second) = match order {
            RuleOrder::BuiltinFirst => (builtin, user),
            RuleOrder::UserFirst => (user, builtin),
        };
        let mut rules = first.rules;
        rules.extend(second.rules);
        Self { rules }
    }

    /// Flag rules whose category counts as travel (case-insensitive)
    pub fn with_travel_categories<S: AsRef<str>>(mut self, categories: &[S]) -> Self {
        for compiled in &mut self.rules {
            compiled.marks_travel = categories
                .iter()
                .any(|c| c.as_ref().eq_ignore_ascii_case(&compiled.rule.category));
        }
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(CompiledRule::rule)
    }

    /// First rule matching an already-normalized description
    pub fn find(&self, normalized: &str) -> Option<(usize, &CompiledRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, compiled)| compiled.is_match(normalized))
    }

    /// Normalize a free-form description and report the winning rule
    pub fn test(&self, description: &str) -> Option<(usize, &Rule)> {
        self.find(&normalize_description(description))
            .map(|(index, compiled)| (index, compiled.rule()))
    }

    /// Assign merchant, category, and travel flag to one transaction
    pub fn classify(
        &self,
        transaction: Transaction,
        home: &HomeLocations,
        policy: &TravelPolicy,
    ) -> ClassifiedTransaction {
        let location_travel = policy.is_travel(&transaction, home);
        match self.find(&transaction.normalized_description) {
            Some((index, compiled)) => {
                let rule = compiled.rule();
                ClassifiedTransaction {
                    merchant: rule.merchant.clone(),
                    category: rule.category.clone(),
                    subcategory: rule.subcategory.clone(),
                    is_travel: location_travel || compiled.marks_travel(),
                    matched_rule_index: Some(index),
                    transaction,
                }
            }
            None => ClassifiedTransaction {
                merchant: UNKNOWN.to_string(),
                category: UNKNOWN.to_string(),
                subcategory: String::new(),
                is_travel: location_travel,
                matched_rule_index: None,
                transaction,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawTransaction;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn rule(pattern: &str, merchant: &str) -> Rule {
        Rule {
            pattern: pattern.to_string(),
            merchant: merchant.to_string(),
            category: "Shopping".to_string(),
            subcategory: String::new(),
            exclude: None,
            source_name: "test".to_string(),
            line: 1,
        }
    }

    fn tx(description: &str) -> Transaction {
        Transaction::from_raw(
            RawTransaction {
                date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
                description: description.to_string(),
                amount: Decimal::new(4512, 2),
                location: None,
            },
            "test",
        )
    }

    fn no_home() -> HomeLocations {
        HomeLocations::infer(&[])
    }

    #[test]
    fn test_lookahead_keeps_surrounding_text() {
        // "SHELL" is a prefix of the word "SHELLX", so `\b` cannot hold after it
        let rules = RuleSet::new(vec![rule(r"SHELL\w*\b(?!\s*OIL)", "Shell")]).unwrap();
        assert!(rules.find("SHELLX OIL").is_none());
        assert!(rules.find("SHELL OIL").is_none());
        assert!(rules.find("SHELL OIL CO SHELLX").is_some());
        assert!(rules.find("SHELL SERVICE STATION").is_some());
    }

    #[test]
    fn test_case_insensitive_search() {
        let rules = RuleSet::new(vec![rule("netflix", "Netflix")]).unwrap();
        assert_eq!(rules.find("NETFLIX.COM").map(|(i, _)| i), Some(0));
        assert_eq!(rules.find("MY NETFLIX BILL").map(|(i, _)| i), Some(0));
        assert!(rules.find("HULU").is_none());
    }

    #[test]
    fn test_negative_lookahead() {
        let rules = RuleSet::new(vec![rule(r"COSTCO(?!\s*GAS)", "Costco")]).unwrap();
        assert!(rules.find("COSTCO GAS").is_none());
        assert!(rules.find("COSTCOGAS").is_none());
        assert!(rules.find("COSTCO WHOLESALE").is_some());
        assert!(rules.find("COSTCO").is_some());
        // A later occurrence without the excluded tail still matches
        assert!(rules.find("COSTCO GAS COSTCO WHSE").is_some());
    }

    #[test]
    fn test_lookahead_tries_other_match_ends() {
        // The lazy search stops at "A", which is followed by "B"; the longer
        // match "AB" is followed by nothing and satisfies the look-ahead
        let rules = RuleSet::new(vec![rule(r"A\w*?(?!B)", "x")]).unwrap();
        assert!(rules.find("AB").is_some());
        let rules = RuleSet::new(vec![rule(r"UBER\s?\w*(?!EATS)", "Uber")]).unwrap();
        assert!(rules.find("UBER TRIP").is_some());
    }

    #[test]
    fn test_first_match_wins_in_file_order() {
        let general_first = RuleSet::new(vec![
            rule("COSTCO", "Costco"),
            rule(r"COSTCO(?!\s*GAS)", "Costco Warehouse"),
        ])
        .unwrap();
        let (index, matched) = general_first.test("COSTCO GAS #123").unwrap();
        assert_eq!(index, 0);
        assert_eq!(matched.merchant, "Costco");

        let specific_first = RuleSet::new(vec![
            rule(r"COSTCO(?!\s*GAS)", "Costco Warehouse"),
            rule("COSTCO", "Costco"),
        ])
        .unwrap();
        assert_eq!(specific_first.test("COSTCO GAS #123").unwrap().0, 1);
        assert_eq!(specific_first.test("COSTCO WHSE #0012").unwrap().0, 0);
    }

    #[test]
    fn test_exclude_column_vetoes_rule() {
        let mut amazon = rule("AMAZON|AMZN", "Amazon");
        amazon.exclude = Some("PRIME VIDEO".to_string());
        let rules = RuleSet::new(vec![amazon, rule("PRIME VIDEO", "Prime Video")]).unwrap();
        assert_eq!(rules.test("AMZN MKTP US").unwrap().1.merchant, "Amazon");
        assert_eq!(rules.test("AMAZON PRIME VIDEO").unwrap().1.merchant, "Prime Video");
    }

    #[test]
    fn test_from_csv_comments_header_and_lines() {
        let csv = "\
Pattern,Merchant,Category,Subcategory
# groceries
WHOLEFDS,Whole Foods,Groceries,
COSTCO\\s*GAS,Costco Gas,Auto,Gas

\"UBER(?!\\s*EATS)\",Uber,Transportation,Rideshare,
SAFEWAY,Safeway,Groceries
";
        let rules = RuleSet::from_csv(csv, "rules.csv").unwrap();
        let all: Vec<&Rule> = rules.rules().collect();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].pattern, "WHOLEFDS");
        assert_eq!(all[0].subcategory, "");
        assert_eq!(all[1].pattern, r"COSTCO\s*GAS");
        assert_eq!(all[2].pattern, r"UBER(?!\s*EATS)");
        assert_eq!(all[2].exclude, None);
        assert!(all.windows(2).all(|w| w[0].line < w[1].line));
        assert_eq!(all[3].subcategory, "");
        assert_eq!(all[3].source_name, "rules.csv");
    }

    #[test]
    fn test_invalid_rule_names_pattern_and_line() {
        let csv = "WHOLEFDS,Whole Foods,Groceries,\nCOSTCO(,Costco,Groceries,\n";
        match RuleSet::from_csv(csv, "mine.csv") {
            Err(Error::InvalidRule {
                pattern,
                line,
                source_name,
                ..
            }) => {
                assert_eq!(pattern, "COSTCO(");
                assert_eq!(line, 2);
                assert_eq!(source_name, "mine.csv");
            }
            other => panic!("expected InvalidRule, got {other:?}"),
        }
    }

    #[test]
    fn test_lookaround_anywhere_in_pattern() {
        let rules = RuleSet::new(vec![rule(r"(?<!APPLE )STORE", "Store")]).unwrap();
        assert!(rules.find("APPLE STORE").is_none());
        assert!(rules.find("CORNER STORE").is_some());

        let rules = RuleSet::new(vec![rule(r"(?!GAS)COSTCO", "Costco")]).unwrap();
        assert!(rules.find("COSTCO WHSE").is_some());

        let rules = RuleSet::new(vec![rule(r"UBER(?=\s*EATS)", "Uber Eats")]).unwrap();
        assert!(rules.find("UBER EATS").is_some());
        assert!(rules.find("UBER TRIP").is_none());

        // Alternation binds looser than the look-ahead
        let rules = RuleSet::new(vec![rule("A|B(?!C)", "x")]).unwrap();
        assert!(rules.find("A").is_some());
        assert!(rules.find("BC").is_none());
        assert!(rules.find("BD").is_some());
    }

    #[test]
    fn test_variable_length_lookbehind_fails_at_load() {
        assert!(matches!(
            RuleSet::new(vec![rule(r"(?<!APPLE\s+)STORE", "Store")]),
            Err(Error::InvalidRule { .. })
        ));
    }

    #[test]
    fn test_wrong_column_count_is_invalid_rule() {
        assert!(matches!(
            RuleSet::from_csv("NETFLIX,Netflix\n", "x.csv"),
            Err(Error::InvalidRule { line: 1, .. })
        ));
        assert!(matches!(
            RuleSet::new(vec![rule("", "x")]),
            Err(Error::InvalidRule { .. })
        ));
    }

    #[test]
    fn test_combine_order() {
        let builtin = RuleSet::new(vec![rule("COSTCO", "Builtin Costco")]).unwrap();
        let user = RuleSet::new(vec![rule("COSTCO", "My Costco")]).unwrap();

        let rules = RuleSet::combine(builtin.clone(), user.clone(), RuleOrder::BuiltinFirst);
        assert_eq!(rules.test("COSTCO").unwrap().1.merchant, "Builtin Costco");
        let rules = RuleSet::combine(builtin, user, RuleOrder::UserFirst);
        assert_eq!(rules.test("COSTCO").unwrap().1.merchant, "My Costco");
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_classify_unknown() {
        let rules = RuleSet::new(vec![rule("NETFLIX", "Netflix")]).unwrap();
        let classified = rules.classify(tx("UBER 12345"), &no_home(), &TravelPolicy::default());
        assert!(classified.is_unknown());
        assert_eq!(classified.merchant, "Unknown");
        assert_eq!(classified.category, "Unknown");
        assert_eq!(classified.subcategory, "");
        assert!(!classified.is_travel);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let rules = RuleSet::builtin().unwrap();
        let policy = TravelPolicy::default();
        let first = rules.classify(tx("SQ *BLUE BOTTLE COFFEE"), &no_home(), &policy);
        let second = rules.classify(tx("SQ *BLUE BOTTLE COFFEE"), &no_home(), &policy);
        assert_eq!(first, second);
    }

    #[test]
    fn test_travel_category_marks_travel() {
        let mut hotel = rule("MARRIOTT", "Marriott");
        hotel.category = "Travel".to_string();
        let rules = RuleSet::new(vec![hotel, rule("SAFEWAY", "Safeway")])
            .unwrap()
            .with_travel_categories(&["travel"]);
        let home = HomeLocations::configured(["WA"]).unwrap();
        let policy = TravelPolicy::default();

        assert!(rules.classify(tx("MARRIOTT PORTLAND OR"), &home, &policy).is_travel);
        assert!(!rules.classify(tx("SAFEWAY PORTLAND OR"), &home, &policy).is_travel);
        assert!(rules.classify(tx("SAFEWAY LONDON GB"), &home, &policy).is_travel);
    }

    #[test]
    fn test_builtin_rules_load() {
        let rules = RuleSet::builtin().unwrap();
        assert!(!rules.is_empty());
        assert!(rules.rules().all(|r| r.source_name == BUILTIN_SOURCE));
        assert_eq!(rules.test("COSTCO GAS #123").unwrap().1.merchant, "Costco Gas");
        assert_eq!(rules.test("COSTCO WHSE #0012").unwrap().1.merchant, "Costco");
    }
}
