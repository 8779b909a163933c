//! Format strings for generic CSV sources
//!
//! A format string names the role of every column, in order:
//!
//! ```text
//! {date:%m/%d/%Y}, {_}, {description}, {_}, {amount}
//! {date:%Y-%m-%d}; {description}; {location}; {amount}
//! ```
//!
//! - `{role}` or `{role:pattern}` maps a column; only `date` uses the pattern
//!   (strptime syntax, default `%m/%d/%Y`)
//! - `{_}` (or `{skip}`) discards a column
//! - the separator between placeholders (`,` `;` `|` or tab) is the CSV delimiter
//!
//! Exactly one `date`, one `amount`, and one `description` are required;
//! `location` and skipped columns may repeat.

use std::fmt;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};

use crate::error::{Error, Result};

pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

const SEPARATORS: &[char] = &[',', ';', '|', '\t'];

/// What a column holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRole {
    Date { format: String },
    Description,
    Amount,
    Location,
    Skip,
}

impl ColumnRole {
    fn parse(name: &str, pattern: Option<&str>, token: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "date" => {
                let format = pattern
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .unwrap_or(DEFAULT_DATE_FORMAT);
                if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                    return Err(Error::format_spec(
                        token,
                        format!("invalid date pattern '{}'", format),
                    ));
                }
                Ok(Self::Date {
                    format: format.to_string(),
                })
            }
            "description" => Ok(Self::Description),
            "amount" => Ok(Self::Amount),
            "location" => Ok(Self::Location),
            "_" | "skip" => Ok(Self::Skip),
            other => Err(Error::format_spec(
                token,
                format!(
                    "unknown role '{}' (expected date, description, amount, location, or _)",
                    other
                ),
            )),
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date { format } => write!(f, "{{date:{}}}", format),
            Self::Description => write!(f, "{{description}}"),
            Self::Amount => write!(f, "{{amount}}"),
            Self::Location => write!(f, "{{location}}"),
            Self::Skip => write!(f, "{{_}}"),
        }
    }
}

/// Compiled column layout for one data source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    columns: Vec<ColumnRole>,
    delimiter: char,
    date_column: usize,
    description_column: usize,
    amount_column: usize,
}

impl FormatSpec {
    pub fn parse(source: &str) -> Result<Self> {
        let (tokens, delimiter) = tokenize(source)?;

        let mut columns = Vec::with_capacity(tokens.len());
        let mut date_column = None;
        let mut description_column = None;
        let mut amount_column = None;

        for (index, token) in tokens.iter().enumerate() {
            let (name, pattern) = match token.split_once(':') {
                Some((name, pattern)) => (name, Some(pattern)),
                None => (token.as_str(), None),
            };
            let display = format!("{{{}}}", token);
            let role = ColumnRole::parse(name, pattern, &display)?;

            let slot = match role {
                ColumnRole::Date { .. } => Some((&mut date_column, "date")),
                ColumnRole::Description => Some((&mut description_column, "description")),
                ColumnRole::Amount => Some((&mut amount_column, "amount")),
                ColumnRole::Location | ColumnRole::Skip => None,
            };
            if let Some((slot, role_name)) = slot {
                if slot.is_some() {
                    return Err(Error::format_spec(
                        display,
                        format!("duplicate '{}' role at column {}", role_name, index),
                    ));
                }
                *slot = Some(index);
            }
            columns.push(role);
        }

        let missing = |role: &str| {
            Error::format_spec(source, format!("missing required '{}' role", role))
        };
        Ok(Self {
            date_column: date_column.ok_or_else(|| missing("date"))?,
            description_column: description_column.ok_or_else(|| missing("description"))?,
            amount_column: amount_column.ok_or_else(|| missing("amount"))?,
            columns,
            delimiter,
        })
    }

    pub fn columns(&self) -> &[ColumnRole] {
        &self.columns
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn date_column(&self) -> usize {
        self.date_column
    }

    pub fn date_format(&self) -> &str {
        match &self.columns[self.date_column] {
            ColumnRole::Date { format } => format,
            _ => DEFAULT_DATE_FORMAT,
        }
    }

    pub fn description_column(&self) -> usize {
        self.description_column
    }

    pub fn amount_column(&self) -> usize {
        self.amount_column
    }

    /// Location columns in column order; the first non-empty value is used
    pub fn location_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, role)| matches!(role, ColumnRole::Location))
            .map(|(index, _)| index)
    }

    /// Number of fields a row needs to reach every mapped column
    pub fn required_width(&self) -> usize {
        self.columns
            .iter()
            .rposition(|role| !matches!(role, ColumnRole::Skip))
            .map_or(0, |index| index + 1)
    }
}

impl FromStr for FormatSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.delimiter == '\t' {
            "\t".to_string()
        } else {
            format!("{} ", self.delimiter)
        };
        let parts: Vec<String> = self.columns.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(&separator))
    }
}

/// Split a format string into placeholder bodies and the shared delimiter
fn tokenize(source: &str) -> Result<(Vec<String>, char)> {
    let mut tokens = Vec::new();
    let mut literals = Vec::new();
    let mut literal = String::new();
    let mut chars = source.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut body = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => {
                            return Err(Error::format_spec(
                                format!("{{{}{{", body),
                                "nested '{' inside placeholder",
                            ))
                        }
                        _ => body.push(inner),
                    }
                }
                if !closed {
                    return Err(Error::format_spec(format!("{{{}", body), "unclosed placeholder"));
                }
                literals.push(std::mem::take(&mut literal));
                tokens.push(body);
            }
            '}' => return Err(Error::format_spec("}", "unmatched '}'")),
            _ => literal.push(c),
        }
    }
    literals.push(literal);

    if tokens.is_empty() {
        return Err(Error::format_spec(source, "no column placeholders"));
    }

    // literals[0] and the last literal surround the placeholders; everything
    // in between must be exactly one separator
    let first = &literals[0];
    if !first.trim().is_empty() {
        return Err(Error::format_spec(first.as_str(), "text before first placeholder"));
    }
    let last = &literals[literals.len() - 1];
    let between = &literals[1..literals.len() - 1];
    if !last.trim().is_empty() {
        return Err(Error::format_spec(last.as_str(), "text after last placeholder"));
    }

    let mut delimiter = None;
    for (index, sep) in between.iter().enumerate() {
        let found = separator_of(sep).ok_or_else(|| {
            Error::format_spec(
                format!("{{{}}}{}{{{}}}", tokens[index], sep, tokens[index + 1]),
                "placeholders must be separated by one of , ; | or tab",
            )
        })?;
        match delimiter {
            None => delimiter = Some(found),
            Some(existing) if existing != found => {
                return Err(Error::format_spec(
                    sep.as_str(),
                    format!("mixed separators '{}' and '{}'", existing, found),
                ))
            }
            Some(_) => {}
        }
    }

    Ok((tokens, delimiter.unwrap_or(',')))
}

fn separator_of(literal: &str) -> Option<char> {
    let marks: Vec<char> = literal.chars().filter(|c| *c != ' ').collect();
    match marks.as_slice() {
        [c] if SEPARATORS.contains(c) => Some(*c),
        _ => None,
    }
}
