//! Statement readers
//!
//! Three readers turn statement text into [`RawTransaction`]s:
//! - AMEX: `Date,Description,Amount` CSV, charges positive
//! - BOA: line-oriented text statements, `MM/DD/YYYY <description> <amount> <balance>`;
//!   deposits are told apart from spend by the running balance
//! - CSV: any layout described by a [`FormatSpec`]
//!
//! Amount signs are normalized here, once, so that spend is positive for
//! every downstream component. A row that fails to parse is reported as a
//! warning and skipped; it never aborts the source.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::format_spec::FormatSpec;
use crate::models::{AmountSign, RawTransaction, StatementFormat};

const AMEX_COLUMNS: usize = 3;
// Two-digit years first: %Y would read "24" as year 24
const AMEX_DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y"];

const BOA_DATE_PREFIX: &str = r"^\d{2}/\d{2}/\d{4}(\s|$)";
const BOA_LINE: &str =
    r"^(\d{2}/\d{2}/\d{4})\s+(.+?)\s+(-?\$?[\d,]*\.\d{2})\s+(-?\$?[\d,]*\.\d{2})\s*$";
const BOA_DATE_FORMAT: &str = "%m/%d/%Y";

/// A configured reader for one data source
#[derive(Debug, Clone, PartialEq)]
pub enum StatementReader {
    Amex,
    Boa,
    Csv {
        spec: FormatSpec,
        has_header: bool,
        sign: AmountSign,
    },
}

impl StatementReader {
    pub fn format(&self) -> StatementFormat {
        match self {
            Self::Amex => StatementFormat::Amex,
            Self::Boa => StatementFormat::Boa,
            Self::Csv { .. } => StatementFormat::Csv,
        }
    }

    /// Lazily read rows; `Err` items are either row-level (skip and count)
    /// or fatal for the source
    pub fn rows<'a>(
        &'a self,
        text: &'a str,
    ) -> Result<Box<dyn Iterator<Item = Result<RawTransaction>> + 'a>> {
        Ok(match self {
            Self::Amex => Box::new(amex_rows(text)),
            Self::Boa => Box::new(boa_rows(text)?),
            Self::Csv {
                spec,
                has_header,
                sign,
            } => Box::new(csv_rows(text, spec, *has_header, *sign)),
        })
    }
}

/// Rows read from one statement plus the rows that were skipped
#[derive(Debug, Default)]
pub struct ParsedStatement {
    pub rows: Vec<RawTransaction>,
    pub warnings: Vec<Error>,
}

/// Read a whole statement, collecting row-level failures as warnings
pub fn parse_statement(text: &str, reader: &StatementReader) -> Result<ParsedStatement> {
    let mut parsed = ParsedStatement::default();
    for row in reader.rows(text)? {
        match row {
            Ok(tx) => parsed.rows.push(tx),
            Err(e) if e.is_row_level() => {
                warn!("Skipping {} row: {}", reader.format(), e);
                parsed.warnings.push(e);
            }
            Err(e) => return Err(e),
        }
    }
    debug!(
        "Parsed {} {} transactions ({} skipped)",
        parsed.rows.len(),
        reader.format(),
        parsed.warnings.len()
    );
    Ok(parsed)
}

/// Guess the built-in layout from statement text
///
/// Returns None when neither the AMEX header nor BOA transaction lines are
/// present; such files need an explicit format string.
pub fn detect_format(text: &str) -> Option<StatementFormat> {
    let header = text.lines().find(|l| !l.trim().is_empty())?.trim();
    let columns: Vec<String> = header
        .split(',')
        .map(|c| c.trim().trim_matches('"').to_lowercase())
        .collect();
    if columns == ["date", "description", "amount"] {
        return Some(StatementFormat::Amex);
    }

    let line_re = Regex::new(BOA_LINE).ok()?;
    if text.lines().any(|l| line_re.is_match(l.trim())) {
        return Some(StatementFormat::Boa);
    }
    None
}

fn line_of(record: &StringRecord, fallback: usize) -> usize {
    record.position().map_or(fallback, |p| p.line() as usize)
}

fn amex_rows(text: &str) -> impl Iterator<Item = Result<RawTransaction>> + '_ {
    let rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    rdr.into_records()
        .enumerate()
        .filter_map(|(index, result)| {
            let record = match result {
                Ok(record) => record,
                Err(e) => return Some(Err(Error::Csv(e))),
            };
            let row = line_of(&record, index + 1);
            let is_header = index == 0
                && record
                    .get(0)
                    .is_some_and(|field| field.eq_ignore_ascii_case("date"));
            if is_header || record.iter().all(str::is_empty) {
                return None;
            }
            Some(amex_row(&record, row))
        })
}

fn amex_row(record: &StringRecord, row: usize) -> Result<RawTransaction> {
    if record.len() != AMEX_COLUMNS {
        return Err(Error::MalformedRow {
            row,
            expected: AMEX_COLUMNS,
            found: record.len(),
        });
    }
    let date = parse_date(&record[0], AMEX_DATE_FORMATS)
        .ok_or_else(|| Error::row_parse(row, &record[0], "invalid date"))?;
    let amount = parse_amount(&record[2])
        .ok_or_else(|| Error::row_parse(row, &record[2], "invalid amount"))?;

    Ok(RawTransaction {
        date,
        description: record[1].to_string(),
        amount: AmountSign::ChargesPositive.to_spend(amount),
        location: None,
    })
}

fn boa_rows(text: &str) -> Result<impl Iterator<Item = Result<RawTransaction>> + '_> {
    let date_prefix = Regex::new(BOA_DATE_PREFIX)?;
    let line_re = Regex::new(BOA_LINE)?;

    let mut previous_balance = None;
    Ok(text.lines().enumerate().filter_map(move |(index, line)| {
        let line = line.trim();
        // Headers, footers, and balance summaries never start with a date
        if !date_prefix.is_match(line) {
            return None;
        }
        let row = boa_row(&line_re, line, index + 1, previous_balance);
        previous_balance = row.as_ref().ok().and_then(|(_, balance)| *balance);
        Some(row.map(|(tx, _)| tx))
    }))
}

/// Parse one dated line into a transaction and its running balance
fn boa_row(
    line_re: &Regex,
    line: &str,
    row: usize,
    previous_balance: Option<Decimal>,
) -> Result<(RawTransaction, Option<Decimal>)> {
    let caps = line_re.captures(line).ok_or_else(|| {
        Error::row_parse(row, line, "expected MM/DD/YYYY <description> <amount> <balance>")
    })?;
    let date = parse_date(&caps[1], &[BOA_DATE_FORMAT])
        .ok_or_else(|| Error::row_parse(row, &caps[1], "invalid date"))?;
    let amount = parse_amount(&caps[3])
        .ok_or_else(|| Error::row_parse(row, &caps[3], "invalid amount"))?;
    let balance = parse_amount(&caps[4]);

    let tx = RawTransaction {
        date,
        description: caps[2].trim().to_string(),
        amount: boa_spend(amount, balance, previous_balance),
        location: None,
    };
    Ok((tx, balance))
}

/// Spend sign for a BOA line. A running balance that rose since the previous
/// line marks a deposit or credit. Without a previous balance the magnitude
/// counts as spend.
fn boa_spend(amount: Decimal, balance: Option<Decimal>, previous: Option<Decimal>) -> Decimal {
    match (previous, balance) {
        (Some(previous), Some(balance)) if balance > previous => -amount.abs(),
        _ => amount.abs(),
    }
}

fn csv_rows<'a>(
    text: &'a str,
    spec: &'a FormatSpec,
    has_header: bool,
    sign: AmountSign,
) -> impl Iterator<Item = Result<RawTransaction>> + 'a {
    let rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(spec.delimiter() as u8)
        .from_reader(text.as_bytes());

    rdr.into_records()
        .enumerate()
        .skip(usize::from(has_header))
        .filter_map(move |(index, result)| {
            let record = match result {
                Ok(record) => record,
                Err(e) => return Some(Err(Error::Csv(e))),
            };
            if record.iter().all(str::is_empty) {
                return None;
            }
            let row = line_of(&record, index + 1);
            Some(csv_row(&record, row, spec, sign))
        })
}

fn csv_row(
    record: &StringRecord,
    row: usize,
    spec: &FormatSpec,
    sign: AmountSign,
) -> Result<RawTransaction> {
    if record.len() < spec.required_width() {
        return Err(Error::MalformedRow {
            row,
            expected: spec.required_width(),
            found: record.len(),
        });
    }

    let date_value = &record[spec.date_column()];
    let date = parse_date(date_value, &[spec.date_format()]).ok_or_else(|| {
        Error::row_parse(
            row,
            date_value,
            format!("date does not match '{}'", spec.date_format()),
        )
    })?;

    let amount_value = &record[spec.amount_column()];
    let amount = parse_amount(amount_value)
        .ok_or_else(|| Error::row_parse(row, amount_value, "invalid amount"))?;

    let location = spec
        .location_columns()
        .filter_map(|col| record.get(col))
        .find(|value| !value.is_empty())
        .map(str::to_string);

    Ok(RawTransaction {
        date,
        description: record[spec.description_column()].to_string(),
        amount: sign.to_spend(amount),
        location,
    })
}

/// Parse a date with the first matching strptime pattern; patterns that
/// include a time of day are accepted and the time is dropped
fn parse_date(s: &str, formats: &[&str]) -> Option<NaiveDate> {
    let s = s.trim();
    formats.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(s, fmt)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
    })
}

/// Parse an amount string, handling currency symbols, thousands separators,
/// accounting parentheses, and trailing minus signs
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let parenthesized = s.strip_prefix('(').and_then(|v| v.strip_suffix(')'));
    let (negative, inner) = if let Some(inner) = parenthesized {
        (true, inner)
    } else if let Some(inner) = s.strip_suffix('-') {
        (true, inner)
    } else {
        (false, s)
    };
    let cleaned = inner.replace(['$', ',', ' '], "");
    let value = Decimal::from_str(&cleaned).ok()?;
    Some(if negative { -value } else { value })
}
