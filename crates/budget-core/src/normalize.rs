//! Description normalization
//!
//! Card processors decorate merchant names with channel prefixes ("SQ *",
//! "TST*", "AplPay ") and volatile suffixes (store numbers, zip codes,
//! reference numbers). Rules match against the cleaned, uppercased text so a
//! single pattern keeps working across processors and statement months.
//!
//! The cleanup is lossy on purpose and idempotent: normalizing an already
//! normalized description returns it unchanged.

/// Payment-processor and wallet prefixes, matched case-insensitively at the
/// start of the description. Longer spellings come before their shorter
/// variants so "SP *" wins over "SP ".
const PROCESSOR_PREFIXES: &[&str] = &[
    "APPLE PAY ",
    "APLPAY ",
    "GOOGLE PAY ",
    "GOOGLE *",
    "GPAY ",
    "PAYPAL *",
    "SQ * ",
    "SQ *",
    "SQ*",
    "TST* ",
    "TST*",
    "SP * ",
    "SP *",
    "SP ",
    "PP*",
    "PY *",
    "IC*",
    "BT*",
    "DNH*",
];

/// Minimum length of a digit run glued to the end of a word that counts as
/// a reference number (e.g. "WALMART.COM8009666546")
const GLUED_DIGIT_RUN: usize = 4;

/// Canonical uppercase form used for rule matching and discovery
pub fn normalize_description(raw: &str) -> String {
    clean(raw).to_uppercase()
}

/// Cleaned description that keeps the statement's original casing, for reports
pub fn display_description(raw: &str) -> String {
    clean(raw)
}

fn clean(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_prefix = strip_prefixes(&collapsed);
    strip_trailing_noise(without_prefix).to_string()
}

/// Remove processor prefixes, repeatedly ("APLPAY SQ *FOO" -> "FOO")
fn strip_prefixes(s: &str) -> &str {
    let mut current = s;
    loop {
        let stripped = PROCESSOR_PREFIXES.iter().find_map(|prefix| {
            let head = current.get(..prefix.len())?;
            if !head.eq_ignore_ascii_case(prefix) {
                return None;
            }
            let rest = current[prefix.len()..].trim_start();
            (!rest.is_empty()).then_some(rest)
        });
        match stripped {
            Some(rest) => current = rest,
            None => return current,
        }
    }
}

/// Remove trailing store ids, zip codes, and reference numbers.
/// Never strips the description down to nothing.
fn strip_trailing_noise(s: &str) -> &str {
    let mut current = s.trim_end();
    loop {
        let next = drop_numeric_token(current).or_else(|| drop_glued_digits(current));
        match next {
            Some(rest) if !rest.is_empty() => current = rest,
            _ => return current,
        }
    }
}

/// "FOO 12345" -> "FOO", "FOO #0123" -> "FOO"
fn drop_numeric_token(s: &str) -> Option<&str> {
    let (rest, last) = s.rsplit_once(' ')?;
    let digits = last.trim_start_matches('#');
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(rest.trim_end())
    } else {
        None
    }
}

/// "WALMART.COM8009666546" -> "WALMART.COM"
fn drop_glued_digits(s: &str) -> Option<&str> {
    let trailing = s.bytes().rev().take_while(|b| b.is_ascii_digit()).count();
    if trailing < GLUED_DIGIT_RUN {
        return None;
    }
    let rest = s[..s.len() - trailing].trim_end_matches(['#', '-', '*', ' ']);
    Some(rest)
}
