//! Format string checking

use anyhow::{Context, Result};
use budget_core::{ColumnRole, FormatSpec};

pub fn cmd_formats_check(format: &str) -> Result<()> {
    let spec = FormatSpec::parse(format).context("Invalid format string")?;
    print!("{}", describe_format(&spec));
    Ok(())
}

/// Column-by-column description of a compiled format
pub fn describe_format(spec: &FormatSpec) -> String {
    let delimiter = match spec.delimiter() {
        '\t' => "tab".to_string(),
        c => format!("'{}'", c),
    };

    let mut out = format!(
        "✅ {} columns, delimiter {}, at least {} per row\n",
        spec.columns().len(),
        delimiter,
        spec.required_width()
    );
    for (index, role) in spec.columns().iter().enumerate() {
        let detail = match role {
            ColumnRole::Date { format } => format!("date ({})", format),
            ColumnRole::Skip => "skipped".to_string(),
            other => other.to_string().trim_matches(|c| c == '{' || c == '}').to_string(),
        };
        out.push_str(&format!("   {:>3}  {}\n", index + 1, detail));
    }
    out
}
