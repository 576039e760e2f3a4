// Reporting and output for seedprobe
// Exports logged issues as CSV, Markdown or JSON

use crate::issue::Issue;
use chrono::Local;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Escape CSV field to prevent formula injection attacks
/// Cells starting with =, +, -, @, or tab are prefixed with single quote
fn escape_csv_field(field: &str) -> String {
    let Some(first_char) = field.chars().next() else {
        return String::new();
    };
    let needs_escaping = matches!(first_char, '=' | '+' | '-' | '@' | '\t');

    if needs_escaping {
        format!("\"'{}\"", field.replace('"', "\"\""))
    } else if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Payloads may carry NUL bytes and newlines; keep them visible in text reports
fn printable(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_control() {
            out.extend(c.escape_debug());
        } else {
            out.push(c);
        }
    }
    out
}

fn report_path(dir: &Path, extension: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("seedprobe_report_{}.{}", timestamp, extension))
}

pub fn export_csv(issues: &[Issue], dir: &Path) -> Result<PathBuf, io::Error> {
    let path = report_path(dir, "csv");
    let mut file = File::create(&path)?;

    writeln!(file, "Name,Module,Method,URL,Element,Input,Injected,Pattern,Match,Verified")?;
    for issue in issues {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{}",
            escape_csv_field(&issue.name),
            escape_csv_field(&issue.mod_name),
            issue.method,
            escape_csv_field(&issue.url),
            issue.elem,
            escape_csv_field(&issue.id),
            escape_csv_field(&printable(&issue.injected)),
            escape_csv_field(issue.regexp.as_deref().unwrap_or("")),
            escape_csv_field(issue.regexp_match.as_deref().unwrap_or("")),
            issue.verification
        )?;
    }

    Ok(path)
}

pub fn export_markdown(issues: &[Issue], dir: &Path) -> Result<PathBuf, io::Error> {
    let path = report_path(dir, "md");
    let mut file = File::create(&path)?;

    writeln!(file, "# seedprobe Report\n")?;
    if issues.is_empty() {
        writeln!(file, "No issues found.")?;
    }
    for issue in issues {
        writeln!(
            file,
            "- **{}** {} {} `{}` input `{}`: `{}`",
            issue.name,
            issue.method,
            issue.url,
            issue.elem,
            issue.id,
            printable(&issue.injected)
        )?;
    }

    Ok(path)
}

pub fn export_json(issues: &[Issue], dir: &Path) -> Result<PathBuf, io::Error> {
    let path = report_path(dir, "json");
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, issues)?;
    Ok(path)
}
