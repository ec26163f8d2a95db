//! Report emitters: compilation statistics plus an ordered list of warnings,
//! rendered as text, JSON or SARIF.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

mod sarif;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
/// Severity of a reported warning.
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Returns the severity colored with simple ANSI codes.
fn color_severity(sev: Severity) -> String {
    let (code, text) = match sev {
        Severity::Info => ("\x1b[32m", "INFO"),
        Severity::Warning => ("\x1b[33m", "WARNING"),
        Severity::Error => ("\x1b[31m", "ERROR"),
    };
    format!("{code}{text}\x1b[0m")
}

fn simple_box(title: &str) -> String {
    let width = title.len() + 2;
    format!(
        "╭{}╮\n│ {} │\n╰{}╯\n",
        "─".repeat(width),
        title,
        "─".repeat(width)
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One reported diagnostic.
pub struct Warning {
    /// Stable fingerprint of rule and location.
    pub id: String,
    pub rule_id: String,
    pub severity: Severity,
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Warning {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        let rule_id = rule_id.into();
        let file = file.into();
        let id = fingerprint(&rule_id, &file, line, column);
        Self {
            id,
            rule_id,
            severity,
            file,
            line,
            column,
            message: message.into(),
        }
    }
}

/// `blake3` of `rule:file:line:column`.
pub fn fingerprint(rule_id: &str, file: &Path, line: usize, column: usize) -> String {
    blake3::hash(format!("{rule_id}:{}:{line}:{column}", file.display()).as_bytes())
        .to_hex()
        .to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Figures of one compile pass.
pub struct Stats {
    pub files: usize,
    pub classpath_entries: usize,
    /// Units that produced a tree.
    pub compiled: usize,
    pub had_errors: bool,
    pub duration_ms: u64,
}

fn stats_table(stats: &Stats) -> String {
    let rule = "    ──────────────────────────────────────────────\n";
    let mut output = simple_box("Compilation");
    output.push('\n');
    output.push_str("    Metric                    Value\n");
    output.push_str(rule);
    output.push_str(&format!("    Source files              {}\n", stats.files));
    output.push_str(&format!(
        "    Classpath entries         {}\n",
        stats.classpath_entries
    ));
    output.push_str(&format!("    Compiled units            {}\n", stats.compiled));
    output.push_str(&format!(
        "    Errors                    {}\n",
        if stats.had_errors { "yes" } else { "no" }
    ));
    output.push_str(&format!(
        "    Duration                  {}ms\n",
        stats.duration_ms
    ));
    output
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Supported report formats.
pub enum Format {
    /// Human-readable output in plain text.
    Text,
    /// JSON structure for integrations.
    Json,
    /// Report conforming to the SARIF specification.
    Sarif,
}

#[derive(Serialize)]
struct ReportOut<'a> {
    stats: &'a Stats,
    warnings: &'a [Warning],
    total: usize,
}

/// Writes the report to `path`, or to stdout when `path` is `None`.
///
/// # Example
/// ```
/// use reporters::{write_report, Format, Stats, Severity, Warning};
/// let warnings = vec![Warning::new("UndefinedMethod", Severity::Error, "A.java", 1, 10, "m() is undefined")];
/// write_report(None, &Stats::default(), &warnings, Format::Text).unwrap();
/// ```
pub fn write_report(
    path: Option<&Path>,
    stats: &Stats,
    warnings: &[Warning],
    fmt: Format,
) -> io::Result<()> {
    match path {
        Some(path) => {
            debug!(file = %path.display(), warnings = warnings.len(), "Writing report");
            let mut out = BufWriter::new(File::create(path)?);
            render(&mut out, stats, warnings, fmt)?;
            out.flush()
        }
        None => render(&mut io::stdout().lock(), stats, warnings, fmt),
    }
}

/// Renders to a generic `Write`; warnings keep the order they are given in.
pub fn render<W: Write>(
    out: &mut W,
    stats: &Stats,
    warnings: &[Warning],
    fmt: Format,
) -> io::Result<()> {
    match fmt {
        Format::Text => {
            writeln!(out, "{}", stats_table(stats))?;
            writeln!(out, "{}", simple_box("Diagnostics"))?;
            if warnings.is_empty() {
                writeln!(out, "✔ No problems reported.")?;
                return Ok(());
            }
            for w in warnings {
                writeln!(
                    out,
                    "{} {}:{}:{} {}",
                    color_severity(w.severity),
                    w.file.display(),
                    w.line,
                    w.column,
                    w.rule_id
                )?;
                writeln!(out, "    {}", w.message)?;
            }
            writeln!(out)?;
            writeln!(out, "Total: {}", warnings.len())?;
        }
        Format::Json => {
            let json = ReportOut {
                stats,
                warnings,
                total: warnings.len(),
            };
            serde_json::to_writer_pretty(&mut *out, &json)?;
            writeln!(out)?;
        }
        Format::Sarif => {
            let sarif = sarif::to_sarif(warnings);
            serde_json::to_writer_pretty(&mut *out, &sarif)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
