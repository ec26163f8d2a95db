use clap::ValueEnum;
use frontend::Problem;
use reporters::{Severity, Warning};

/// Supported output formats for reports.
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Sarif,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "sarif" => Ok(Format::Sarif),
            _ => Err("invalid format".into()),
        }
    }
}

impl From<Format> for reporters::Format {
    fn from(fmt: Format) -> Self {
        match fmt {
            Format::Text => reporters::Format::Text,
            Format::Json => reporters::Format::Json,
            Format::Sarif => reporters::Format::Sarif,
        }
    }
}

/// Compiler problems as report warnings, in the order they were produced.
pub fn warnings(problems: &[Problem]) -> Vec<Warning> {
    problems
        .iter()
        .map(|p| {
            let severity = if p.is_error() {
                Severity::Error
            } else if p.severity.is_warning() {
                Severity::Warning
            } else {
                Severity::Info
            };
            Warning::new(
                p.id.name(),
                severity,
                p.file.clone(),
                p.line,
                p.column,
                p.render(),
            )
        })
        .collect()
}
