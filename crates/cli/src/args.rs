use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use loader::Encoding;
use reporters::Severity;
use std::path::PathBuf;

use crate::output::Format;

fn parse_severity(s: &str) -> Result<Severity, String> {
    s.parse()
}

fn parse_encoding(s: &str) -> Result<Encoding, String> {
    s.parse()
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn parse_threads(s: &str) -> Result<usize, String> {
    let v: usize = s
        .parse()
        .map_err(|e: std::num::ParseIntError| e.to_string())?;
    if v == 0 {
        Err("threads must be greater than 0".into())
    } else {
        Ok(v)
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "lintbridge - compiles Java sources and answers symbol queries for analysis rules",
    long_about = "lintbridge runs a Java front-end over a project's sources and classpath and exposes the resulting bindings as resolved symbols.

Examples:
  lintbridge check src/                          # Report compiler diagnostics
  lintbridge check --project project.yaml        # Sources and classpath from build metadata
  lintbridge symbols src/ --class app.Service    # Describe a class and its members
  lintbridge ast src/Main.java --format dot      # Dump the generic tree",
    subcommand_required = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile the sources and report diagnostics
    Check(CheckArgs),
    /// Describe resolved classes, their members and annotations
    Symbols(SymbolsArgs),
    /// Print the generic tree converted from each compiled unit
    Ast(AstArgs),
}

/// Inputs shared by every command.
#[derive(ClapArgs, Clone)]
pub struct InputArgs {
    /// Java files or directories to compile
    pub paths: Vec<PathBuf>,
    /// Project metadata file (YAML or JSON) supplying sources and classpath
    #[arg(long)]
    pub project: Option<PathBuf>,
    /// Additional classpath entries, searched before the project's
    #[arg(long, value_delimiter = ',')]
    pub classpath: Vec<PathBuf>,
    /// Charset of the source files
    #[arg(long, value_parser = parse_encoding)]
    pub encoding: Option<Encoding>,
    /// External annotation database (JSON)
    #[arg(long)]
    pub annotations: Option<PathBuf>,
    /// Node budget of one compile pass
    #[arg(long = "max-tree-nodes")]
    pub max_tree_nodes: Option<usize>,
    /// Number of threads used to read sources
    #[arg(long, default_value_t = default_threads(), value_parser = parse_threads)]
    pub threads: usize,
    /// Enable debug output and dump compiler problems
    #[arg(long)]
    pub debug: bool,
    /// Suppress non-essential output
    #[arg(long)]
    pub quiet: bool,
}

#[derive(ClapArgs)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format for the report
    #[arg(long, value_enum)]
    pub format: Option<Format>,
    /// Write the report to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Exit with error code if diagnostics of this severity or higher are reported
    #[arg(long = "fail-on", value_parser = parse_severity)]
    pub fail_on: Option<Severity>,
}

#[derive(ClapArgs)]
pub struct SymbolsArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Qualified names of the classes to describe (all declared classes by default)
    #[arg(long = "class")]
    pub classes: Vec<String>,
    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AstFormat {
    Json,
    Dot,
}

#[derive(ClapArgs)]
pub struct AstArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Tree output format
    #[arg(long, value_enum, default_value_t = AstFormat::Json)]
    pub format: AstFormat,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_severity_rejects_invalid_input() {
        assert!(parse_severity("bogus").is_err());
    }

    #[test]
    fn threads_must_be_positive() {
        assert!(parse_threads("0").is_err());
        assert_eq!(parse_threads("3"), Ok(3));
    }

    #[test]
    fn classpath_entries_split_on_commas() {
        let cli = Cli::try_parse_from([
            "lintbridge",
            "check",
            "src",
            "--classpath",
            "a.jar,b.jar",
            "--encoding",
            "latin1",
        ])
        .unwrap();
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.input.classpath, vec![PathBuf::from("a.jar"), PathBuf::from("b.jar")]);
        assert_eq!(args.input.encoding, Some(Encoding::Latin1));
        assert_eq!(args.input.paths, vec![PathBuf::from("src")]);
    }
}
