//! Entry point for the command-line interface.
//! Delegates to dedicated modules for argument handling,
//! compilation and report output.

use lintbridge::args::{parse_cli, Commands};
use lintbridge::check::{run_ast, run_check, run_symbols};

fn main() -> anyhow::Result<()> {
    let cli = parse_cli();
    match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Symbols(args) => run_symbols(args),
        Commands::Ast(args) => run_ast(args),
    }
}
