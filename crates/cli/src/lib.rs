//! Command line front of the resolution bridge.
use tracing::{debug, error};
use tracing_subscriber::filter::LevelFilter;

pub mod args;
pub mod check;
pub mod config;
pub mod output;

/// Installs the stderr subscriber and sizes the global rayon pool.
/// `quiet` wins over `debug`.
pub fn init_logging(debug: bool, quiet: bool, threads: usize) {
    let level = if quiet {
        LevelFilter::OFF
    } else if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    if debug && !quiet {
        debug!("Debug mode enabled");
    }
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        error!("Failed to build global thread pool: {e}");
    }
}
