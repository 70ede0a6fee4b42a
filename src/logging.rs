//! Log output for the command-line tool.

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use log::LevelFilter;

/// Install the global logger.
///
/// Messages go to stderr at `Info`, or `Debug` when `verbose` is set, in
/// which case every rejected record is logged with its reason. A log file,
/// if given, always receives `Debug` output.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let dispatch = fern::Dispatch::new().format(|out, message, record| {
        out.finish(format_args!(
            "{}[{}][{}] {}",
            chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
            record.target(),
            record.level(),
            message
        ))
    });

    let dispatch = match log_file {
        Some(path) => dispatch
            .chain(
                fern::Dispatch::new()
                    .level(LevelFilter::Debug)
                    .chain(fern::log_file(path).with_context(|| {
                        format!("failed to open log file {}", path.display())
                    })?),
            )
            .chain(
                fern::Dispatch::new()
                    .level(stderr_level)
                    .chain(io::stderr()),
            ),
        None => dispatch.level(stderr_level).chain(io::stderr()),
    };

    dispatch.apply().context("logger already initialized")
}
