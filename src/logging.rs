//! Logger setup
//!
//! A small stderr sink behind the `log` facade. The core modules only emit
//! informational and debug messages through the facade; installing this
//! logger (or any other) is optional.

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

struct StderrLogger {
    filter: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = match record.level() {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN".yellow(),
            Level::Info => "INFO".blue(),
            Level::Debug | Level::Trace => "DEBUG".dimmed(),
        };

        eprintln!("[{}] {}: {}", level, record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Install the stderr logger, reading the level from `RUST_LOG` and
/// defaulting to `info`.
pub fn init() {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LevelFilter::Info);

    init_with_level(filter);
}

/// Install the stderr logger with an explicit level filter.
///
/// Does nothing if a global logger is already installed, so repeated calls
/// (e.g. from tests) are harmless.
pub fn init_with_level(filter: LevelFilter) {
    let logger = StderrLogger { filter };

    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_with_level(LevelFilter::Debug);
        init_with_level(LevelFilter::Warn);
        log::debug!("logger installed");
    }
}
