#![deny(missing_docs)]
//! Shared logging setup for the keepsake workspace.
//!
//! The engine and core crates log through the `log` facade only; this crate
//! owns the `simplelog` backends so the embedding application and the test
//! suites initialize them the same way.

use std::path::Path;

/// Initializes a terminal logger at the given level for application use.
///
/// Returns `false` if a global logger was already installed.
pub fn initialize_terminal(level: log::LevelFilter) -> bool {
    use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

    TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto).is_ok()
}

/// Initializes a combined terminal + file logger for application use.
///
/// The file logger captures everything at `Debug`; the terminal stays at the
/// requested level. Returns `false` if a global logger was already installed
/// or the log file could not be created.
pub fn initialize_with_file(level: log::LevelFilter, log_path: &Path) -> bool {
    use simplelog::{
        ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger,
    };

    let Ok(file) = std::fs::File::create(log_path) else {
        return false;
    };

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(log::LevelFilter::Debug, Config::default(), file),
    ])
    .is_ok()
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
