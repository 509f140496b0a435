//! Process-wide log level and the `log_*!` macros.
//!
//! Library code that has no `Output` or `ProgressSink` at hand (config
//! loading, git helpers, local state) reports through these macros. The level
//! is fixed once by the binary from `--verbose` / `--quiet`.

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

static LOG_LEVEL: OnceLock<LogLevel> = OnceLock::new();

/// Pick the level from the global CLI flags. Later calls are ignored.
pub fn init_logging(verbose: bool, quiet: bool) {
    let level = match (verbose, quiet) {
        (true, _) => LogLevel::Debug,
        (false, true) => LogLevel::Warning,
        (false, false) => LogLevel::Info,
    };
    LOG_LEVEL.set(level).ok();
}

pub fn get_log_level() -> LogLevel {
    *LOG_LEVEL.get().unwrap_or(&LogLevel::Info)
}

pub fn enabled(level: LogLevel) -> bool {
    level <= get_log_level()
}

pub fn log(level: LogLevel, message: &str) {
    if !enabled(level) {
        return;
    }
    match level {
        LogLevel::Error => eprintln!("error: {message}"),
        LogLevel::Warning => eprintln!("warning: {message}"),
        LogLevel::Info => eprintln!("{message}"),
        LogLevel::Debug => eprintln!("debug: {message}"),
    }
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::LogLevel::Error, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::LogLevel::Warning, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::LogLevel::Debug, &format!($($arg)*))
    };
}
