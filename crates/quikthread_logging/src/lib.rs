#![deny(missing_docs)]
//! Shared logging utilities for the QuikThread workspace.
//!
//! This crate provides the `qt_*` logging macros used across the codebase,
//! the logger setup used by the `quikthread` binary, and a minimal test
//! initializer for the global logger.
//!
//! Every macro accepts an optional `job = <id>;` prefix which tags the line
//! with the job it concerns:
//!
//! ```
//! quikthread_logging::qt_info!(job = "job-1"; "watch started ({} active)", 1);
//! quikthread_logging::qt_info!("store opened");
//! ```

use std::fs::File;
use std::path::Path;

use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[doc(hidden)]
pub use log as __log;
pub use log::LevelFilter;

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! qt_trace {
    (job = $job:expr; $($arg:tt)+) => {{
        $crate::__log::trace!("[job {}] {}", $job, format_args!($($arg)+));
    }};
    ($($arg:tt)+) => {{
        $crate::__log::trace!($($arg)+);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! qt_debug {
    (job = $job:expr; $($arg:tt)+) => {{
        $crate::__log::debug!("[job {}] {}", $job, format_args!($($arg)+));
    }};
    ($($arg:tt)+) => {{
        $crate::__log::debug!($($arg)+);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! qt_info {
    (job = $job:expr; $($arg:tt)+) => {{
        $crate::__log::info!("[job {}] {}", $job, format_args!($($arg)+));
    }};
    ($($arg:tt)+) => {{
        $crate::__log::info!($($arg)+);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! qt_warn {
    (job = $job:expr; $($arg:tt)+) => {{
        $crate::__log::warn!("[job {}] {}", $job, format_args!($($arg)+));
    }};
    ($($arg:tt)+) => {{
        $crate::__log::warn!($($arg)+);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! qt_error {
    (job = $job:expr; $($arg:tt)+) => {{
        $crate::__log::error!("[job {}] {}", $job, format_args!($($arg)+));
    }};
    ($($arg:tt)+) => {{
        $crate::__log::error!($($arg)+);
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    /// Write to the log file only. Keeps the terminal free for the CLI output.
    #[default]
    File,
    /// Write to the terminal (stderr/stdout mixed).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Installs the global logger.
///
/// For `LogDestination::File` or `Both`, `log_path` is created (truncated).
/// If the file cannot be created the file sink is skipped with a warning on
/// stderr; logging never aborts the program.
pub fn initialize(destination: LogDestination, level: LevelFilter, log_path: &Path) {
    let loggers = build_loggers(destination, level, log_path);
    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}

fn build_loggers(
    destination: LogDestination,
    level: LevelFilter,
    log_path: &Path,
) -> Vec<Box<dyn SharedLogger>> {
    let config = build_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        if let Some(file_logger) = create_file_logger(level, config, log_path) {
            loggers.push(file_logger);
        }
    }
    loggers
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    log_path: &Path,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!(
                "Warning: Could not create log file at {:?}: {}",
                log_path, err
            );
            None
        }
    }
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::{build_loggers, LevelFilter, LogDestination};

    #[test]
    fn both_destinations_build_two_sinks() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("quikthread.log");
        let loggers = build_loggers(LogDestination::Both, LevelFilter::Info, &path);
        assert_eq!(loggers.len(), 2);
        assert!(path.exists());
    }

    #[test]
    fn unwritable_log_file_is_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        // A directory cannot be opened as a log file.
        let loggers = build_loggers(LogDestination::File, LevelFilter::Info, dir.path());
        assert!(loggers.is_empty());
    }

    #[test]
    fn job_prefix_form_expands() {
        super::initialize_for_tests();
        qt_info!(job = "job-1"; "progress {}", 10);
        qt_debug!("plain {}", "line");
    }
}
