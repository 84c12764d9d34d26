//! Logging setup
//!
//! Every record goes to stdout with a coloured level tag, and to the session log file in plain
//! text. Timestamps are seconds since the start of the session.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use fern::{Dispatch, FormatCallback};
use log::{info, Level, Record};
use std::fmt::Arguments;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Modules which log every control cycle, these are capped at `Debug` so that
/// a trace level session log stays readable. Submodules are capped with them.
const HIGH_RATE_TARGETS: [&str; 6] = [
    "drive_lib::accept",
    "drive_lib::ctrl",
    "drive_lib::follow",
    "drive_lib::odom",
    "drive_lib::profile",
    "drive_lib::sim",
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The minimum log level must include `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Cannot open the session log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise logging for this session.
///
/// `min_level` must be at least `Info`. Call once per process, a second call
/// fails with [`LoggerInitError::FernInitError`].
pub fn logger_init(
    min_level: LevelFilter,
    session: &Session
) -> Result<(), LoggerInitError> {

    if min_level < LevelFilter::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    level_dispatch(min_level)
        .chain(Dispatch::new()
            .format(|out, message, record| format_record(out, message, record, true))
            .chain(std::io::stdout()))
        .chain(Dispatch::new()
            .format(|out, message, record| format_record(out, message, record, false))
            .chain(log_file))
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Root dispatch passing records at `min_level`, with the high rate targets
/// capped.
fn level_dispatch(min_level: LevelFilter) -> Dispatch {
    HIGH_RATE_TARGETS.iter().fold(
        Dispatch::new().level(min_level),
        |root, target| root.level_for(*target, min_level.min(LevelFilter::Debug))
    )
}

/// Format a record as `[time LVL] target: message`, the target only being
/// shown for debug and trace records.
fn format_record(out: FormatCallback, message: &Arguments, record: &Record, colour: bool) {
    let level = if colour {
        level_tag(record.level()).to_string()
    }
    else {
        level_tag(record.level()).clear().to_string()
    };

    if record.level() > Level::Info {
        out.finish(format_args!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            level,
            record.target(),
            message
        ))
    }
    else {
        out.finish(format_args!(
            "[{:10.6} {}] {}",
            session::get_elapsed_seconds(),
            level,
            message
        ))
    }
}

/// Three letter tag for a log level.
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info  => "INF".normal(),
        Level::Warn  => "WRN".yellow(),
        Level::Error => "ERR".red().bold()
    }
}
