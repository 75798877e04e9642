//! Process-wide logging bootstrap.
//!
//! Stores emit `event=... module=...` lines through the `log` facade; this
//! module wires a `flexi_logger` backend behind it. Hosts that already run
//! their own logger never need to call `init_logging`.
//!
//! Initialization happens at most once per process. Repeating it with the
//! same settings is a no-op; asking for different settings is an error.

use std::path::{Path, PathBuf};

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;

use crate::error::EngineError;

const LOG_FILE_BASENAME: &str = "recordbox";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    /// `None` when logging to stderr.
    log_dir: Option<PathBuf>,
    _logger: LoggerHandle,
}

/// Starts the logger at `level`, writing rotated files under `log_dir` or to
/// stderr when no directory is given.
///
/// # Errors
/// - `level` is not one of trace|debug|info|warn|error.
/// - `log_dir` is relative or cannot be created.
/// - Logging is already active with a different level or destination.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<(), EngineError> {
    let level = normalize_level(level)?;
    let log_dir = log_dir.map(normalize_log_dir).transpose()?;

    let state = LOGGING_STATE.get_or_try_init(|| start(level, log_dir.clone()))?;

    if state.log_dir != log_dir {
        return Err(EngineError::Logging(format!(
            "logging already initialized at {}; refusing to switch to {}",
            describe(state.log_dir.as_deref()),
            describe(log_dir.as_deref())
        )));
    }
    if state.level != level {
        return Err(EngineError::Logging(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            state.level, level
        )));
    }
    Ok(())
}

/// `(level, log_dir)` of the active logger, if any.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.log_dir.clone()))
}

pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) { "debug" } else { "info" }
}

pub fn normalize_level(level: &str) -> Result<&'static str, EngineError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(EngineError::Logging(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        ))),
    }
}

fn normalize_log_dir(dir: &Path) -> Result<PathBuf, EngineError> {
    if dir.as_os_str().is_empty() {
        return Err(EngineError::Logging("log directory cannot be empty".into()));
    }
    if !dir.is_absolute() {
        return Err(EngineError::Logging(format!(
            "log directory must be absolute, got `{}`",
            dir.display()
        )));
    }
    Ok(dir.to_path_buf())
}

fn describe(dir: Option<&Path>) -> String {
    match dir {
        Some(d) => format!("`{}`", d.display()),
        None => "stderr".to_string(),
    }
}

fn start(level: &'static str, log_dir: Option<PathBuf>) -> Result<LoggingState, EngineError> {
    let logger = Logger::try_with_str(level)
        .map_err(|e| EngineError::Logging(format!("invalid log level `{level}`: {e}")))?;

    let logger = match &log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            logger
                .log_to_file(FileSpec::default().directory(dir.as_path()).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        None => logger.log_to_stderr().format_for_stderr(flexi_logger::detailed_format),
    };

    let handle = logger
        .start()
        .map_err(|e| EngineError::Logging(format!("failed to start logger: {e}")))?;

    info!(
        "event=logging_init module=logging status=ok level={} destination={} version={}",
        level,
        describe(log_dir.as_deref()),
        env!("CARGO_PKG_VERSION")
    );

    Ok(LoggingState {
        level,
        log_dir,
        _logger: handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("INFO").unwrap(), "info");
        assert_eq!(normalize_level(" warning ").unwrap(), "warn");
        assert!(matches!(normalize_level("loud"), Err(EngineError::Logging(_))));
    }

    #[test]
    fn relative_dir_is_rejected() {
        let err = normalize_log_dir(Path::new("logs/dev")).unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn init_is_idempotent_and_rejects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();

        init_logging("info", Some(dir.path())).unwrap();
        init_logging("info", Some(dir.path())).unwrap();

        let err = init_logging("debug", Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains("refusing to switch"));
        let err = init_logging("info", Some(other.path())).unwrap_err();
        assert!(err.to_string().contains("refusing to switch"));
        let err = init_logging("info", None).unwrap_err();
        assert!(err.to_string().contains("refusing to switch"));

        let (level, active) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(active.as_deref(), Some(dir.path()));
    }
}
