// logging.rs — File logger for the injected module.
//
// The host has no console, so everything goes to gfless.log next to the DLL.
// The file is appended to, never truncated, so consecutive injections into
// different client instances end up in one place.

use crate::error::LoggerError;
use fern::Dispatch;
use humantime::format_rfc3339;
use log::{info, warn, LevelFilter};
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

pub const LOG_FILE_NAME: &str = "gfless.log";

/// Set only once a dispatch has been applied.
static LOGGER_INSTALLED: Mutex<bool> = Mutex::new(false);

/// Install the global logger. Once installed, later calls only log a warning
/// and return Ok. A failed attempt leaves nothing installed and may be retried.
pub fn initialize(log_dir: &Path, level: LevelFilter) -> Result<(), LoggerError> {
    let installed = install_once(&LOGGER_INSTALLED, || {
        build_dispatch(log_dir, level)?.apply()?;
        Ok(())
    })?;
    if installed {
        info!("logger initialized: level={level} pid={}", std::process::id());
    } else {
        warn!("logger already initialized");
    }
    Ok(())
}

/// Run `install` unless `guard` says it already succeeded. Returns whether it ran.
fn install_once(
    guard: &Mutex<bool>,
    install: impl FnOnce() -> Result<(), LoggerError>,
) -> Result<bool, LoggerError> {
    let mut installed = guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if *installed {
        return Ok(false);
    }
    install()?;
    *installed = true;
    Ok(true)
}

/// Build the dispatch without installing it. Opens (creates) the log file.
fn build_dispatch(log_dir: &Path, level: LevelFilter) -> Result<Dispatch, LoggerError> {
    let path = log_dir.join(LOG_FILE_NAME);
    let file = fern::log_file(&path).map_err(|source| LoggerError::File { path, source })?;

    Ok(Dispatch::new()
        .level(level)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{date} {level:<5} {thread}] {target}: {message}",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                thread = std::thread::current().name().unwrap_or("-"),
                target = record.target(),
                message = message,
            ))
        })
        .chain(file))
}
