//! Editing-session log for the isopaint core.
//!
//! Nothing is written until [`init`] or [`init_at`] opens a file; before that
//! every `log_*!` call returns immediately.  Opening truncates, so the file
//! holds a single session.  By default it sits next to the settings file as
//! `isopaint.log`.
//!
//! Engines log structural events only: resizes, imports, loads and saves,
//! and rejected requests.  Per-pixel work is never logged.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::settings::EditorSettings;

const LOG_FILE_NAME: &str = "isopaint.log";

struct SessionLog {
    path: PathBuf,
    file: Mutex<File>,
}

static SESSION: OnceLock<SessionLog> = OnceLock::new();

/// Path of the open session log, if any.
pub fn log_path() -> Option<&'static Path> {
    SESSION.get().map(|s| s.path.as_path())
}

pub fn is_initialized() -> bool {
    SESSION.get().is_some()
}

/// Append one level-tagged line.  I/O failures are dropped.
pub fn write(level: &str, msg: &str) {
    let Some(session) = SESSION.get() else {
        return;
    };
    if let Ok(mut file) = session.file.lock() {
        let _ = writeln!(file, "[{}] [{}] {}", clock(), level, msg);
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write("INFO", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write("WARN", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write("ERROR", &format!($($arg)*));
    };
}

/// Open the session log beside the settings file (or in the working
/// directory when no settings location exists).
pub fn init() -> std::io::Result<()> {
    let dir = EditorSettings::settings_path()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    init_at(&dir.join(LOG_FILE_NAME))
}

/// Open (truncating) the session log at `path` and mirror panics into it.
/// Later calls after a successful one are ignored.
pub fn init_at(path: &Path) -> std::io::Result<()> {
    if is_initialized() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    let session = SessionLog {
        path: path.to_path_buf(),
        file: Mutex::new(file),
    };
    if SESSION.set(session).is_err() {
        return Ok(());
    }

    write("INFO", &format!("isopaint {} session log", env!("CARGO_PKG_VERSION")));

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write("PANIC", &info.to_string());
        prev(info);
    }));
    Ok(())
}

/// UTC wall clock as HH:MM:SS.
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!(
        "{:02}:{:02}:{:02}",
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
