use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Local;

pub(crate) fn resolve_desktop_log_path(root_dir: Option<PathBuf>, file_name: &str) -> PathBuf {
    root_dir
        .unwrap_or_else(std::env::temp_dir)
        .join("logs")
        .join(file_name)
}

pub(crate) fn format_log_line(category: &str, message: &str) -> String {
    format!(
        "[{}] [{}] {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        category,
        message
    )
}

/// Appends one line to the log file. Logging never fails the caller.
pub(crate) fn append_log_line(path: &Path, category: &str, message: &str) {
    let line = format_log_line(category, message);
    if cfg!(debug_assertions) {
        eprintln!("{line}");
    }

    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{line}");
    }
}
