use std::{path::PathBuf, sync::OnceLock};

use crate::{logging, origin_config, DESKTOP_LOG_FILE};

fn desktop_log_path() -> &'static PathBuf {
    static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
    LOG_PATH.get_or_init(|| {
        logging::resolve_desktop_log_path(origin_config::default_root_dir(), DESKTOP_LOG_FILE)
    })
}

pub(crate) fn append_desktop_log(message: &str) {
    logging::append_log_line(desktop_log_path(), "desktop", message);
}

pub(crate) fn append_startup_log(message: &str) {
    logging::append_log_line(desktop_log_path(), "startup", message);
}

pub(crate) fn append_cache_log(message: &str) {
    logging::append_log_line(desktop_log_path(), "cache", message);
}
