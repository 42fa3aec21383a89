pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const MAIN_WINDOW_TITLE: &str = "WXP GameHub";
pub(crate) const MAIN_WINDOW_WIDTH: f64 = 1280.0;
pub(crate) const MAIN_WINDOW_HEIGHT: f64 = 720.0;
pub(crate) const MAIN_WINDOW_ICON_PATH: &str = "icons/icon-512.png";
pub(crate) const MAIN_WINDOW_DOCUMENT: &str = "index.html";
pub(crate) const MAIN_WINDOW_HIDE_MENU_BAR: bool = true;
pub(crate) const MAIN_WINDOW_FULL_HOST_ACCESS: bool = true;
pub(crate) const MAIN_WINDOW_CAPABILITY_ID: &str = "main-window-host-access";

pub(crate) const OFFLINE_CACHE_NAME: &str = "hub-hyo-v1";
pub(crate) const OFFLINE_CACHE_PRECACHE: &[&str] = &["./", "./index.html"];
pub(crate) const OFFLINE_SCHEME: &str = "gamehub";

pub(crate) const DEFAULT_ORIGIN_URL: &str = "http://127.0.0.1:8080/";
pub(crate) const ORIGIN_URL_ENV: &str = "GAMEHUB_ORIGIN_URL";
pub(crate) const CACHE_STRATEGY_ENV: &str = "GAMEHUB_CACHE_STRATEGY";
pub(crate) const ROOT_DIR_ENV: &str = "GAMEHUB_ROOT";

pub(crate) const DESKTOP_LOG_FILE: &str = "desktop.log";
