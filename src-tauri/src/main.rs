#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_helpers;
mod app_runtime;
mod app_types;
mod cache_store;
mod cache_strategy;
mod desktop_bridge_commands;
mod lifecycle;
mod logging;
mod main_window;
mod network;
mod offline_cache;
mod offline_protocol;
mod origin_config;
mod window_actions;

pub(crate) use app_constants::*;
pub(crate) use app_helpers::{append_cache_log, append_desktop_log, append_startup_log};
pub(crate) use app_types::{AtomicFlagGuard, OfflineCacheState};

fn main() {
    app_runtime::run();
}
