use tauri::{AppHandle, Manager};

use crate::{
    app_types::{DesktopBridgeResult, OfflineCacheStatus},
    offline_cache::InstallError,
    OfflineCacheState,
};

fn bridge_result_from_install(result: Result<(), InstallError>) -> DesktopBridgeResult {
    match result {
        Ok(()) => DesktopBridgeResult {
            ok: true,
            reason: None,
        },
        Err(error) => DesktopBridgeResult {
            ok: false,
            reason: Some(error.to_string()),
        },
    }
}

#[tauri::command]
pub(crate) fn desktop_bridge_is_desktop_runtime() -> bool {
    true
}

#[tauri::command]
pub(crate) fn offline_cache_status(app_handle: AppHandle) -> OfflineCacheStatus {
    let state = app_handle.state::<OfflineCacheState>();
    state.status()
}

#[tauri::command]
pub(crate) async fn offline_cache_install(app_handle: AppHandle) -> DesktopBridgeResult {
    let cache = app_handle.state::<OfflineCacheState>().cache.clone();
    bridge_result_from_install(cache.install().await)
}
