use std::sync::Arc;

use tauri::{webview::PageLoadEvent, AppHandle, Manager, RunEvent};

use crate::{
    append_cache_log, append_desktop_log, append_startup_log,
    cache_store::DiskCacheStorage,
    cache_strategy,
    lifecycle::{LifecycleAction, LifecycleSignal},
    main_window::{self, WindowSpec},
    network::HttpNetwork,
    offline_cache::{InstallPhase, OfflineCache, OfflineCacheConfig},
    offline_protocol, origin_config, window_actions, OfflineCacheState, DESKTOP_LOG_FILE,
    OFFLINE_CACHE_NAME, OFFLINE_CACHE_PRECACHE, OFFLINE_SCHEME,
};

fn build_offline_cache() -> OfflineCache {
    let origin_url = origin_config::resolve_origin_url();
    let strategy = cache_strategy::resolve_cache_strategy(append_startup_log);
    let cache_root = origin_config::cache_root_dir(origin_config::default_root_dir());
    append_startup_log(&format!(
        "offline cache {OFFLINE_CACHE_NAME}: origin={origin_url} strategy={strategy} root={}",
        cache_root.display()
    ));

    OfflineCache::new(
        OfflineCacheConfig {
            cache_name: OFFLINE_CACHE_NAME.to_string(),
            origin_url,
            precache: OFFLINE_CACHE_PRECACHE
                .iter()
                .map(|path| path.to_string())
                .collect(),
            strategy,
        },
        Arc::new(HttpNetwork::new()),
        Arc::new(DiskCacheStorage::new(cache_root)),
        append_cache_log,
    )
}

/// Starts an install unless one already succeeded or is running.
fn spawn_offline_install(app_handle: &AppHandle) {
    let Some(state) = app_handle.try_state::<OfflineCacheState>() else {
        return;
    };
    let cache = state.cache.clone();
    if cache.phase() != InstallPhase::Uninstalled {
        return;
    }

    tauri::async_runtime::spawn(async move {
        if let Err(error) = cache.install().await {
            append_cache_log(&format!(
                "offline cache install will be retried on next page load: {error}"
            ));
        }
    });
}

pub(crate) fn run() {
    append_startup_log("desktop process starting");
    append_startup_log(&format!(
        "desktop log path: {}",
        crate::logging::resolve_desktop_log_path(
            origin_config::default_root_dir(),
            DESKTOP_LOG_FILE,
        )
        .display()
    ));

    tauri::Builder::default()
        .manage(OfflineCacheState::new(build_offline_cache()))
        .invoke_handler(tauri::generate_handler![
            crate::desktop_bridge_commands::desktop_bridge_is_desktop_runtime,
            crate::desktop_bridge_commands::offline_cache_status,
            crate::desktop_bridge_commands::offline_cache_install,
        ])
        .register_asynchronous_uri_scheme_protocol(OFFLINE_SCHEME, |ctx, request, responder| {
            offline_protocol::handle_offline_request(ctx.app_handle().clone(), request, responder);
        })
        .on_page_load(|webview, payload| match payload.event() {
            PageLoadEvent::Started => {
                append_desktop_log(&format!("page-load started: {}", payload.url()));
            }
            PageLoadEvent::Finished => {
                append_desktop_log(&format!("page-load finished: {}", payload.url()));
                spawn_offline_install(webview.app_handle());
            }
        })
        .setup(|app| {
            if let Err(error) = main_window::grant_host_access(app.handle(), &WindowSpec::main()) {
                append_startup_log(&error);
            }
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            RunEvent::Ready => {
                window_actions::handle_lifecycle_signal(
                    app_handle,
                    LifecycleSignal::Ready,
                    append_desktop_log,
                );
                spawn_offline_install(app_handle);
            }
            // An exit request without a code means the last window closed.
            RunEvent::ExitRequested {
                code: None, api, ..
            } => {
                let action = window_actions::handle_lifecycle_signal(
                    app_handle,
                    LifecycleSignal::AllWindowsClosed,
                    append_desktop_log,
                );
                if action == LifecycleAction::StayResident {
                    api.prevent_exit();
                }
            }
            #[cfg(target_os = "macos")]
            RunEvent::Reopen { .. } => {
                window_actions::handle_lifecycle_signal(
                    app_handle,
                    LifecycleSignal::Activate,
                    append_desktop_log,
                );
            }
            RunEvent::Exit => {
                append_desktop_log("desktop process exiting");
            }
            _ => {}
        });
}
