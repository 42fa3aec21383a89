use tauri::{AppHandle, Manager};

use crate::{
    lifecycle::{self, HostPlatform, LifecycleAction, LifecycleSignal},
    main_window::{self, WindowSpec},
};

pub(crate) fn open_window_count(app_handle: &AppHandle) -> usize {
    app_handle.webview_windows().len()
}

/// Decides and performs the window side of a lifecycle signal.
///
/// `Quit` and `StayResident` are returned to the caller, which owns the exit
/// request.
pub(crate) fn handle_lifecycle_signal<F>(
    app_handle: &AppHandle,
    signal: LifecycleSignal,
    log: F,
) -> LifecycleAction
where
    F: Fn(&str),
{
    let open_windows = open_window_count(app_handle);
    let action =
        lifecycle::decide_lifecycle_action(signal, open_windows, HostPlatform::current());
    log(&format!(
        "lifecycle signal {signal:?} with {open_windows} open windows: {action:?}"
    ));

    if action == LifecycleAction::CreateWindow {
        if let Err(error) = main_window::create_main_window(app_handle, &WindowSpec::main(), &log)
        {
            log(&format!("failed to create main window: {error}"));
        }
    }
    action
}
