use std::path::PathBuf;

use tauri::{
    image::Image, ipc::CapabilityBuilder, path::BaseDirectory, AppHandle, Manager, WebviewUrl,
    WebviewWindow, WebviewWindowBuilder,
};

use crate::{
    MAIN_WINDOW_CAPABILITY_ID, MAIN_WINDOW_DOCUMENT, MAIN_WINDOW_FULL_HOST_ACCESS,
    MAIN_WINDOW_HEIGHT, MAIN_WINDOW_HIDE_MENU_BAR, MAIN_WINDOW_ICON_PATH, MAIN_WINDOW_LABEL,
    MAIN_WINDOW_TITLE, MAIN_WINDOW_WIDTH,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WindowSpec {
    pub(crate) label: &'static str,
    pub(crate) title: &'static str,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) icon_path: &'static str,
    pub(crate) document: &'static str,
    pub(crate) hide_menu_bar: bool,
    pub(crate) full_host_access: bool,
}

impl WindowSpec {
    pub(crate) fn main() -> Self {
        Self {
            label: MAIN_WINDOW_LABEL,
            title: MAIN_WINDOW_TITLE,
            width: MAIN_WINDOW_WIDTH,
            height: MAIN_WINDOW_HEIGHT,
            icon_path: MAIN_WINDOW_ICON_PATH,
            document: MAIN_WINDOW_DOCUMENT,
            hide_menu_bar: MAIN_WINDOW_HIDE_MENU_BAR,
            full_host_access: MAIN_WINDOW_FULL_HOST_ACCESS,
        }
    }
}

/// Grants the window every core permission. Runs once per process.
pub(crate) fn grant_host_access(app_handle: &AppHandle, spec: &WindowSpec) -> Result<(), String> {
    if !spec.full_host_access {
        return Ok(());
    }

    let capability = CapabilityBuilder::new(MAIN_WINDOW_CAPABILITY_ID)
        .window(spec.label)
        .permission("core:default");
    app_handle
        .add_capability(capability)
        .map_err(|error| format!("Failed to grant host access to {}: {error}", spec.label))
}

fn load_window_icon(app_handle: &AppHandle, icon_path: &str) -> Result<Image<'static>, String> {
    let resolved = app_handle
        .path()
        .resolve(icon_path, BaseDirectory::Resource)
        .map_err(|error| format!("Failed to resolve window icon {icon_path}: {error}"))?;
    Image::from_path(&resolved)
        .map_err(|error| format!("Failed to load window icon {}: {error}", resolved.display()))
}

pub(crate) fn create_main_window<F>(
    app_handle: &AppHandle,
    spec: &WindowSpec,
    log: F,
) -> Result<WebviewWindow, String>
where
    F: Fn(&str),
{
    let mut builder = WebviewWindowBuilder::new(
        app_handle,
        spec.label,
        WebviewUrl::App(PathBuf::from(spec.document)),
    )
    .title(spec.title)
    .inner_size(spec.width, spec.height);

    match load_window_icon(app_handle, spec.icon_path) {
        Ok(icon) => {
            builder = builder
                .icon(icon)
                .map_err(|error| format!("Failed to apply window icon: {error}"))?;
        }
        Err(error) => log(&format!("{error}; continuing without window icon")),
    }

    let window = builder
        .build()
        .map_err(|error| format!("Failed to create window {}: {error}", spec.label))?;

    if spec.hide_menu_bar {
        if let Err(error) = window.hide_menu() {
            log(&format!("failed to hide menu bar for {}: {error}", spec.label));
        }
    }

    log(&format!("created window {} loading {}", spec.label, spec.document));
    Ok(window)
}
