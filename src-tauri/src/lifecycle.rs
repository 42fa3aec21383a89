#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HostPlatform {
    MacOs,
    Windows,
    Linux,
    Other,
}

impl HostPlatform {
    pub(crate) fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    /// Platforms where an app conventionally stays running with no windows.
    pub(crate) fn stays_resident_without_windows(self) -> bool {
        matches!(self, Self::MacOs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleSignal {
    Ready,
    AllWindowsClosed,
    // Only delivered by the host on macOS.
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    Activate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleAction {
    CreateWindow,
    Quit,
    StayResident,
    Ignore,
}

pub(crate) fn decide_lifecycle_action(
    signal: LifecycleSignal,
    open_window_count: usize,
    platform: HostPlatform,
) -> LifecycleAction {
    match signal {
        LifecycleSignal::Ready => LifecycleAction::CreateWindow,
        LifecycleSignal::AllWindowsClosed => {
            if platform.stays_resident_without_windows() {
                LifecycleAction::StayResident
            } else {
                LifecycleAction::Quit
            }
        }
        LifecycleSignal::Activate => {
            if open_window_count == 0 {
                LifecycleAction::CreateWindow
            } else {
                LifecycleAction::Ignore
            }
        }
    }
}
