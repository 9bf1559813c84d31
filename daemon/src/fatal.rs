/// Fatal-error surfacing.
///
/// Fatal errors produce a single blocking notification before the process
/// exits; transient errors never reach this module. On Windows the
/// notification is a modal message box so it is visible even though the
/// watcher has no window of its own; elsewhere it is an error-level log
/// line.
use tracing::error;

pub fn notify(title: &str, message: &str) {
    error!("{title}: {message}");
    #[cfg(windows)]
    imp::message_box(title, message);
}

#[cfg(windows)]
mod imp {
    use windows::core::HSTRING;
    use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

    pub fn message_box(title: &str, message: &str) {
        unsafe {
            MessageBoxW(
                None,
                &HSTRING::from(message),
                &HSTRING::from(title),
                MB_OK | MB_ICONERROR,
            );
        }
    }
}
