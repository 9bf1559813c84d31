/// Canonical file paths for lockwatch shared state.
///
/// All files live under the app data directory (%APPDATA%\lockwatch on
/// Windows, $XDG_CONFIG_HOME/lockwatch or ~/.config/lockwatch elsewhere):
///   - lockwatch.toml  Written by lockwatchctl, read by the watcher.
///   - reload.d        Marker: created by lockwatchctl, consumed by the watcher.
///   - terminate.d     Marker: created by lockwatchctl, consumed by the watcher.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "lockwatch";
pub const CONFIG_FILE_NAME: &str = "lockwatch.toml";
pub const RELOAD_MARKER_NAME: &str = "reload.d";
pub const TERMINATE_MARKER_NAME: &str = "terminate.d";

/// Returns the lockwatch application data directory.
pub fn app_data_dir() -> PathBuf {
    #[cfg(windows)]
    {
        let appdata = std::env::var("APPDATA").expect("APPDATA environment variable not set");
        PathBuf::from(appdata).join(APP_DIR_NAME)
    }
    #[cfg(not(windows))]
    {
        match std::env::var_os("XDG_CONFIG_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir).join(APP_DIR_NAME),
            _ => {
                let home = std::env::var_os("HOME").expect("HOME environment variable not set");
                PathBuf::from(home).join(".config").join(APP_DIR_NAME)
            }
        }
    }
}

/// Returns the full path to the shared config file.
pub fn config_file_path() -> PathBuf {
    app_data_dir().join(CONFIG_FILE_NAME)
}

/// Returns the full path to the reload request marker.
pub fn reload_marker_path() -> PathBuf {
    app_data_dir().join(RELOAD_MARKER_NAME)
}

/// Returns the full path to the terminate request marker.
pub fn terminate_marker_path() -> PathBuf {
    app_data_dir().join(TERMINATE_MARKER_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_ends_with_lockwatch() {
        let dir = app_data_dir();
        assert_eq!(dir.file_name().unwrap(), "lockwatch");
    }

    #[test]
    fn config_file_path_has_correct_name() {
        let path = config_file_path();
        assert_eq!(path.file_name().unwrap(), CONFIG_FILE_NAME);
    }

    #[test]
    fn marker_paths_have_correct_names() {
        assert_eq!(reload_marker_path().file_name().unwrap(), RELOAD_MARKER_NAME);
        assert_eq!(terminate_marker_path().file_name().unwrap(), TERMINATE_MARKER_NAME);
    }

    #[test]
    fn all_paths_share_same_parent_dir() {
        let dir = app_data_dir();
        assert_eq!(config_file_path().parent().unwrap(), dir);
        assert_eq!(reload_marker_path().parent().unwrap(), dir);
        assert_eq!(terminate_marker_path().parent().unwrap(), dir);
    }
}
