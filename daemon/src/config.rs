use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::keys::WatchedKey;

pub const MIN_DISPLAY_TIME_MS: u32 = 500;
pub const MAX_DISPLAY_TIME_MS: u32 = 2000;
pub const MIN_OPACITY_PERCENT: u8 = 10;
pub const MAX_OPACITY_PERCENT: u8 = 100;
pub const MIN_FADE_TIME_MS: u32 = 50;
pub const MAX_FADE_TIME_MS: u32 = 500;

pub const DEFAULT_DISPLAY_TIME_MS: u32 = 1500;
pub const DEFAULT_OPACITY_PERCENT: u8 = 95;
pub const DEFAULT_FADE_TIME_MS: u32 = 150;
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Screen-relative position of the indicator surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopMiddle,
    TopRight,
    BottomLeft,
    BottomMiddle,
    BottomRight,
}

impl Anchor {
    /// Width/height divisors locating the anchor inside the target screen
    /// geometry (screen_extent / divisor gives the anchor coordinate).
    pub fn divisors(self) -> (f32, f32) {
        match self {
            Anchor::TopLeft => (5.25, 4.0),
            Anchor::TopMiddle => (2.0, 4.0),
            Anchor::TopRight => (1.25, 4.0),
            Anchor::BottomLeft => (5.25, 1.45),
            Anchor::BottomMiddle => (2.0, 1.45),
            Anchor::BottomRight => (1.25, 1.45),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Anchor::TopLeft => "top_left",
            Anchor::TopMiddle => "top_middle",
            Anchor::TopRight => "top_right",
            Anchor::BottomLeft => "bottom_left",
            Anchor::BottomMiddle => "bottom_middle",
            Anchor::BottomRight => "bottom_right",
        }
    }
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_left" => Ok(Anchor::TopLeft),
            "top_middle" => Ok(Anchor::TopMiddle),
            "top_right" => Ok(Anchor::TopRight),
            "bottom_left" => Ok(Anchor::BottomLeft),
            "bottom_middle" => Ok(Anchor::BottomMiddle),
            "bottom_right" => Ok(Anchor::BottomRight),
            other => Err(format!("unknown anchor '{other}'")),
        }
    }
}

/// Requested indicator color scheme. `System` resolves against the OS
/// preference at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    Dark,
    Light,
    System,
}

impl FromStr for ColorScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(ColorScheme::Dark),
            "light" => Ok(ColorScheme::Light),
            "system" => Ok(ColorScheme::System),
            other => Err(format!("unknown color scheme '{other}'")),
        }
    }
}

/// Validation failure for the shared config resource. Any single failed
/// field invalidates the whole resource.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{field} value {value} not in allowed range ({min}, {max})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("nothing to watch, select at least one key")]
    NoKeysToWatch,
    #[error("keys_to_watch contains a duplicate entry")]
    DuplicateKey,
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("unknown configuration field '{0}'")]
    UnknownField(String),
    #[error("invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// Whether the on-disk resource itself is at fault (and should be
    /// discarded so the next start regenerates defaults), as opposed to the
    /// file being absent or unreadable.
    pub fn invalidates_resource(&self) -> bool {
        !matches!(self, ConfigError::Missing(_) | ConfigError::Io(_))
    }
}

/// The shared, validated configuration resource.
///
/// Every field is required; bounds are checked once in [`Config::validate`]
/// and the struct is never mutated field-by-field outside
/// [`Config::set_field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// How long the indicator stays fully visible, in milliseconds.
    pub display_time_ms: u32,
    /// Indicator opacity in percent.
    pub opacity_percent: u8,
    /// Duration of the fade-out ramp, in milliseconds.
    pub fade_time_ms: u32,
    /// Screen anchor preset for the indicator surface.
    pub position: Anchor,
    pub color_scheme: ColorScheme,
    /// Keys the watcher monitors. Must be a non-empty subset of the
    /// supported toggle keys.
    pub keys_to_watch: Vec<WatchedKey>,
    pub tray_icon: bool,
    pub run_at_startup: bool,
    /// Active language identifier, e.g. "en-US". Consumed by the
    /// configuration UI; the watcher only validates it.
    pub language: String,
    pub check_for_updates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_time_ms: DEFAULT_DISPLAY_TIME_MS,
            opacity_percent: DEFAULT_OPACITY_PERCENT,
            fade_time_ms: DEFAULT_FADE_TIME_MS,
            position: Anchor::BottomMiddle,
            color_scheme: ColorScheme::System,
            keys_to_watch: WatchedKey::ALL.to_vec(),
            tray_icon: true,
            run_at_startup: true,
            language: DEFAULT_LANGUAGE.to_string(),
            check_for_updates: true,
        }
    }
}

impl Config {
    /// Bounds-checks every field. The first violation fails the whole
    /// resource.
    pub fn validate(&self) -> Result<(), ConfigError> {
        range_check(
            "display_time_ms",
            self.display_time_ms as i64,
            MIN_DISPLAY_TIME_MS as i64,
            MAX_DISPLAY_TIME_MS as i64,
        )?;
        range_check(
            "opacity_percent",
            self.opacity_percent as i64,
            MIN_OPACITY_PERCENT as i64,
            MAX_OPACITY_PERCENT as i64,
        )?;
        range_check(
            "fade_time_ms",
            self.fade_time_ms as i64,
            MIN_FADE_TIME_MS as i64,
            MAX_FADE_TIME_MS as i64,
        )?;
        if self.keys_to_watch.is_empty() {
            return Err(ConfigError::NoKeysToWatch);
        }
        let mut seen = Vec::with_capacity(self.keys_to_watch.len());
        for key in &self.keys_to_watch {
            if seen.contains(key) {
                return Err(ConfigError::DuplicateKey);
            }
            seen.push(*key);
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "language" });
        }
        Ok(())
    }

    /// Serializes to TOML and writes to `path`, creating the parent
    /// directory if needed.
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Applies a single named-field edit from its string representation.
    /// The caller is expected to re-validate and write the whole resource.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), ConfigError> {
        match field {
            "display_time_ms" => self.display_time_ms = parse_value("display_time_ms", value)?,
            "opacity_percent" => self.opacity_percent = parse_value("opacity_percent", value)?,
            "fade_time_ms" => self.fade_time_ms = parse_value("fade_time_ms", value)?,
            "position" => {
                self.position = Anchor::from_str(value).map_err(|reason| {
                    ConfigError::InvalidValue { field: "position", value: value.to_string(), reason }
                })?
            }
            "color_scheme" => {
                self.color_scheme = ColorScheme::from_str(value).map_err(|reason| {
                    ConfigError::InvalidValue {
                        field: "color_scheme",
                        value: value.to_string(),
                        reason,
                    }
                })?
            }
            "keys_to_watch" => {
                let keys = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(WatchedKey::from_str)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|reason| ConfigError::InvalidValue {
                        field: "keys_to_watch",
                        value: value.to_string(),
                        reason,
                    })?;
                self.keys_to_watch = keys;
            }
            "tray_icon" => self.tray_icon = parse_value("tray_icon", value)?,
            "run_at_startup" => self.run_at_startup = parse_value("run_at_startup", value)?,
            "language" => self.language = value.to_string(),
            "check_for_updates" => self.check_for_updates = parse_value("check_for_updates", value)?,
            other => return Err(ConfigError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

fn range_check(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

fn parse_value<T: FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Loads and validates the config resource at `path`.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Watcher-side load: on any fault of the resource itself, the file is
/// deleted so the next start regenerates defaults. The error is still
/// returned; surfacing it and exiting is the caller's job.
pub fn load_or_discard(path: &Path) -> Result<Config, ConfigError> {
    match load(path) {
        Err(e) if e.invalidates_resource() => {
            // Best effort; a failed delete leaves the same fatal outcome.
            let _ = std::fs::remove_file(path);
            Err(e)
        }
        other => other,
    }
}

/// Configuration-side load: creates the default config file first if none
/// exists.
pub fn load_or_init(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        Config::default().write(path)?;
    }
    load(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_toml(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("lockwatch.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn default_config_watches_all_keys() {
        assert_eq!(Config::default().keys_to_watch, WatchedKey::ALL.to_vec());
    }

    // ── validate ──────────────────────────────────────────────────────────────

    #[test]
    fn validate_rejects_display_time_out_of_range() {
        let mut c = Config::default();
        c.display_time_ms = 499;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::OutOfRange { field: "display_time_ms", .. })
        ));
        c.display_time_ms = 2001;
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_accepts_range_endpoints() {
        let mut c = Config::default();
        c.display_time_ms = MIN_DISPLAY_TIME_MS;
        c.opacity_percent = MAX_OPACITY_PERCENT;
        c.fade_time_ms = MIN_FADE_TIME_MS;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validate_rejects_opacity_out_of_range() {
        let mut c = Config::default();
        c.opacity_percent = 9;
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_fade_time_out_of_range() {
        let mut c = Config::default();
        c.fade_time_ms = 501;
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_key_set() {
        let mut c = Config::default();
        c.keys_to_watch.clear();
        assert!(matches!(c.validate(), Err(ConfigError::NoKeysToWatch)));
    }

    #[test]
    fn validate_rejects_duplicate_keys() {
        let mut c = Config::default();
        c.keys_to_watch = vec![WatchedKey::CapsLock, WatchedKey::CapsLock];
        assert!(matches!(c.validate(), Err(ConfigError::DuplicateKey)));
    }

    #[test]
    fn validate_rejects_blank_language() {
        let mut c = Config::default();
        c.language = "  ".to_string();
        assert!(matches!(
            c.validate(),
            Err(ConfigError::EmptyField { field: "language" })
        ));
    }

    // ── load ──────────────────────────────────────────────────────────────────

    #[test]
    fn load_missing_file_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        assert!(matches!(load(&path), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn load_round_trips_written_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockwatch.toml");

        let mut original = Config::default();
        original.display_time_ms = 800;
        original.position = Anchor::TopRight;
        original.keys_to_watch = vec![WatchedKey::NumLock];
        original.write(&path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn load_rejects_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        // No opacity_percent.
        let path = write_toml(
            &dir,
            r#"
display_time_ms = 1500
fade_time_ms = 150
position = "bottom_middle"
color_scheme = "system"
keys_to_watch = ["caps_lock"]
tray_icon = true
run_at_startup = true
language = "en-US"
check_for_updates = true
"#,
        );
        assert!(matches!(load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_rejects_unsupported_key_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_toml(
            &dir,
            r#"
display_time_ms = 1500
opacity_percent = 95
fade_time_ms = 150
position = "bottom_middle"
color_scheme = "system"
keys_to_watch = ["caps_lock", "shift"]
tray_icon = true
run_at_startup = true
language = "en-US"
check_for_updates = true
"#,
        );
        assert!(matches!(load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_rejects_single_corrupted_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_toml(
            &dir,
            r#"
display_time_ms = 9999
opacity_percent = 95
fade_time_ms = 150
position = "bottom_middle"
color_scheme = "system"
keys_to_watch = ["caps_lock"]
tray_icon = true
run_at_startup = true
language = "en-US"
check_for_updates = true
"#,
        );
        assert!(matches!(load(&path), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = toml::to_string_pretty(&Config::default()).unwrap();
        content.push_str("\nmystery_field = 1\n");
        let path = write_toml(&dir, &content);
        assert!(matches!(load(&path), Err(ConfigError::Parse(_))));
    }

    // ── load_or_discard ───────────────────────────────────────────────────────

    #[test]
    fn load_or_discard_deletes_invalid_resource() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_toml(&dir, "this is not valid toml ][[[");
        assert!(load_or_discard(&path).is_err());
        assert!(!path.exists(), "invalid config file should be deleted");
    }

    #[test]
    fn load_or_discard_keeps_missing_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockwatch.toml");
        assert!(matches!(
            load_or_discard(&path),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn load_or_discard_returns_valid_config_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockwatch.toml");
        Config::default().write(&path).unwrap();
        assert!(load_or_discard(&path).is_ok());
        assert!(path.exists());
    }

    // ── load_or_init ──────────────────────────────────────────────────────────

    #[test]
    fn load_or_init_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockwatch.toml");
        let config = load_or_init(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_or_init_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockwatch.toml");
        let mut existing = Config::default();
        existing.opacity_percent = 40;
        existing.write(&path).unwrap();
        assert_eq!(load_or_init(&path).unwrap().opacity_percent, 40);
    }

    // ── set_field ─────────────────────────────────────────────────────────────

    #[test]
    fn set_field_updates_numeric_fields() {
        let mut c = Config::default();
        c.set_field("display_time_ms", "750").unwrap();
        c.set_field("opacity_percent", "50").unwrap();
        c.set_field("fade_time_ms", "200").unwrap();
        assert_eq!(c.display_time_ms, 750);
        assert_eq!(c.opacity_percent, 50);
        assert_eq!(c.fade_time_ms, 200);
    }

    #[test]
    fn set_field_parses_enums_and_key_lists() {
        let mut c = Config::default();
        c.set_field("position", "top_left").unwrap();
        c.set_field("color_scheme", "dark").unwrap();
        c.set_field("keys_to_watch", "caps_lock, scroll_lock").unwrap();
        assert_eq!(c.position, Anchor::TopLeft);
        assert_eq!(c.color_scheme, ColorScheme::Dark);
        assert_eq!(
            c.keys_to_watch,
            vec![WatchedKey::CapsLock, WatchedKey::ScrollLock]
        );
    }

    #[test]
    fn set_field_rejects_unknown_field() {
        let mut c = Config::default();
        assert!(matches!(
            c.set_field("theme", "elegant"),
            Err(ConfigError::UnknownField(_))
        ));
    }

    #[test]
    fn set_field_rejects_unparseable_value() {
        let mut c = Config::default();
        assert!(c.set_field("display_time_ms", "soon").is_err());
        assert!(c.set_field("tray_icon", "maybe").is_err());
        assert!(c.set_field("keys_to_watch", "caps_lock,shift").is_err());
    }

    #[test]
    fn set_field_then_validate_catches_out_of_range() {
        // set_field itself does not bounds-check; validate does.
        let mut c = Config::default();
        c.set_field("opacity_percent", "5").unwrap();
        assert!(c.validate().is_err());
    }
}
