use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A toggle key the watcher can monitor.
///
/// The discriminant values are the Windows virtual-key codes, which also
/// serve as the stable numeric identifiers in visual-variant selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedKey {
    CapsLock = 20,
    NumLock = 144,
    ScrollLock = 145,
}

impl WatchedKey {
    pub const ALL: [WatchedKey; 3] = [
        WatchedKey::CapsLock,
        WatchedKey::NumLock,
        WatchedKey::ScrollLock,
    ];

    /// Numeric key code (identical to the Windows virtual-key code).
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            WatchedKey::CapsLock => "caps_lock",
            WatchedKey::NumLock => "num_lock",
            WatchedKey::ScrollLock => "scroll_lock",
        }
    }
}

impl fmt::Display for WatchedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WatchedKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "caps_lock" => Ok(WatchedKey::CapsLock),
            "num_lock" => Ok(WatchedKey::NumLock),
            "scroll_lock" => Ok(WatchedKey::ScrollLock),
            other => Err(format!(
                "unsupported key '{other}' (supported: caps_lock, num_lock, scroll_lock)"
            )),
        }
    }
}

/// Decodes a raw `GetKeyState` sample into a toggle state.
///
/// The raw value is a closed two-value contract: -128 and 0 mean the toggle
/// is off, -127 and 1 mean it is on (the sign bit carries the transient
/// "currently held down" flag). Any other encoding is not interpreted and
/// the sample is treated as a no-op.
pub fn decode_raw(raw: i16) -> Option<bool> {
    match raw {
        -128 | 0 => Some(false),
        -127 | 1 => Some(true),
        _ => None,
    }
}
