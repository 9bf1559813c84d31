use std::time::Instant;

use crate::config::Anchor;
use crate::keys::WatchedKey;
use crate::overlay::OverlaySettings;

/// A debounced toggle transition produced by a key monitor.
///
/// Immutable once emitted; consumed exactly once by the overlay state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleEvent {
    /// `None` for the synthetic startup event that initializes the display
    /// surface without a real key action.
    pub key: Option<WatchedKey>,
    pub state: bool,
    pub at: Instant,
}

impl ToggleEvent {
    pub fn new(key: WatchedKey, state: bool) -> Self {
        Self { key: Some(key), state, at: Instant::now() }
    }

    /// The one-time synthetic event emitted at watcher startup.
    pub fn startup() -> Self {
        Self { key: None, state: false, at: Instant::now() }
    }
}

/// Input to the overlay state machine.
#[derive(Debug, Clone)]
pub enum OverlayEvent {
    /// A toggle transition (or the synthetic startup event).
    Toggle(ToggleEvent),
    /// New settings after a config reload; takes effect from the next cycle.
    Apply(OverlaySettings),
}

/// Request emitted to the external renderer. The renderer owns all pixel
/// drawing; the core only decides what to show, where, and for how long.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Present the indicator at full configured opacity on the screen under
    /// the pointer. `variant` is `None` for the surface-initializing
    /// startup event.
    Show {
        variant: Option<&'static str>,
        anchor: Anchor,
        opacity_percent: u8,
        fade_time_ms: u32,
    },
    /// Begin the opacity ramp from full to zero over `duration_ms`.
    FadeOut { duration_ms: u32 },
    /// Hide the surface and stop any opacity animation.
    Hide,
}
