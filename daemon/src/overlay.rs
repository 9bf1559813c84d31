/// Overlay display state machine.
///
/// Turns discrete toggle events into a timed show → hold → fade → hide
/// sequence. The machine is last-event-wins: a new accepted event preempts
/// any in-flight hold or fade and restarts the cycle, so rapid repeated
/// toggles never stack timers and no stale timer can fire into a newer
/// cycle.
///
/// The transition logic is synchronous ([`Overlay::accept`] /
/// [`Overlay::deadline_elapsed`]); [`run`] drives it with a single timer
/// slot inside one task, which is what makes preemption race-free.
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, trace};

use crate::config::{Anchor, Config};
use crate::event::{OverlayEvent, RenderCommand, ToggleEvent};
use crate::keys::WatchedKey;

/// Lifecycle of the indicator surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Hidden,
    Showing,
    Holding,
    FadingOut,
}

/// The subset of the config the overlay needs, applied atomically on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    pub display_time_ms: u32,
    pub fade_time_ms: u32,
    pub anchor: Anchor,
    pub opacity_percent: u8,
}

impl OverlaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            display_time_ms: config.display_time_ms,
            fade_time_ms: config.fade_time_ms,
            anchor: config.position,
            opacity_percent: config.opacity_percent,
        }
    }

    fn hold(&self) -> Duration {
        Duration::from_millis(self.display_time_ms as u64)
    }

    fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_time_ms as u64)
    }
}

/// Selects the visual variant for a (key, state) pair. The identifiers
/// follow the theme asset naming: key code followed by 1 (on) or 0 (off).
/// The synthetic startup event has no variant.
pub fn variant(key: Option<WatchedKey>, state: bool) -> Option<&'static str> {
    match (key?, state) {
        (WatchedKey::CapsLock, true) => Some("201"),
        (WatchedKey::CapsLock, false) => Some("200"),
        (WatchedKey::NumLock, true) => Some("1441"),
        (WatchedKey::NumLock, false) => Some("1440"),
        (WatchedKey::ScrollLock, true) => Some("1451"),
        (WatchedKey::ScrollLock, false) => Some("1450"),
    }
}

/// Opacity multiplier during the fade-out ramp at `progress` in [0, 1].
///
/// Quadratic ease-out: the drop is steep at the start of the fade and
/// decelerates toward zero.
pub fn eased_opacity(progress: f32) -> f32 {
    let remaining = 1.0 - progress.clamp(0.0, 1.0);
    remaining * remaining
}

/// The currently visible indicator, if any. At most one exists at a time;
/// a newly accepted event supersedes it rather than queuing behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySession {
    pub variant: &'static str,
}

pub struct Overlay {
    state: OverlayState,
    settings: OverlaySettings,
    session: Option<DisplaySession>,
}

impl Overlay {
    pub fn new(settings: OverlaySettings) -> Self {
        Self { state: OverlayState::Hidden, settings, session: None }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn session(&self) -> Option<&DisplaySession> {
        self.session.as_ref()
    }

    /// Applies new settings; the current cycle keeps its already-scheduled
    /// deadlines.
    pub fn apply(&mut self, settings: OverlaySettings) {
        debug!(?settings, "overlay settings applied");
        self.settings = settings;
    }

    /// Accepts a toggle event, preempting any in-flight hold or fade.
    ///
    /// Returns the render command to emit and the hold duration to
    /// schedule. A variantless (startup) event only initializes the
    /// surface: no timer is scheduled and the machine stays `Hidden`.
    pub fn accept(&mut self, event: &ToggleEvent) -> (RenderCommand, Option<Duration>) {
        let command = RenderCommand::Show {
            variant: variant(event.key, event.state),
            anchor: self.settings.anchor,
            opacity_percent: self.settings.opacity_percent,
            fade_time_ms: self.settings.fade_time_ms,
        };

        match variant(event.key, event.state) {
            None => {
                self.state = OverlayState::Hidden;
                self.session = None;
                (command, None)
            }
            Some(v) => {
                trace!(from = ?self.state, variant = v, "overlay cycle restarted");
                // Showing is entered and left synchronously: the visual is
                // committed by the render command, then the hold starts.
                self.state = OverlayState::Showing;
                self.session = Some(DisplaySession { variant: v });
                self.state = OverlayState::Holding;
                (command, Some(self.settings.hold()))
            }
        }
    }

    /// Advances the machine when the scheduled deadline elapses. Returns
    /// the render command and the next deadline, or `None` if no timer was
    /// supposed to be live (stale wakeup guard).
    pub fn deadline_elapsed(&mut self) -> Option<(RenderCommand, Option<Duration>)> {
        match self.state {
            OverlayState::Holding => {
                self.state = OverlayState::FadingOut;
                Some((
                    RenderCommand::FadeOut { duration_ms: self.settings.fade_time_ms },
                    Some(self.settings.fade()),
                ))
            }
            OverlayState::FadingOut => {
                self.state = OverlayState::Hidden;
                self.session = None;
                Some((RenderCommand::Hide, None))
            }
            OverlayState::Hidden | OverlayState::Showing => None,
        }
    }
}

/// Drives the overlay machine: single consumer of toggle events, single
/// timer slot. Replacing the deadline on each accepted event is what
/// cancels the previous cycle's hold/fade.
pub async fn run(
    mut overlay: Overlay,
    mut events: mpsc::Receiver<OverlayEvent>,
    render_tx: mpsc::Sender<RenderCommand>,
) {
    let mut deadline = Instant::now();
    let mut armed = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                None => break,
                Some(OverlayEvent::Apply(settings)) => overlay.apply(settings),
                Some(OverlayEvent::Toggle(toggle)) => {
                    let (command, delay) = overlay.accept(&toggle);
                    if render_tx.send(command).await.is_err() {
                        break;
                    }
                    match delay {
                        Some(d) => {
                            deadline = Instant::now() + d;
                            armed = true;
                        }
                        None => armed = false,
                    }
                }
            },
            _ = sleep_until(deadline), if armed => {
                armed = false;
                if let Some((command, delay)) = overlay.deadline_elapsed() {
                    if render_tx.send(command).await.is_err() {
                        break;
                    }
                    if let Some(d) = delay {
                        deadline = Instant::now() + d;
                        armed = true;
                    }
                }
            }
        }
    }
    debug!("overlay state machine stopped");
}

/// Stand-in consumer for the external renderer process boundary: logs each
/// render request.
pub async fn log_render_commands(mut rx: mpsc::Receiver<RenderCommand>) {
    while let Some(command) = rx.recv().await {
        debug!(?command, "render request");
    }
}
