/// Per-key toggle-state monitors.
///
/// Each watched key gets its own polling task sampling the key's toggle
/// state every 25 ms. A transition is emitted exactly once and then held
/// back until the sampled value settles on the new state again, which
/// suppresses duplicates while the physical key is mid-transition.
///
/// On non-Windows platforms the sampler reports an error and the affected
/// monitor exits; siblings and the rest of the watcher are unaffected.
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error};

use crate::event::{OverlayEvent, ToggleEvent};
use crate::keys::{self, WatchedKey};

pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(25);

/// Debounce state for one key: last-known toggle state plus a pending
/// acknowledgement flag.
///
/// `observe` implements the settle step: after emitting a transition, no
/// further transition is emitted until a sample equal to the new state has
/// been seen once.
#[derive(Debug)]
pub struct Debouncer {
    state: bool,
    pending_ack: bool,
}

impl Debouncer {
    pub fn new(initial: bool) -> Self {
        Self { state: initial, pending_ack: false }
    }

    pub fn state(&self) -> bool {
        self.state
    }

    /// Feeds one raw sample. Returns `Some(new_state)` exactly once per
    /// physical transition; undecodable samples are no-ops.
    pub fn observe(&mut self, raw: i16) -> Option<bool> {
        match keys::decode_raw(raw) {
            Some(sampled) if sampled != self.state && !self.pending_ack => {
                self.state = sampled;
                self.pending_ack = true;
                Some(sampled)
            }
            Some(sampled) if sampled == self.state && self.pending_ack => {
                self.pending_ack = false;
                None
            }
            _ => None,
        }
    }
}

#[cfg(windows)]
mod platform {
    use anyhow::Result;
    use windows::Win32::UI::Input::KeyboardAndMouse::GetKeyState;

    /// Samples the raw toggle state of `vk`. `GetKeyState` itself cannot
    /// fail; the Result keeps the sampler contract uniform across platforms.
    pub fn sample(vk: u16) -> Result<i16> {
        Ok(unsafe { GetKeyState(vk as i32) })
    }
}

#[cfg(not(windows))]
mod platform {
    use anyhow::{bail, Result};

    pub fn sample(_vk: u16) -> Result<i16> {
        bail!("toggle-key state sampling is only implemented on Windows")
    }
}

/// The monitor loop, generic over the sampler so tests can script samples.
async fn run_monitor<S>(
    key: WatchedKey,
    mut sample: S,
    tx: mpsc::Sender<OverlayEvent>,
    mut cancel: watch::Receiver<bool>,
) where
    S: FnMut() -> anyhow::Result<i16> + Send,
{
    let initial = match sample() {
        Ok(raw) => keys::decode_raw(raw) == Some(true),
        Err(e) => {
            error!(key = %key, "key state sampling failed: {e:#}");
            return;
        }
    };
    debug!(key = %key, initial, "monitor started");

    let mut debouncer = Debouncer::new(initial);
    let mut ticker = interval(SAMPLE_INTERVAL);
    loop {
        tokio::select! {
            // Either a cancel signal or the sender side going away stops the loop.
            _ = cancel.changed() => break,
            _ = ticker.tick() => {
                let raw = match sample() {
                    Ok(raw) => raw,
                    Err(e) => {
                        error!(key = %key, "key state sampling failed: {e:#}");
                        return;
                    }
                };
                if let Some(state) = debouncer.observe(raw) {
                    // Nothing emitted once cancellation has begun.
                    if *cancel.borrow() {
                        break;
                    }
                    if tx.send(OverlayEvent::Toggle(ToggleEvent::new(key, state))).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
    debug!(key = %key, "monitor cancelled");
}

fn spawn_monitor(
    key: WatchedKey,
    tx: mpsc::Sender<OverlayEvent>,
    cancel: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run_monitor(key, move || platform::sample(key.code()), tx, cancel))
}

/// The set of running key monitors for the current configuration. Rebuilt
/// on every reload.
pub struct MonitorSet {
    cancel: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl MonitorSet {
    /// Spawns one monitor task per configured key.
    pub fn spawn(keys: &[WatchedKey], tx: &mpsc::Sender<OverlayEvent>) -> Self {
        let (cancel, _) = watch::channel(false);
        let handles = keys
            .iter()
            .map(|&key| spawn_monitor(key, tx.clone(), cancel.subscribe()))
            .collect();
        Self { cancel, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancels all monitors and waits for them to observe the cancellation,
    /// which takes at most one sampling interval each.
    pub async fn shutdown(self) {
        let _ = self.cancel.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
