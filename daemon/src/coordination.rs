/// Filesystem-mediated coordination between the watcher and the
/// configuration process.
///
/// A request is the presence of a zero-byte marker file: lockwatchctl
/// creates it, the watcher acts on it and deletes it. Absence means "no
/// pending request"; there is no partial state to reconcile. Races around
/// existence checks are benign, the next polling tick re-evaluates.
use std::io;
use std::path::{Path, PathBuf};
use tokio::time::{sleep, Duration};
use tracing::warn;

use crate::paths;

/// Watcher-side marker poll cadence.
pub const COORDINATION_POLL: Duration = Duration::from_millis(1000);
/// Configuration-side config mtime poll cadence.
pub const CONFIG_WATCH_POLL: Duration = Duration::from_millis(50);

/// A one-shot boolean request signalled by a marker file's existence.
#[derive(Debug, Clone)]
pub struct Marker {
    path: PathBuf,
}

impl Marker {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_raised(&self) -> bool {
        self.path.exists()
    }

    /// Producer side: atomically creates the marker. Returns `false` when a
    /// marker of this kind is already outstanding (at most one may exist).
    pub fn raise(&self) -> io::Result<bool> {
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Consumer side: deletes the marker, acknowledging the request.
    /// Returns whether a marker was actually present. Deleting an absent
    /// marker (or losing a race to another delete) is a no-op.
    pub fn consume(&self) -> bool {
        match std::fs::remove_file(&self.path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                // Transient; the next polling tick re-evaluates.
                warn!(path = %self.path.display(), "failed to consume marker: {e}");
                false
            }
        }
    }
}

/// A pending cross-process request, in the order the watcher must apply
/// them within one polling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Reload,
    Terminate,
}

/// Both signal channels as seen by the watcher.
pub struct CoordinationChannel {
    pub reload: Marker,
    pub terminate: Marker,
}

impl CoordinationChannel {
    pub fn new(reload_path: PathBuf, terminate_path: PathBuf) -> Self {
        Self {
            reload: Marker::new(reload_path),
            terminate: Marker::new(terminate_path),
        }
    }

    pub fn at_default_paths() -> Self {
        Self::new(paths::reload_marker_path(), paths::terminate_marker_path())
    }

    /// Requests pending on this tick. Reload always precedes terminate so
    /// that a reload is fully applied first and a simultaneous terminate
    /// still wins deterministically.
    pub fn pending(&self) -> Vec<Request> {
        let mut requests = Vec::new();
        if self.reload.is_raised() {
            requests.push(Request::Reload);
        }
        if self.terminate.is_raised() {
            requests.push(Request::Terminate);
        }
        requests
    }
}

/// One-shot config-change watch: polls the file's modification timestamp
/// and returns once it changes. The caller restarts the watch explicitly
/// when it wants to observe the next change.
///
/// Transient stat failures mid-watch are silent; the next poll
/// re-evaluates. Only the initial stat can fail the watch.
pub async fn wait_for_config_change(path: &Path, poll: Duration) -> io::Result<()> {
    let baseline = std::fs::metadata(path)?.modified()?;
    loop {
        sleep(poll).await;
        match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(stamp) if stamp != baseline => return Ok(()),
            Ok(_) | Err(_) => {}
        }
    }
}
