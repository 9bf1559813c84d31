/// Watcher process lifecycle: single-instance enforcement on the watcher
/// side, liveness polling on the configuration side.
///
/// Process ids are never trusted across polling cycles; a watcher may exit
/// and restart under a new pid, so every cycle re-verifies the tracked pid
/// against a fresh enumeration and falls back to searching by executable
/// name.
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::debug;

/// Executable name of the watcher binary as it appears in the process list.
#[cfg(windows)]
pub const WATCHER_EXE: &str = "lockwatch-daemon.exe";
#[cfg(not(windows))]
pub const WATCHER_EXE: &str = "lockwatch-daemon";

/// Liveness poll cadence on the configuration side.
pub const LIVENESS_POLL: Duration = Duration::from_millis(1000);

/// Result of one liveness poll cycle. Emitted on every cycle, negative
/// results included, so the caller can reflect status continuously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessReport {
    pub running: bool,
    pub pid: Option<u32>,
}

impl LivenessReport {
    fn not_running() -> Self {
        Self { running: false, pid: None }
    }

    fn running(pid: Pid) -> Self {
        Self { running: true, pid: Some(pid.as_u32()) }
    }
}

fn name_matches(name: &str) -> bool {
    name.eq_ignore_ascii_case(WATCHER_EXE)
}

fn find_watcher(sys: &System, exclude: Option<Pid>) -> Option<Pid> {
    sys.processes()
        .iter()
        .filter(|(pid, _)| Some(**pid) != exclude)
        .find(|(_, p)| name_matches(&p.name().to_string_lossy()))
        .map(|(pid, _)| *pid)
}

/// Watcher-side startup check: fails when another watcher instance is
/// already running, before any monitor is started.
pub fn ensure_single_instance() -> anyhow::Result<()> {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, false);
    let me = sysinfo::get_current_pid()
        .map_err(|e| anyhow::anyhow!("failed to resolve own pid: {e}"))?;
    if let Some(pid) = find_watcher(&sys, Some(me)) {
        anyhow::bail!(
            "only one instance of the watcher is allowed; an existing one is running as pid {pid}"
        );
    }
    Ok(())
}

/// One configuration-side liveness probe against a fresh process list.
pub fn probe(sys: &mut System, tracked: &mut Option<Pid>) -> LivenessReport {
    sys.refresh_processes(ProcessesToUpdate::All, false);

    if let Some(pid) = *tracked {
        // Verify the retained pid still belongs to the watcher executable.
        match sys.process(pid) {
            Some(p) if name_matches(&p.name().to_string_lossy()) => {
                return LivenessReport::running(pid);
            }
            _ => *tracked = None,
        }
    }

    match find_watcher(sys, None) {
        Some(pid) => {
            debug!(pid = pid.as_u32(), "watcher process found");
            *tracked = Some(pid);
            LivenessReport::running(pid)
        }
        None => LivenessReport::not_running(),
    }
}

/// Configuration-side liveness loop: emits one [`LivenessReport`] per
/// cycle until the receiver is dropped. Enumeration trouble is reported as
/// not-running for that cycle and retried forever, never fatal.
pub async fn watch_liveness(tx: mpsc::Sender<LivenessReport>) {
    let mut sys = System::new();
    let mut tracked: Option<Pid> = None;
    let mut ticker = interval(LIVENESS_POLL);

    loop {
        ticker.tick().await;
        let report = probe(&mut sys, &mut tracked);
        if tx.send(report).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_matching_is_case_insensitive() {
        #[cfg(windows)]
        {
            assert!(name_matches("lockwatch-daemon.exe"));
            assert!(name_matches("Lockwatch-Daemon.EXE"));
        }
        #[cfg(not(windows))]
        {
            assert!(name_matches("lockwatch-daemon"));
            assert!(name_matches("LOCKWATCH-DAEMON"));
        }
        assert!(!name_matches("lockwatchctl"));
        assert!(!name_matches(""));
    }

    #[test]
    fn probe_without_watcher_reports_not_running() {
        // The watcher binary is not running in the test environment.
        let mut sys = System::new();
        let mut tracked = None;
        let report = probe(&mut sys, &mut tracked);
        assert_eq!(report, LivenessReport::not_running());
        assert!(tracked.is_none());
    }

    #[test]
    fn probe_drops_stale_pid_for_other_executable() {
        // Our own test process exists but is not the watcher executable, so
        // a retained pid pointing at it must be discarded.
        let mut sys = System::new();
        let me = sysinfo::get_current_pid().unwrap();
        let mut tracked = Some(me);
        let report = probe(&mut sys, &mut tracked);
        assert!(!report.running);
        assert!(tracked.is_none());
    }

    #[test]
    fn probe_drops_pid_that_no_longer_exists() {
        let mut sys = System::new();
        // A pid that should not exist.
        let mut tracked = Some(Pid::from_u32(u32::MAX - 7));
        let report = probe(&mut sys, &mut tracked);
        assert_eq!(report, LivenessReport::not_running());
        assert!(tracked.is_none());
    }

    #[test]
    fn single_instance_check_passes_without_a_watcher_running() {
        assert!(ensure_single_instance().is_ok());
    }

    #[tokio::test]
    async fn watch_liveness_reports_negative_cycles() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = tokio::spawn(watch_liveness(tx));
        // The first tick fires immediately; the report must arrive even
        // though nothing is running.
        let report = rx.recv().await.unwrap();
        assert!(!report.running);
        assert!(report.pid.is_none());
        drop(rx);
        let _ = handle.await;
    }
}
