use std::path::Path;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lockwatch::config::{self, Config};
use lockwatch::coordination::{CoordinationChannel, Request, COORDINATION_POLL};
use lockwatch::event::{OverlayEvent, RenderCommand, ToggleEvent};
use lockwatch::fatal;
use lockwatch::keystate::MonitorSet;
use lockwatch::overlay::{self, Overlay, OverlaySettings};
use lockwatch::paths;
use lockwatch::process_guard;

/// Loads and validates the shared config. Any fault in the resource itself
/// deletes it (forcing regeneration on next start), surfaces a single
/// blocking notification, and terminates.
fn load_config_or_exit(path: &Path) -> Config {
    match config::load_or_discard(path) {
        Ok(config) => config,
        Err(config::ConfigError::Missing(_)) => {
            fatal::notify(
                "lockwatch launch error",
                "Configuration file not found, open the lockwatch configuration tool to manage.",
            );
            std::process::exit(1);
        }
        Err(e) => {
            fatal::notify("Unable to load configuration file.", &e.to_string());
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = paths::app_data_dir();
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        fatal::notify(
            "lockwatch launch error",
            &format!("Failed to create app data directory {}: {e}", app_dir.display()),
        );
        std::process::exit(1);
    }

    // ── Single instance ───────────────────────────────────────────────────────
    if let Err(e) = process_guard::ensure_single_instance() {
        fatal::notify("lockwatch launch error", &format!("{e:#}"));
        std::process::exit(1);
    }

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let config = load_config_or_exit(&config_path);

    // ── Overlay state machine + renderer boundary ─────────────────────────────
    let (render_tx, render_rx) = mpsc::channel::<RenderCommand>(16);
    tokio::spawn(overlay::log_render_commands(render_rx));

    let (overlay_tx, overlay_rx) = mpsc::channel::<OverlayEvent>(32);
    tokio::spawn(overlay::run(
        Overlay::new(OverlaySettings::from_config(&config)),
        overlay_rx,
        render_tx,
    ));

    // One synthetic event so the display surface initializes without a real
    // key action.
    let _ = overlay_tx
        .send(OverlayEvent::Toggle(ToggleEvent::startup()))
        .await;

    // ── Key monitors ──────────────────────────────────────────────────────────
    let mut monitors = MonitorSet::spawn(&config.keys_to_watch, &overlay_tx);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        keys = config.keys_to_watch.len(),
        "lockwatch watcher started"
    );

    // ── Coordination loop ─────────────────────────────────────────────────────
    let channel = CoordinationChannel::at_default_paths();
    let mut ticker = interval(COORDINATION_POLL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for request in channel.pending() {
                    match request {
                        Request::Reload => {
                            info!("reload requested");
                            monitors.shutdown().await;
                            let config = load_config_or_exit(&config_path);
                            let _ = overlay_tx
                                .send(OverlayEvent::Apply(OverlaySettings::from_config(&config)))
                                .await;
                            monitors = MonitorSet::spawn(&config.keys_to_watch, &overlay_tx);
                            channel.reload.consume();
                            info!(keys = monitors.len(), "reload applied");
                        }
                        Request::Terminate => {
                            info!("terminate requested");
                            monitors.shutdown().await;
                            channel.terminate.consume();
                            return;
                        }
                    }
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupt received, shutting down");
                monitors.shutdown().await;
                return;
            }
        }
    }
}
