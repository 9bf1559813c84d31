//! Configuration-side companion to the watcher.
//!
//! Stands in for the configuration UI process: edits and validates the
//! shared config, raises reload/terminate markers, watches the config file
//! for external edits, and polls watcher liveness. It never talks to the
//! watcher directly; everything goes through shared persistent state.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use lockwatch::config;
use lockwatch::coordination::{Marker, CONFIG_WATCH_POLL};
use lockwatch::paths;
use lockwatch::process_guard::{self, LivenessReport};

#[derive(Parser)]
#[command(name = "lockwatchctl", version, about = "Configure and control the lockwatch watcher")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the default config file if none exists.
    Init,
    /// Print the validated config.
    Show,
    /// Set a single config field and reload the running watcher.
    Set {
        /// Field name, e.g. display_time_ms, position, keys_to_watch.
        field: String,
        /// New value; keys_to_watch takes a comma-separated list.
        value: String,
    },
    /// Ask the running watcher to reload its configuration.
    Reload,
    /// Ask the running watcher to exit.
    Stop,
    /// Report whether the watcher is running.
    Status {
        /// Keep polling and print one line per cycle.
        #[arg(long)]
        watch: bool,
    },
    /// Block until the config file changes on disk, then request a reload.
    WatchConfig,
}

fn print_report(report: &LivenessReport) {
    match report.pid {
        Some(pid) => println!("running (pid {pid})"),
        None => println!("stopped"),
    }
}

fn raise(marker: &Marker, kind: &str) -> Result<()> {
    std::fs::create_dir_all(paths::app_data_dir())
        .context("failed to create app data directory")?;
    if marker
        .raise()
        .with_context(|| format!("failed to create {kind} marker"))?
    {
        println!("{kind} requested");
    } else {
        println!("a {kind} request is already pending");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = paths::config_file_path();

    match cli.command {
        Command::Init => {
            let created = !config_path.exists();
            config::load_or_init(&config_path)?;
            if created {
                println!("default config written to {}", config_path.display());
            } else {
                println!("config already exists at {}", config_path.display());
            }
        }

        Command::Show => {
            let config = config::load(&config_path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }

        Command::Set { field, value } => {
            let mut config = config::load_or_init(&config_path)?;
            config.set_field(&field, &value)?;
            // The file is only touched once the whole resource validates.
            config.validate()?;
            config.write(&config_path)?;
            println!("{field} = {value}");
            raise(&Marker::new(paths::reload_marker_path()), "reload")?;
        }

        Command::Reload => raise(&Marker::new(paths::reload_marker_path()), "reload")?,

        Command::Stop => raise(&Marker::new(paths::terminate_marker_path()), "terminate")?,

        Command::Status { watch } => {
            if watch {
                let (tx, mut rx) = mpsc::channel(4);
                tokio::spawn(process_guard::watch_liveness(tx));
                loop {
                    tokio::select! {
                        report = rx.recv() => match report {
                            Some(report) => print_report(&report),
                            None => break,
                        },
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
            } else {
                let mut sys = sysinfo::System::new();
                let mut tracked = None;
                print_report(&process_guard::probe(&mut sys, &mut tracked));
            }
        }

        Command::WatchConfig => {
            println!("watching {} for changes…", config_path.display());
            lockwatch::coordination::wait_for_config_change(&config_path, CONFIG_WATCH_POLL)
                .await
                .context("config watch failed")?;
            println!("config changed");
            raise(&Marker::new(paths::reload_marker_path()), "reload")?;
        }
    }

    Ok(())
}
