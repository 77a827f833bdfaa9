//! ConfigMap configuration provider (v1)
//!
//! Watches a Kubernetes ConfigMap and keeps an in-process configuration tree
//! in sync with it, without restarting the process.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                 CONFIGMAP PROVIDER                   │
//!                    │                                                      │
//!   API server       │  ┌──────────┐    ┌──────────┐    ┌───────────────┐  │
//!   watch events ────┼─▶│  source  │───▶│ provider │───▶│   convert     │  │
//!                    │  │  (kube)  │    │  worker  │    │ key_path      │  │
//!                    │  └──────────┘    └────┬─────┘    │ infer         │  │
//!                    │                       │          │ reconcile     │  │
//!                    │                       ▼          └───────────────┘  │
//!                    │                 ┌──────────┐                        │
//!   consumers  ◀─────┼─────────────────│  store   │ (ArcSwap + watch)      │
//!                    │                 └──────────┘                        │
//!                    │                                                      │
//!                    │  config · lifecycle · observability                  │
//!                    └──────────────────────────────────────────────────────┘
//! ```
//!
//! The process exits non-zero when the watch ends on a failure, so that its
//! supervisor restarts it and a fresh watch replays the current state.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use configmap_provider::config::{load_config, DEFAULT_SETTINGS_SECTION};
use configmap_provider::lifecycle::wait_for_termination;
use configmap_provider::observability::{logging::init_logging, metrics::init_metrics};
use configmap_provider::{ConfigMapProvider, KubeEventSource, SharedConfiguration};

#[derive(Parser)]
#[command(name = "configmap-provider")]
#[command(about = "Keep configuration in sync with a Kubernetes ConfigMap", long_about = None)]
struct Args {
    /// Settings file (TOML).
    #[arg(short, long, default_value = "configmap.toml")]
    config: PathBuf,

    /// Section of the settings file holding the provider settings.
    #[arg(short, long, default_value = DEFAULT_SETTINGS_SECTION)]
    section: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config, &args.section)?;

    init_logging(&config.runtime.logging)?;
    tracing::info!("configmap-provider v{} starting", env!("CARGO_PKG_VERSION"));

    if config.runtime.metrics.enabled {
        let addr: SocketAddr = config.runtime.metrics.address.parse()?;
        init_metrics(addr)?;
    }

    tracing::info!(
        namespace = %config.settings.namespace,
        config_map = ?config.settings.config_map_name,
        safe_update = config.settings.safe_update,
        optional = config.settings.optional,
        "Configuration loaded"
    );

    let source = Arc::new(KubeEventSource::try_default().await?);
    let store = Arc::new(SharedConfiguration::new());
    let provider = ConfigMapProvider::new(config.settings, source, Arc::clone(&store))?;

    let mut handle = provider.load().await?;
    tracing::info!(keys = store.len(), state = %handle.state(), "ConfigMap provider loaded");
    log_configuration(&store);

    let mut changes = store.subscribe();
    let mut states = handle.subscribe_state();
    let termination = wait_for_termination();
    tokio::pin!(termination);

    loop {
        tokio::select! {
            signal = &mut termination => {
                tracing::info!(signal = %signal?, "Shutdown signal received");
                break;
            }
            _ = states.wait_for(|state| state.is_terminal()) => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                log_configuration(&store);
            }
        }
    }

    let state = if handle.state().is_terminal() {
        handle.wait().await
    } else {
        handle.shutdown().await
    };

    if state.is_failure() {
        tracing::error!(state = %state, "ConfigMap watch ended, restart required");
        return Ok(ExitCode::FAILURE);
    }

    tracing::info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}

fn log_configuration(store: &SharedConfiguration) {
    let snapshot = store.snapshot();
    tracing::info!(version = store.version(), keys = snapshot.len(), "Configuration changed");
    for (path, value) in snapshot.iter() {
        tracing::debug!(path = %path, value = ?value, "Configuration entry");
    }
}
