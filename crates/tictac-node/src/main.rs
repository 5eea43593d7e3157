//! Server binary for the tic-tac-toe session service.
//!
//! Wires configuration, logging, the snapshot store, the sync bus, the
//! session coordinator, and the gateway into one process. Several nodes
//! pointed at the same `Dragonfly` and NATS serve one shared session.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `tictac-config.yaml` (or `TICTAC_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the snapshot store and sync bus
//! 4. Create the session coordinator and resume from the store
//! 5. Start the sync listener
//! 6. Start the gateway
//! 7. Run until `Ctrl-C` or the gateway exits

mod error;

use std::sync::Arc;

use tictac_bus::{MemoryBus, NatsBus, SyncBus};
use tictac_core::config::{Backend, InfrastructureConfig, LogFormat, LoggingConfig};
use tictac_core::{SessionCoordinator, TictacConfig};
use tictac_gateway::AppState;
use tictac_store::{DragonflyStore, MemoryStore, SnapshotStore};
use tictac_types::{InstanceId, SessionId};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::NodeError;

/// Application entry point for a session node.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the gateway cannot
/// bind its listener.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = TictacConfig::load().map_err(NodeError::from)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("tictac-node starting");

    let instance = config
        .session
        .instance_id
        .map_or_else(InstanceId::new, InstanceId::from);
    let session_id = SessionId::new(config.session.id.clone());
    info!(
        %instance,
        session = %session_id,
        backend = ?config.infrastructure.backend,
        "Configuration loaded"
    );

    // 3. Connect the backplane.
    let (store, bus) = connect_backplane(&config.infrastructure).await;

    // 4. Create the coordinator and resume the shared session.
    let coordinator = Arc::new(SessionCoordinator::new(instance, session_id, store, bus));
    coordinator.resume().await;

    // 5. Start the sync listener.
    match coordinator.subscribe().await {
        Ok(events) => {
            tokio::spawn(Arc::clone(&coordinator).run_sync_listener(events));
        }
        Err(e) => warn!(error = %e, "sync bus subscription failed; peers will not be mirrored"),
    }

    // 6. Start the gateway.
    let state = Arc::new(AppState::new(
        Arc::clone(&coordinator),
        config.server.keepalive_secs,
    ));
    let (addr, gateway) = tictac_gateway::spawn_gateway(&config.server, state)
        .await
        .map_err(NodeError::from)?;
    info!(%addr, "tictac-node ready");

    // 7. Run until interrupted.
    tokio::select! {
        result = gateway => {
            if let Err(e) = result {
                return Err(NodeError::GatewayTask { message: format!("{e}") }.into());
            }
            warn!("gateway exited");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    Ok(())
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Build the store and bus for the configured backend.
///
/// An unreachable `Dragonfly` or NATS server does not stop the node: the
/// affected half falls back to its in-process adapter and the node serves
/// standalone for that concern.
async fn connect_backplane(
    infra: &InfrastructureConfig,
) -> (Arc<dyn SnapshotStore>, Arc<dyn SyncBus>) {
    match infra.backend {
        Backend::Memory => {
            info!("Using in-process store and bus");
            (
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryBus::new(infra.channel_prefix.clone())),
            )
        }
        Backend::Remote => {
            let store: Arc<dyn SnapshotStore> =
                match DragonflyStore::connect(&infra.dragonfly_url).await {
                    Ok(store) => Arc::new(store),
                    Err(e) => {
                        warn!(error = %e, "Dragonfly unreachable; using in-process store");
                        Arc::new(MemoryStore::new())
                    }
                };
            let bus: Arc<dyn SyncBus> =
                match NatsBus::connect(&infra.nats_url, infra.channel_prefix.clone()).await {
                    Ok(bus) => Arc::new(bus),
                    Err(e) => {
                        warn!(error = %e, "NATS unreachable; using in-process bus");
                        Arc::new(MemoryBus::new(infra.channel_prefix.clone()))
                    }
                };
            (store, bus)
        }
    }
}
