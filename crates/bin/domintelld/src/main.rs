//! # domintelld — Domintell gateway client daemon
//!
//! Composition root that wires the adapters into the gateway engine.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and install the log subscriber
//! - Construct the UDP connector and, when enabled, the snapshot store
//! - Start the gateway engine and print every `sensor_update` it reports
//! - Stop the engine cleanly on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no gateway logic belongs here.

mod config;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use domintell_adapter_storage_file::FileSnapshotStore;
use domintell_adapter_udp::UdpConnector;
use domintell_app::event_bus::EventBus;
use domintell_app::gateway::{Gateway, GatewayHandle};
use domintell_app::ports::SensorEvent;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Events
    let bus = EventBus::new(256);
    let mut events = bus.subscribe();

    // Engine
    let host = config.gateway.host.clone();
    let port = config.gateway.port;
    let mut gateway = Gateway::new(config.gateway, UdpConnector::new()).with_listener(bus);
    if config.persistence.enabled {
        let snapshot = FileSnapshotStore::new(config.persistence.path.clone())?;
        tracing::info!(path = %snapshot.path().display(), "sensor persistence enabled");
        gateway = gateway.with_snapshot(snapshot);
    }
    let handle = gateway.start();
    tracing::info!(%host, port, "domintelld started");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(err) = result {
                    tracing::error!(%err, "failed to listen for ctrl-c");
                }
                break;
            }
            event = events.recv() => match event {
                Ok(event) => print_update(&handle, &event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "sensor updates dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::info!("shutting down");
    handle.stop().await;
    Ok(())
}

fn print_update(handle: &GatewayHandle<UdpConnector>, event: &SensorEvent) {
    let id = event.device_id();
    match handle.device(id) {
        Some(device) => println!("{} {:?} => {}", event.kind(), id.as_str(), device.value),
        None => tracing::warn!(device_id = %id, "update for unknown device"),
    }
}
