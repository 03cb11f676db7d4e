//! Gateway engine — the background task driving one gateway.
//!
//! Each iteration of the loop:
//!
//! 1. connect if needed, or wait out the reconnect backoff
//! 2. send a `PING` when the keepalive is due
//! 3. execute one queued [`WorkItem`] if there is one, then start over
//! 4. otherwise yield briefly, read what arrived and queue every complete
//!    line for decoding
//!
//! Decoding, store mutation, persistence and listener calls all happen on
//! this task, in the order lines were received.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use domintell_domain::command::Command;
use domintell_domain::device::{Device, DeviceValue};
use domintell_domain::error::CommandError;
use domintell_domain::frame::{self, Frame};
use domintell_domain::id::DeviceId;

use crate::config::GatewayConfig;
use crate::connection::{ConnectionError, ConnectionManager, ConnectionState};
use crate::lines::LineBuffer;
use crate::ports::{Connector, EventListener, SensorEvent, SnapshotStore};
use crate::queue::{WorkItem, WorkReceiver, WorkSender, work_queue};
use crate::sensor_store::{SensorStore, SharedSensorStore};

/// Builder for a running gateway engine.
pub struct Gateway<C: Connector> {
    config: GatewayConfig,
    connector: C,
    snapshot: Option<Box<dyn SnapshotStore>>,
    listeners: Vec<Box<dyn EventListener>>,
}

impl<C: Connector> Gateway<C> {
    #[must_use]
    pub fn new(config: GatewayConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            snapshot: None,
            listeners: Vec::new(),
        }
    }

    /// Restore from and persist every change to `snapshot`.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: impl SnapshotStore + 'static) -> Self {
        self.snapshot = Some(Box::new(snapshot));
        self
    }

    /// Register a listener for [`SensorEvent`]s.
    #[must_use]
    pub fn with_listener(mut self, listener: impl EventListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Restore the persisted state and spawn the engine task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> GatewayHandle<C> {
        let store = SharedSensorStore::new(self.restore());
        let connection = Arc::new(ConnectionManager::new(self.connector, &self.config));
        let (queue, work) = work_queue();
        let stop = Arc::new(AtomicBool::new(false));

        let engine = Engine {
            config: self.config,
            connection: Arc::clone(&connection),
            store: store.clone(),
            queue: queue.clone(),
            work,
            lines: LineBuffer::new(),
            snapshot: self.snapshot,
            listeners: self.listeners,
            stop: Arc::clone(&stop),
            last_keepalive: None,
        };
        let task = tokio::spawn(engine.run());

        GatewayHandle {
            connection,
            store,
            queue,
            stop,
            task,
        }
    }

    fn restore(&self) -> SensorStore {
        let Some(snapshot) = &self.snapshot else {
            return SensorStore::new();
        };
        match snapshot.load() {
            Ok(devices) => {
                let store = SensorStore::from_devices(devices);
                tracing::info!(devices = store.len(), "restored sensor snapshot");
                store
            }
            Err(err) => {
                tracing::warn!(%err, "failed to load sensor snapshot, starting empty");
                SensorStore::new()
            }
        }
    }
}

/// Collaborator-facing handle on a running engine.
pub struct GatewayHandle<C: Connector> {
    connection: Arc<ConnectionManager<C>>,
    store: SharedSensorStore,
    queue: WorkSender,
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl<C: Connector> GatewayHandle<C> {
    /// Current record for `id`.
    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<Device> {
        self.store.device(id)
    }

    /// Every record, sorted by id.
    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        self.store.snapshot()
    }

    /// Switch an output on or off.
    ///
    /// The command is written immediately, not queued. The store is not
    /// touched; the record changes when the gateway echoes the new status.
    /// Returns the command text that was sent.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if `id` is unknown, is not an output, or the
    /// gateway is not connected or the write fails.
    pub async fn set_value(
        &self,
        id: &DeviceId,
        value: impl Into<DeviceValue>,
    ) -> Result<String, CommandError> {
        let device = self
            .store
            .device(id)
            .ok_or_else(|| CommandError::UnknownDevice(id.clone()))?;
        let command = Command::switch(&device, &value.into())?;
        if !self.connection.is_ready() {
            return Err(CommandError::NotConnected);
        }
        let sent = self.connection.send(&command).await?;
        tracing::debug!(device_id = %id, command = %sent, "command sent");
        Ok(sent)
    }

    /// Ask the gateway for its inventory again.
    ///
    /// The request goes through the work queue and is written by the
    /// engine in order with pending decode work.
    pub fn refresh_inventory(&self) {
        if !self.queue.push(WorkItem::Send(Command::AppInfo)) {
            tracing::warn!("gateway engine stopped, inventory refresh dropped");
        }
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Watch connection state transitions.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Ask the engine to stop and wait for it to disconnect.
    ///
    /// The flag is checked once per loop iteration, so this returns once
    /// the current read, write or backoff wait has finished.
    pub async fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(err) = self.task.await {
            tracing::error!(%err, "gateway engine task failed");
        }
    }
}

struct Engine<C: Connector> {
    config: GatewayConfig,
    connection: Arc<ConnectionManager<C>>,
    store: SharedSensorStore,
    queue: WorkSender,
    work: WorkReceiver,
    lines: LineBuffer,
    snapshot: Option<Box<dyn SnapshotStore>>,
    listeners: Vec<Box<dyn EventListener>>,
    stop: Arc<AtomicBool>,
    last_keepalive: Option<Instant>,
}

impl<C: Connector> Engine<C> {
    async fn run(mut self) {
        tracing::debug!("gateway engine started");
        while !self.stop.load(Ordering::SeqCst) {
            if !self.connection.is_ready() {
                self.reconnect().await;
                continue;
            }
            if let Err(err) = self.iterate().await {
                tracing::warn!(%err, "gateway link failed, reconnecting");
                self.connection.disconnect().await;
            }
        }
        self.connection.disconnect().await;
        tracing::debug!("gateway engine stopped");
    }

    async fn reconnect(&mut self) {
        self.lines.clear();
        self.last_keepalive = None;
        if let Err(err) = self.connection.connect().await {
            let backoff = self.config.reconnect_backoff();
            tracing::warn!(%err, backoff_secs = backoff.as_secs(), "failed to connect to gateway");
            self.connection.mark_reconnect_wait();
            tokio::time::sleep(backoff).await;
        }
    }

    async fn iterate(&mut self) -> Result<(), ConnectionError> {
        self.keepalive().await?;

        if let Some(item) = self.work.try_next() {
            return self.execute(item).await;
        }

        tokio::time::sleep(self.config.idle_sleep()).await;
        if let Some(text) = self.connection.receive(self.config.poll_interval()).await? {
            for line in self.lines.push(&text) {
                self.queue.push(WorkItem::DecodeLine(line));
            }
        }
        Ok(())
    }

    async fn keepalive(&mut self) -> Result<(), ConnectionError> {
        let due = self
            .last_keepalive
            .is_none_or(|sent| sent.elapsed() >= self.config.keepalive_interval());
        if due {
            self.connection.send(&Command::Ping).await?;
            self.last_keepalive = Some(Instant::now());
        }
        Ok(())
    }

    async fn execute(&mut self, item: WorkItem) -> Result<(), ConnectionError> {
        let reply = match item {
            WorkItem::DecodeLine(line) => self.decode_line(&line),
            WorkItem::Send(command) => Some(command),
        };
        if let Some(command) = reply {
            self.connection.send(&command).await?;
        }
        Ok(())
    }

    /// Decode and apply one line. Returns the reply to send, if any.
    fn decode_line(&self, line: &str) -> Option<Command> {
        tracing::trace!(line = line.trim_end(), "received");
        let frame = match frame::decode(line) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, line = line.trim_end(), "dropping malformed frame");
                return None;
            }
        };
        match &frame {
            Frame::UnknownModule(module) => tracing::debug!(%module, "unknown module"),
            Frame::Unrecognized => {
                tracing::debug!(line = line.trim_end(), "unrecognized frame");
            }
            Frame::EndOfInventory => tracing::info!("inventory received"),
            _ => {}
        }

        let changed = self.store.write().apply(&frame, chrono::Utc::now());
        if !changed.is_empty() {
            self.persist();
            for device_id in changed {
                self.notify(&SensorEvent::SensorUpdate { device_id });
            }
        }
        frame.reply()
    }

    fn persist(&self) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        let devices = self.store.snapshot();
        if let Err(err) = snapshot.save(&devices) {
            tracing::error!(%err, "failed to persist sensor snapshot");
        }
    }

    fn notify(&self, event: &SensorEvent) {
        for listener in &self.listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(%err, %event, "listener failed"),
                Err(_) => tracing::error!(%event, "listener panicked"),
            }
        }
    }
}

#[cfg(test)]
mod tests;
