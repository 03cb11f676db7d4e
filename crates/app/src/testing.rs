//! In-memory transport and snapshot store for engine tests.
//!
//! [`MockConnector`] hands out [`MockLink`]s that share one script:
//! - inbound datagrams (or read errors) are returned by `recv` in FIFO order
//! - every datagram passed to `send` is recorded as text
//! - connects and sends can be made to fail
//!
//! With [`MockConnector::accepting_logins`] every `LOGIN` is answered with
//! the session-opened line, so reconnects succeed without scripting.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use domintell_domain::device::Device;
use domintell_domain::error::DomintellError;
use domintell_domain::frame::SESSION_OPENED;

use crate::ports::{Connector, Link, SnapshotStore};

#[derive(Default)]
struct Script {
    inbound: Mutex<VecDeque<io::Result<Vec<u8>>>>,
    arrived: Notify,
    sent: Mutex<Vec<String>>,
    connects: AtomicUsize,
    failing_connects: AtomicUsize,
    failing_sends: AtomicBool,
    accept_logins: AtomicBool,
}

impl Script {
    fn push(&self, item: io::Result<Vec<u8>>) {
        self.inbound.lock().unwrap().push_back(item);
        self.arrived.notify_one();
    }
}

#[derive(Clone, Default)]
pub struct MockConnector {
    script: Arc<Script>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepting_logins() -> Self {
        let connector = Self::new();
        connector.script.accept_logins.store(true, Ordering::SeqCst);
        connector
    }

    pub fn push_inbound(&self, text: &str) {
        self.script.push(Ok(text.as_bytes().to_vec()));
    }

    pub fn push_inbound_bytes(&self, bytes: &[u8]) {
        self.script.push(Ok(bytes.to_vec()));
    }

    pub fn push_inbound_error(&self, kind: io::ErrorKind) {
        self.script.push(Err(io::Error::new(kind, "mock read failure")));
    }

    pub fn fail_next_connects(&self, count: usize) {
        self.script.failing_connects.store(count, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, failing: bool) {
        self.script.failing_sends.store(failing, Ordering::SeqCst);
    }

    /// Every datagram sent so far, across all links.
    pub fn sent(&self) -> Vec<String> {
        self.script.sent.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.script.connects.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    type Link = MockLink;

    fn connect(
        &self,
        _host: &str,
        _port: u16,
    ) -> impl Future<Output = io::Result<MockLink>> + Send {
        let script = Arc::clone(&self.script);
        async move {
            script.connects.fetch_add(1, Ordering::SeqCst);
            let failing = script.failing_connects.load(Ordering::SeqCst);
            if failing > 0 {
                script.failing_connects.store(failing - 1, Ordering::SeqCst);
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "mock connect failure",
                ));
            }
            Ok(MockLink { script })
        }
    }
}

pub struct MockLink {
    script: Arc<Script>,
}

impl Link for MockLink {
    fn send(&self, datagram: &[u8]) -> impl Future<Output = io::Result<()>> + Send {
        let result = if self.script.failing_sends.load(Ordering::SeqCst) {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"))
        } else {
            let text = String::from_utf8_lossy(datagram).into_owned();
            let login = text == "LOGIN";
            self.script.sent.lock().unwrap().push(text);
            if login && self.script.accept_logins.load(Ordering::SeqCst) {
                self.script
                    .push(Ok(format!("{SESSION_OPENED}\r\n").into_bytes()));
            }
            Ok(())
        };
        async move { result }
    }

    fn recv(&self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send {
        async move {
            loop {
                let notified = self.script.arrived.notified();
                let next = self.script.inbound.lock().unwrap().pop_front();
                if let Some(item) = next {
                    let bytes = item?;
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    return Ok(bytes.len());
                }
                notified.await;
            }
        }
    }
}

/// [`SnapshotStore`] keeping the last saved device set in memory.
#[derive(Clone, Default)]
pub struct MemorySnapshot {
    devices: Arc<Mutex<Vec<Device>>>,
    saves: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemorySnapshot {
    pub fn with_devices(devices: Vec<Device>) -> Self {
        let snapshot = Self::default();
        *snapshot.devices.lock().unwrap() = devices;
        snapshot
    }

    pub fn devices(&self) -> Vec<Device> {
        self.devices.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl SnapshotStore for MemorySnapshot {
    fn load(&self) -> Result<Vec<Device>, DomintellError> {
        Ok(self.devices())
    }

    fn save(&self, devices: &[Device]) -> Result<(), DomintellError> {
        if self.failing.load(Ordering::SeqCst) {
            let err = io::Error::new(io::ErrorKind::PermissionDenied, "mock save failure");
            return Err(DomintellError::Storage(Box::new(err)));
        }
        *self.devices.lock().unwrap() = devices.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
