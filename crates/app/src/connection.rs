//! Connection manager — session lifecycle on top of a [`Link`].
//!
//! ```text
//! Disconnected → Connecting → Authenticating → Ready
//!       ↑                                        │ I/O error
//!       └──── Connecting ← ReconnectWait ← Disconnected
//! ```
//!
//! The link slot is a `tokio::sync::Mutex` that doubles as the send lock:
//! every writer holds it for the duration of one datagram, and a failed
//! write clears the slot under the same lock.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};

use domintell_domain::command::Command;
use domintell_domain::error::CommandError;
use domintell_domain::frame::SESSION_OPENED;

use crate::config::GatewayConfig;
use crate::ports::{Connector, Link};

/// Largest datagram read in one go.
const MAX_DATAGRAM: usize = 4096;

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    ReconnectWait,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::ReconnectWait => "reconnect_wait",
        };
        f.write_str(name)
    }
}

/// Errors raised while talking to the gateway.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The link could not be opened.
    #[error("failed to open gateway link")]
    Connect(#[source] io::Error),

    /// A read or write on an open link failed.
    #[error("gateway link I/O failed")]
    Io(#[source] io::Error),

    /// The gateway answered `LOGIN` with something else than a session.
    #[error("login rejected by gateway: {0:?}")]
    LoginRejected(String),

    /// The gateway did not answer `LOGIN` in time.
    #[error("no reply to LOGIN")]
    NoLoginResponse,

    /// No link is open.
    #[error("gateway not connected")]
    NotConnected,
}

impl From<ConnectionError> for CommandError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Io(source) | ConnectionError::Connect(source) => Self::Send(source),
            ConnectionError::LoginRejected(_)
            | ConnectionError::NoLoginResponse
            | ConnectionError::NotConnected => Self::NotConnected,
        }
    }
}

/// Owns the link to one gateway.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    host: String,
    port: u16,
    poll_interval: Duration,
    read_timeout: Duration,
    link: Mutex<Option<Arc<C::Link>>>,
    state: watch::Sender<ConnectionState>,
}

impl<C: Connector> ConnectionManager<C> {
    #[must_use]
    pub fn new(connector: C, config: &GatewayConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            host: config.host.clone(),
            port: config.port,
            poll_interval: config.poll_interval(),
            read_timeout: config.read_timeout(),
            link: Mutex::new(None),
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::debug!(from = %current, to = %state, "connection state changed");
            *current = state;
            true
        });
    }

    /// Mark the manager as waiting for the reconnect backoff.
    pub(crate) fn mark_reconnect_wait(&self) {
        self.set_state(ConnectionState::ReconnectWait);
    }

    /// Open a link, log in and request the inventory.
    ///
    /// On success the manager is [`Ready`](ConnectionState::Ready) and
    /// `APPINFO` has been sent.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the link cannot be opened, the login
    /// is not acknowledged, or a write fails. The manager is then
    /// disconnected.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        self.set_state(ConnectionState::Connecting);
        if self.link.lock().await.take().is_some() {
            tracing::debug!("dropped previous gateway link");
        }
        tracing::info!(host = %self.host, port = self.port, "connecting to gateway");

        let link = match self.connector.connect(&self.host, self.port).await {
            Ok(link) => Arc::new(link),
            Err(err) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(ConnectionError::Connect(err));
            }
        };
        *self.link.lock().await = Some(link);
        self.set_state(ConnectionState::Authenticating);

        if let Err(err) = self.login().await {
            self.disconnect().await;
            return Err(err);
        }
        self.set_state(ConnectionState::Ready);
        tracing::info!(host = %self.host, port = self.port, "session opened");

        if let Err(err) = self.send(&Command::AppInfo).await {
            self.disconnect().await;
            return Err(err);
        }
        Ok(())
    }

    async fn login(&self) -> Result<(), ConnectionError> {
        self.send(&Command::Login).await?;
        let response = self
            .receive(self.poll_interval)
            .await?
            .ok_or(ConnectionError::NoLoginResponse)?;
        let first = response.lines().next().unwrap_or_default().trim_end();
        if first == SESSION_OPENED {
            Ok(())
        } else {
            Err(ConnectionError::LoginRejected(first.to_string()))
        }
    }

    /// Drop the link. Does nothing when already disconnected.
    pub async fn disconnect(&self) {
        if self.link.lock().await.take().is_some() {
            tracing::info!(host = %self.host, port = self.port, "disconnected from gateway");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Write one command as a single datagram.
    ///
    /// Returns the text that was sent. A failed write drops the link.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NotConnected`] without a link, or
    /// [`ConnectionError::Io`] when the write fails.
    pub async fn send(&self, command: &Command) -> Result<String, ConnectionError> {
        let mut slot = self.link.lock().await;
        let link = slot.as_ref().ok_or(ConnectionError::NotConnected)?;
        let text = command.to_string();
        if let Err(err) = link.send(text.as_bytes()).await {
            slot.take();
            self.set_state(ConnectionState::Disconnected);
            return Err(ConnectionError::Io(err));
        }
        tracing::trace!(command = %text, "sent");
        Ok(text)
    }

    /// Read whatever the gateway sent.
    ///
    /// Waits up to `first_wait` for a first datagram, then keeps reading
    /// while datagrams keep arriving within the read timeout and the text
    /// does not end with `\n`. Bytes that are not valid UTF-8 end the read;
    /// what was accumulated so far is returned.
    ///
    /// Returns `None` when nothing arrived.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NotConnected`] without a link, or
    /// [`ConnectionError::Io`] when the read fails.
    pub async fn receive(&self, first_wait: Duration) -> Result<Option<String>, ConnectionError> {
        let link = self
            .link
            .lock()
            .await
            .clone()
            .ok_or(ConnectionError::NotConnected)?;

        let mut buf = vec![0_u8; MAX_DATAGRAM];
        let mut text = String::new();
        let mut wait = first_wait;
        loop {
            let Ok(received) = tokio::time::timeout(wait, link.recv(&mut buf)).await else {
                break;
            };
            let len = received.map_err(ConnectionError::Io)?;
            match std::str::from_utf8(&buf[..len]) {
                Ok(chunk) => text.push_str(chunk),
                Err(err) => {
                    tracing::warn!(%err, "received bytes are not valid UTF-8");
                    break;
                }
            }
            if text.ends_with('\n') {
                break;
            }
            wait = self.read_timeout;
        }

        Ok((!text.is_empty()).then_some(text))
    }
}
