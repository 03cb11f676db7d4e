//! Gateway connection configuration.

use std::time::Duration;

use serde::Deserialize;

/// Default UDP port of a Domintell gateway.
pub const DEFAULT_PORT: u16 = 17481;

/// Configuration for the gateway engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway hostname or IP address.
    pub host: String,
    /// Gateway UDP port.
    pub port: u16,
    /// How long a read waits for the first datagram, in milliseconds.
    pub poll_interval_ms: u64,
    /// Inactivity timeout while accumulating a multi-datagram read, in
    /// milliseconds. Restarts after every datagram.
    pub read_timeout_ms: u64,
    /// Interval between `PING` keepalives, in seconds.
    pub keepalive_interval_secs: u64,
    /// Wait between reconnect attempts, in seconds.
    pub reconnect_backoff_secs: u64,
    /// Yield before each read when the work queue is empty, in milliseconds.
    pub idle_sleep_ms: u64,
}

impl GatewayConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[must_use]
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    #[must_use]
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }

    #[must_use]
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            poll_interval_ms: 1000,
            read_timeout_ms: 1000,
            keepalive_interval_secs: 60,
            reconnect_backoff_secs: 10,
            idle_sleep_ms: 20,
        }
    }
}
