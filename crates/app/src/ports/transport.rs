//! Transport port — datagram link to the gateway.

use std::future::Future;
use std::io;

/// An open, connected datagram link.
///
/// Both methods take `&self` so that the engine can read while a command
/// sender writes; the connection manager serialises writers.
pub trait Link: Send + Sync + 'static {
    /// Send one datagram.
    fn send(&self, datagram: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Wait for the next datagram and copy it into `buf`.
    ///
    /// Returns the number of bytes received. Callers bound the wait with a
    /// timeout.
    fn recv(&self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;
}

/// Opens [`Link`]s to a gateway.
pub trait Connector: Send + Sync + 'static {
    type Link: Link;

    /// Open a fresh link to `host:port`.
    fn connect(&self, host: &str, port: u16)
    -> impl Future<Output = io::Result<Self::Link>> + Send;
}
