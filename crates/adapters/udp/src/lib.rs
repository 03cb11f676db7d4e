//! # domintell-adapter-udp
//!
//! UDP adapter — implements the `Connector` / `Link` ports on
//! [`tokio::net::UdpSocket`].
//!
//! ## Responsibilities
//! - Resolve the gateway host name
//! - Bind an ephemeral local port of the matching address family, with
//!   address reuse enabled
//! - Connect the socket so that only the gateway's datagrams are received
//!
//! ## Dependency rule
//! Same as other adapters: depends on `domintell-app` (ports) only.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use domintell_app::ports::{Connector, Link};

/// Opens UDP links to a gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector;

impl UdpConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Connector for UdpConnector {
    type Link = UdpLink;

    fn connect(&self, host: &str, port: u16) -> impl Future<Output = io::Result<UdpLink>> + Send {
        let target = format!("{host}:{port}");
        async move {
            let peer = tokio::net::lookup_host(&target).await?.next().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for {target}"),
                )
            })?;
            let local = match peer {
                SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
                SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
            };
            let socket = bind_reusable(local)?;
            socket.connect(peer).await?;
            tracing::debug!(%peer, local = ?socket.local_addr().ok(), "udp socket connected");
            Ok(UdpLink { socket })
        }
    }
}

fn bind_reusable(local: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(local), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&local.into())?;
    UdpSocket::from_std(socket.into())
}

/// A UDP socket connected to one gateway.
#[derive(Debug)]
pub struct UdpLink {
    socket: UdpSocket,
}

impl UdpLink {
    #[cfg(test)]
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.socket.peer_addr()
    }
}

impl Link for UdpLink {
    fn send(&self, datagram: &[u8]) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            let written = self.socket.send(datagram).await?;
            if written == datagram.len() {
                Ok(())
            } else {
                Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("datagram truncated: {written} of {} bytes", datagram.len()),
                ))
            }
        }
    }

    fn recv(&self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send {
        self.socket.recv(buf)
    }
}
