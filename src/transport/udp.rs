//! UDP transport implementation.

use super::{Connector, Transport};
use crate::error::{Error, Result};
use crate::util::{RECV_BUFFER_SIZE, bind_udp_socket};
use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Largest datagram accepted from an agent.
const MAX_DATAGRAM: usize = 65535;

/// UDP transport owning a connected socket to one agent.
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

struct UdpTransportInner {
    socket: UdpSocket,
    target: SocketAddr,
    local_addr: SocketAddr,
    closed: AtomicBool,
}

impl UdpTransport {
    /// Bind an ephemeral socket and connect it to `target`.
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        let io_err = |source| Error::Io {
            target: Some(target),
            source,
        };

        let socket = bind_udp_socket(target, Some(RECV_BUFFER_SIZE)).map_err(io_err)?;
        socket.connect(target).await.map_err(io_err)?;
        let local_addr = socket.local_addr().map_err(io_err)?;

        tracing::debug!(
            snmp.target = %target,
            snmp.local_addr = %local_addr,
            "UDP transport connected"
        );

        Ok(Self {
            inner: Arc::new(UdpTransportInner {
                socket,
                target,
                local_addr,
                closed: AtomicBool::new(false),
            }),
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(Error::Io {
                target: Some(self.inner.target),
                source: io::Error::new(io::ErrorKind::NotConnected, "transport closed"),
            });
        }
        Ok(())
    }
}

impl Transport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        self.check_open()?;
        tracing::trace!(
            snmp.target = %self.inner.target,
            snmp.bytes = data.len(),
            "UDP send"
        );
        self.inner.socket.send(data).await.map_err(|e| Error::Io {
            target: Some(self.inner.target),
            source: e,
        })?;
        Ok(())
    }

    async fn recv(&self, request_id: i32, recv_timeout: Duration) -> Result<Bytes> {
        self.check_open()?;
        let mut buf = vec![0u8; MAX_DATAGRAM];

        match timeout(recv_timeout, self.inner.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                buf.truncate(len);
                tracing::trace!(
                    snmp.target = %self.inner.target,
                    snmp.bytes = len,
                    "UDP recv complete"
                );
                Ok(Bytes::from(buf))
            }
            Ok(Err(e)) => Err(Error::Io {
                target: Some(self.inner.target),
                source: e,
            }),
            Err(_) => {
                tracing::trace!(
                    snmp.target = %self.inner.target,
                    snmp.request_id = request_id,
                    "UDP recv timeout"
                );
                Err(Error::Timeout {
                    target: Some(self.inner.target),
                    elapsed: recv_timeout,
                    request_id,
                    retries: 0,
                })
            }
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.inner.target
    }

    fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    async fn close(&self) -> Result<()> {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(snmp.target = %self.inner.target, "UDP transport closed");
        }
        Ok(())
    }
}

/// Opens a fresh [`UdpTransport`] per connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector;

impl Connector for UdpConnector {
    type Transport = UdpTransport;

    async fn connect(&self, target: SocketAddr) -> Result<UdpTransport> {
        UdpTransport::connect(target).await
    }
}
