//! Transport layer abstraction.
//!
//! A [`Transport`] is one datagram channel to one agent. A [`Connector`]
//! opens transports, which lets the session layer run against UDP in
//! production and an in-memory mock in tests.

mod udp;

#[cfg(test)]
mod mock;

pub use udp::*;

#[cfg(test)]
pub use mock::*;

use crate::error::Result;
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// Client-side transport to a single agent.
///
/// Implementations are cheap to clone (`Arc` inside); all clones share the
/// same underlying channel.
pub trait Transport: Send + Sync + Clone {
    /// Send one request datagram.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `timeout` for the next datagram from the agent.
    ///
    /// `request_id` is only used to label the timeout error; responses are
    /// correlated by the caller.
    fn recv(&self, request_id: i32, timeout: Duration) -> impl Future<Output = Result<Bytes>> + Send;

    /// The agent this transport talks to.
    fn peer_addr(&self) -> SocketAddr;

    /// Local bind address.
    fn local_addr(&self) -> SocketAddr;

    /// Release the channel. Later sends fail; closing twice is a no-op.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens transports to agents.
pub trait Connector: Send + Sync {
    type Transport: Transport + 'static;

    fn connect(&self, target: SocketAddr) -> impl Future<Output = Result<Self::Transport>> + Send;
}
