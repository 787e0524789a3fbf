//! Session management.
//!
//! - [`V2cSession`]: stateless; every GET opens, uses and closes its own
//!   transport.
//! - [`V3Session`]: `Uninitialized -> Discovering -> Ready -> Closed`. The
//!   discovered engine, keys and transport live in a [`ReadySession`], which
//!   can only be built by a successful discovery.
//!
//! Both hand out something implementing [`Session`], which is all the query
//! executor needs.

mod v2c;
mod v3;

pub use v2c::V2cSession;
pub use v3::{ReadySession, V3Session};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::transport::Transport;
use crate::v3::UsmReport;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Discovering,
    Ready,
    Closed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Discovering => write!(f, "discovering"),
            Self::Ready => write!(f, "ready"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Timeouts and retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Single-attempt bound on engine discovery.
    pub discovery_timeout: Duration,
    /// Bound on each GET attempt.
    pub request_timeout: Duration,
    /// Extra attempts after the first GET times out.
    pub retries: u32,
}

impl Timing {
    pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_millis(1500);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);
    pub const DEFAULT_RETRIES: u32 = 2;
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            discovery_timeout: Self::DEFAULT_DISCOVERY_TIMEOUT,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            retries: Self::DEFAULT_RETRIES,
        }
    }
}

/// What came back for one GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetReply {
    Response(Pdu),
    /// The agent answered with a security REPORT instead.
    Report(UsmReport),
}

/// Something that can perform single-OID GETs against one agent.
pub trait Session: Send {
    fn get(&mut self, oid: &Oid) -> impl Future<Output = Result<GetReply>> + Send;

    fn target(&self) -> SocketAddr;
}

/// Request-id / msgID source. Starts at a random point so that ids from a
/// restarted process do not collide with stale datagrams.
#[derive(Debug)]
pub struct RequestIds(AtomicI32);

impl RequestIds {
    pub fn new() -> Self {
        let mut seed = [0u8; 4];
        // a fixed start only weakens collision avoidance
        let start = match getrandom::fill(&mut seed) {
            Ok(()) => i32::from_be_bytes(seed) & i32::MAX,
            Err(_) => 1,
        };
        Self(AtomicI32::new(start))
    }

    /// Next id in `1..=i32::MAX`.
    pub fn next(&self) -> i32 {
        loop {
            let id = self.0.fetch_add(1, Ordering::Relaxed) & i32::MAX;
            if id != 0 {
                return id;
            }
        }
    }
}

impl Default for RequestIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait up to `timeout` for a datagram that `accept` claims.
///
/// `accept` returns `None` for datagrams that belong to someone else (stale
/// ids, garbage); those are dropped and the wait continues. `Ok(None)` means
/// the attempt ran out of time.
pub(crate) async fn await_reply<T, R>(
    transport: &T,
    request_id: i32,
    timeout: Duration,
    mut accept: impl FnMut(Bytes) -> Option<Result<R>>,
) -> Result<Option<R>>
where
    T: Transport,
{
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        let data = match transport.recv(request_id, remaining).await {
            Ok(data) => data,
            Err(Error::Timeout { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        match accept(data) {
            Some(result) => return result.map(Some),
            None => {
                tracing::trace!(
                    snmp.target = %transport.peer_addr(),
                    snmp.request_id = request_id,
                    "discarding unrelated datagram"
                );
            }
        }
    }
}

/// The error reported when every attempt timed out.
pub(crate) fn timed_out(target: SocketAddr, request_id: i32, timing: &Timing, started: Instant) -> Error {
    Error::Timeout {
        target: Some(target),
        elapsed: started.elapsed(),
        request_id,
        retries: timing.retries,
    }
}
