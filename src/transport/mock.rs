//! Mock transport for testing.
//!
//! Every request is handed to a responder closure that plays the agent.
//! Whatever it returns is queued for the next `recv`; returning `None`
//! makes that `recv` time out immediately.

use super::{Connector, Transport};
use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = dyn Fn(&[u8]) -> Vec<Bytes> + Send + Sync;

struct MockInner {
    target: SocketAddr,
    responder: Box<Responder>,
    pending: VecDeque<Bytes>,
    requests: Vec<Bytes>,
    closes: usize,
    fail_close: bool,
    recv_delay: Duration,
}

/// In-memory transport driven by a responder closure.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    /// Mock whose responder answers each request with zero or more datagrams.
    pub fn new(
        target: SocketAddr,
        responder: impl Fn(&[u8]) -> Vec<Bytes> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                target,
                responder: Box::new(responder),
                pending: VecDeque::new(),
                requests: Vec::new(),
                closes: 0,
                fail_close: false,
                recv_delay: Duration::ZERO,
            })),
        }
    }

    /// Mock whose responder answers each request with at most one datagram.
    pub fn replying(
        target: SocketAddr,
        responder: impl Fn(&[u8]) -> Option<Bytes> + Send + Sync + 'static,
    ) -> Self {
        Self::new(target, move |req| responder(req).into_iter().collect())
    }

    /// Make `close` report an I/O failure.
    pub fn fail_close(&self) {
        self.inner.lock().unwrap().fail_close = true;
    }

    /// Make every `recv` wait `delay` before answering, like a slow agent.
    pub fn with_recv_delay(self, delay: Duration) -> Self {
        self.inner.lock().unwrap().recv_delay = delay;
        self
    }

    /// Every datagram sent so far.
    pub fn requests(&self) -> Vec<Bytes> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn close_count(&self) -> usize {
        self.inner.lock().unwrap().closes
    }
}

impl Transport for MockTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(Bytes::copy_from_slice(data));
        let replies = (inner.responder)(data);
        inner.pending.extend(replies);
        Ok(())
    }

    async fn recv(&self, request_id: i32, timeout: Duration) -> Result<Bytes> {
        let delay = self.inner.lock().unwrap().recv_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay.min(timeout)).await;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.pending.pop_front().ok_or(Error::Timeout {
            target: Some(inner.target),
            elapsed: timeout,
            request_id,
            retries: 0,
        })
    }

    fn peer_addr(&self) -> SocketAddr {
        self.inner.lock().unwrap().target
    }

    fn local_addr(&self) -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    async fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.closes += 1;
        if inner.fail_close {
            return Err(Error::Io {
                target: Some(inner.target),
                source: io::Error::other("close failed"),
            });
        }
        Ok(())
    }
}

/// Hands out clones of one [`MockTransport`] and counts connections.
#[derive(Clone)]
pub struct MockConnector {
    transport: MockTransport,
    connects: Arc<Mutex<usize>>,
}

impl MockConnector {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport,
            connects: Arc::new(Mutex::new(0)),
        }
    }

    pub fn transport(&self) -> &MockTransport {
        &self.transport
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, _target: SocketAddr) -> Result<MockTransport> {
        *self.connects.lock().unwrap() += 1;
        Ok(self.transport.clone())
    }
}
