//! Internal utilities.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Receive buffer requested for manager sockets. The kernel may cap this at
/// `net.core.rmem_max`.
pub(crate) const RECV_BUFFER_SIZE: usize = 256 * 1024;

/// Bind an ephemeral UDP socket in the address family of `target`.
///
/// IPv6 sockets are dual-stack (`IPV6_V6ONLY = false`) so that v4-mapped
/// targets work from the same socket.
pub(crate) fn bind_udp_socket(
    target: SocketAddr,
    recv_buffer_size: Option<usize>,
) -> io::Result<UdpSocket> {
    let (domain, local): (Domain, SocketAddr) = if target.is_ipv6() {
        (Domain::IPV6, (Ipv6Addr::UNSPECIFIED, 0).into())
    } else {
        (Domain::IPV4, (Ipv4Addr::UNSPECIFIED, 0).into())
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if target.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    if let Some(size) = recv_buffer_size {
        // capped by the kernel; a smaller buffer still works
        let _ = socket.set_recv_buffer_size(size);
    }
    socket.set_nonblocking(true)?;
    socket.bind(&local.into())?;

    UdpSocket::from_std(socket.into())
}

/// Lowercase hex without separators, for engine IDs in log fields.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
