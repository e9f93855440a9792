//! Listener socket setup

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;

/// Pending connection queue for the exporter listener
pub const LISTEN_BACKLOG: i32 = 128;

/// Create a non-blocking TCP listener bound to `addr`
///
/// `SO_REUSEADDR` is set so a restarted agent can rebind its metrics port
/// while old connections sit in TIME_WAIT.
pub fn create_tcp_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}
