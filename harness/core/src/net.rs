use std::net::{SocketAddr, TcpListener, ToSocketAddrs as _};

use url::Url;

/// Bind-and-release allocation of a free TCP port on loopback.
#[must_use]
pub fn get_available_tcp_port() -> Option<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).ok()?;
    listener.local_addr().ok().map(|addr| addr.port())
}

/// Resolve the socket address a base URL asks to listen on.
#[must_use]
pub fn socket_addr_for(url: &Url) -> Option<SocketAddr> {
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    (host, port).to_socket_addrs().ok()?.next()
}
