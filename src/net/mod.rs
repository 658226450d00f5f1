//! Address resolution and timed TCP connections
//!
//! Every probe connection starts here: resolve the target (or the proxy),
//! connect with a bounded wait, and apply the same bound to socket reads and
//! writes so that blocking steps such as the TLS handshake cannot hang.

pub mod proxy;

pub use proxy::ProxyEndpoint;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Networking errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} resolved to no addresses")]
    NoAddress(String),

    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("timed out {0}")]
    Timeout(String),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for networking operations
pub type Result<T> = std::result::Result<T, Error>;

/// Render `host:port`, bracketing IPv6 literals
pub fn format_authority(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Resolve `host` to socket addresses, in resolver order
pub fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| Error::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(Error::NoAddress(host.to_string()));
    }
    Ok(addrs)
}

/// Connect to one address within `timeout`
///
/// The returned stream has `timeout` as its read and write timeout and
/// Nagle disabled.
pub fn connect_addr(addr: SocketAddr, timeout: Duration) -> Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    socket
        .connect_timeout(&SockAddr::from(addr), timeout)
        .map_err(|source| match source.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Error::Timeout(format!("connecting to {}", addr))
            }
            _ => Error::Connect { addr, source },
        })?;

    socket.set_nodelay(true)?;
    socket.set_read_timeout(Some(timeout))?;
    socket.set_write_timeout(Some(timeout))?;

    log::debug!("connected to {}", addr);
    Ok(socket.into())
}

/// Resolve `host` and connect to the first address that answers
///
/// The addresses share `timeout` between them; the last failure is returned
/// when none of them can be reached in time.
pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let deadline = Instant::now() + timeout;
    let mut last_error = None;

    for addr in resolve(host, port)? {
        let left = match deadline.checked_duration_since(Instant::now()) {
            Some(left) if !left.is_zero() => left,
            _ => {
                last_error = Some(Error::Timeout(format!("connecting to {}", format_authority(host, port))));
                break;
            }
        };
        match connect_addr(addr, left) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                log::debug!("{}", e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::NoAddress(host.to_string())))
}

/// Open a TCP stream to `host:port`, through `proxy` when one is given
pub fn open_stream(
    host: &str,
    port: u16,
    proxy: Option<&ProxyEndpoint>,
    timeout: Duration,
) -> Result<TcpStream> {
    match proxy {
        Some(proxy) => {
            let stream = connect(proxy.host(), proxy.port(), timeout)
                .map_err(|e| Error::Proxy(format!("cannot reach {}: {}", proxy, e)))?;
            proxy.tunnel(stream, host, port, timeout)
        }
        None => connect(host, port, timeout),
    }
}
