//! Source address discovery
//!
//! Results record where a scan was run from: the address of the interface
//! that routes to the internet, and the public address the targets see.

use crate::http::session::FdSessionOps;
use crate::http::{HttpClient, HttpRequest};
use crate::net;
use crate::probe::ScanConfig;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::{Duration, Instant};

/// Service answering a plain `GET /` with the caller's address
pub const EXTERNAL_IP_HOST: &str = "ifconfig.me";

/// Any routable address works; no packet is sent to it
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:1";

/// Addresses scans are run from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceAddrs {
    pub internal: Option<IpAddr>,
    pub external: Option<IpAddr>,
}

impl SourceAddrs {
    /// Look both addresses up
    ///
    /// The external lookup goes through the configured proxy, so it reports
    /// the address the targets will see.
    pub fn discover(config: &ScanConfig) -> Self {
        let internal = internal_ip();

        let external = match external_ip(config.proxy(), config.timeout()) {
            Ok(ip) => Some(ip),
            Err(e) => {
                log::warn!("could not determine external IP via {}: {}", EXTERNAL_IP_HOST, e);
                None
            }
        };

        log::debug!("source addresses: internal={:?} external={:?}", internal, external);
        SourceAddrs {
            internal: Some(internal),
            external,
        }
    }

    /// Neither address known
    pub fn unknown() -> Self {
        SourceAddrs::default()
    }
}

/// Address of the interface holding the default route, or loopback
pub fn internal_ip() -> IpAddr {
    let lookup = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(ROUTE_PROBE_ADDR)?;
        Ok(socket.local_addr()?.ip())
    };

    lookup().unwrap_or_else(|e| {
        log::warn!("could not determine internal IP: {}", e);
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    })
}

/// Ask `ifconfig.me` for our public address
pub fn external_ip(proxy: Option<&net::ProxyEndpoint>, timeout: Duration) -> Result<IpAddr, String> {
    let stream = net::open_stream(EXTERNAL_IP_HOST, 80, proxy, timeout).map_err(|e| e.to_string())?;

    let mut client = HttpClient::new(FdSessionOps::new(stream));
    client.set_timeout(timeout);
    client.set_deadline(Instant::now() + timeout);

    // a curl user agent gets the bare address instead of an HTML page
    let request = HttpRequest::get("/")
        .header("Host", EXTERNAL_IP_HOST)
        .header("User-Agent", "curl/8.4.0")
        .header("Accept", "text/plain")
        .header("Connection", "close")
        .build();

    let body = client
        .send_request(&request)
        .and_then(|_| client.receive_head())
        .and_then(|head| {
            if head.status().is_success() {
                client.read_body(&head).map(Some)
            } else {
                log::debug!("{} answered {}", EXTERNAL_IP_HOST, head.status());
                Ok(None)
            }
        });
    if let Err(e) = client.close() {
        log::trace!("closing {} connection: {}", EXTERNAL_IP_HOST, e);
    }

    let body = body
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "unexpected response status".to_string())?;
    parse_ip_body(&body)
}

fn parse_ip_body(body: &[u8]) -> Result<IpAddr, String> {
    let text = String::from_utf8_lossy(body);
    text.trim()
        .parse::<IpAddr>()
        .map_err(|_| format!("response is not an address: {:?}", text.chars().take(64).collect::<String>()))
}
