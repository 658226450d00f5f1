//! Cleartext HTTP/2 via the HTTP/1.1 `Upgrade: h2c` mechanism
//!
//! RFC 7540 Section 3.2. The upgrade request itself becomes stream 1 of the
//! new connection; its response arrives as HTTP/2 frames after the `101`.

use super::client::{H2Client, H2ClientBuilder};
use super::error::Result;
use crate::http::{HttpClient, HttpRequest, HttpSession, ResponseHead, SessionOps, USER_AGENT};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Result of an upgrade attempt
pub enum Upgrade<S: SessionOps> {
    /// Server switched protocols; the preface exchange is complete
    Switched(H2Client<S>),
    /// Server answered in HTTP/1.x; the connection has been closed
    Refused(ResponseHead),
}

/// Build the upgrade request for `path` on `authority`
pub fn upgrade_request(authority: &str, path: &str, builder: &H2ClientBuilder) -> HttpRequest {
    let settings = URL_SAFE_NO_PAD.encode(builder.local_settings().encode_payload());

    HttpRequest::get(path)
        .header("Host", authority)
        .header("User-Agent", USER_AGENT)
        .header("Connection", "Upgrade, HTTP2-Settings")
        .header("Upgrade", "h2c")
        .header("HTTP2-Settings", settings)
        .build()
}

/// Ask the server to switch the connection to HTTP/2
///
/// On success stream 1 is the upgraded request: its response can be read
/// with `recv_response_headers(1)`.
pub fn upgrade<S: SessionOps>(
    session: HttpSession<S>,
    authority: &str,
    path: &str,
    builder: H2ClientBuilder,
) -> Result<Upgrade<S>> {
    let mut client = HttpClient::from_session(session);
    client.send_request(&upgrade_request(authority, path, &builder))?;

    let head = client.receive_head()?;
    if !head.is_h2c_upgrade() {
        log::debug!("h2c upgrade refused: {} {}", head.version(), head.status());
        if let Err(e) = client.close() {
            log::trace!("close after refused upgrade: {}", e);
        }
        return Ok(Upgrade::Refused(head));
    }

    log::debug!("h2c upgrade accepted");
    let mut h2 = builder
        .scheme("http")
        .authority(authority)
        .build_upgraded(client.into_session())?;
    h2.connect()?;

    Ok(Upgrade::Switched(h2))
}
