//! Negotiated TLS parameters
//!
//! Captured once after the handshake. The negotiator branches on `alpn`;
//! the rest is logged so a scan's debug output shows what was agreed.

use openssl::ssl::SslRef;
use std::fmt;

/// ALPN identifier for HTTP/2 over TLS
pub const ALPN_H2: &str = "h2";

/// ALPN identifier for HTTP/1.1
pub const ALPN_HTTP11: &str = "http/1.1";

/// TLS variables available after handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsVars {
    /// Negotiated TLS version (e.g., "TLSv1.3")
    pub version: String,

    /// Negotiated cipher suite
    pub cipher: String,

    /// Negotiated ALPN protocol, if the server selected one
    pub alpn: Option<String>,
}

impl TlsVars {
    /// Create TLS variables from an SSL connection
    pub fn from_ssl(ssl: &SslRef) -> Self {
        TlsVars {
            version: ssl.version_str().to_string(),
            cipher: ssl
                .current_cipher()
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "<undef>".to_string()),
            alpn: ssl
                .selected_alpn_protocol()
                .map(|p| String::from_utf8_lossy(p).to_string()),
        }
    }

    /// Whether the server selected `h2`
    pub fn negotiated_h2(&self) -> bool {
        self.alpn.as_deref() == Some(ALPN_H2)
    }
}

impl fmt::Display for TlsVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} alpn={}",
            self.version,
            self.cipher,
            self.alpn.as_deref().unwrap_or("<none>")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(alpn: Option<&str>) -> TlsVars {
        TlsVars {
            version: "TLSv1.3".to_string(),
            cipher: "TLS_AES_128_GCM_SHA256".to_string(),
            alpn: alpn.map(str::to_string),
        }
    }

    #[test]
    fn test_negotiated_h2() {
        assert!(vars(Some("h2")).negotiated_h2());
        assert!(!vars(Some("http/1.1")).negotiated_h2());
        assert!(!vars(None).negotiated_h2());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            vars(None).to_string(),
            "TLSv1.3 TLS_AES_128_GCM_SHA256 alpn=<none>"
        );
    }
}
