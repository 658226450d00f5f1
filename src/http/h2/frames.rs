//! Frame types, flags and the typed frames the prober sends or reads
//!
//! Frame types we never act on still decode by type so they can be skipped.

use super::error::{Error, ErrorCode, Result};
use super::settings::Settings;
use bytes::Bytes;
use std::fmt;

/// Frame type octet (RFC 7540 Section 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Data,
    /// 0x1, opens a stream
    Headers,
    Priority,
    /// 0x3, the frame a rapid reset floods with
    RstStream,
    Settings,
    PushPromise,
    /// 0x6, used after a reset to check the connection is still alive
    Ping,
    /// 0x7
    Goaway,
    WindowUpdate,
    Continuation,
    /// Extension frame types; RFC 7540 Section 4.1 requires ignoring them
    Unknown(u8),
}

impl FrameType {
    pub fn as_u8(self) -> u8 {
        match self {
            FrameType::Data => 0x0,
            FrameType::Headers => 0x1,
            FrameType::Priority => 0x2,
            FrameType::RstStream => 0x3,
            FrameType::Settings => 0x4,
            FrameType::PushPromise => 0x5,
            FrameType::Ping => 0x6,
            FrameType::Goaway => 0x7,
            FrameType::WindowUpdate => 0x8,
            FrameType::Continuation => 0x9,
            FrameType::Unknown(byte) => byte,
        }
    }

    pub fn from_u8(byte: u8) -> Self {
        match byte {
            0x0 => FrameType::Data,
            0x1 => FrameType::Headers,
            0x2 => FrameType::Priority,
            0x3 => FrameType::RstStream,
            0x4 => FrameType::Settings,
            0x5 => FrameType::PushPromise,
            0x6 => FrameType::Ping,
            0x7 => FrameType::Goaway,
            0x8 => FrameType::WindowUpdate,
            0x9 => FrameType::Continuation,
            other => FrameType::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FrameType::Data => "DATA",
            FrameType::Headers => "HEADERS",
            FrameType::Priority => "PRIORITY",
            FrameType::RstStream => "RST_STREAM",
            FrameType::Settings => "SETTINGS",
            FrameType::PushPromise => "PUSH_PROMISE",
            FrameType::Ping => "PING",
            FrameType::Goaway => "GOAWAY",
            FrameType::WindowUpdate => "WINDOW_UPDATE",
            FrameType::Continuation => "CONTINUATION",
            FrameType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u8())
    }
}

/// Flag octet of a frame header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    pub fn empty() -> Self {
        FrameFlags(0)
    }

    pub fn from_u8(flags: u8) -> Self {
        FrameFlags(flags)
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn is_set(&self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }


    /// END_STREAM flag (0x1)
    pub const END_STREAM: u8 = 0x1;

    /// ACK flag (0x1) - used for SETTINGS and PING
    pub const ACK: u8 = 0x1;

    /// END_HEADERS flag (0x4)
    pub const END_HEADERS: u8 = 0x4;

    /// PADDED flag (0x8)
    pub const PADDED: u8 = 0x8;

    /// PRIORITY flag (0x20)
    pub const PRIORITY: u8 = 0x20;

    pub fn is_end_stream(&self) -> bool {
        self.is_set(Self::END_STREAM)
    }

    pub fn is_ack(&self) -> bool {
        self.is_set(Self::ACK)
    }

    /// Check if END_HEADERS is set
    pub fn is_end_headers(&self) -> bool {
        self.is_set(Self::END_HEADERS)
    }

    /// Check if PADDED is set
    pub fn is_padded(&self) -> bool {
        self.is_set(Self::PADDED)
    }

    /// Check if PRIORITY is set
    pub fn is_priority(&self) -> bool {
        self.is_set(Self::PRIORITY)
    }
}

/// Generic HTTP/2 frame as read off the wire
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame type
    pub frame_type: FrameType,
    /// Frame flags
    pub flags: FrameFlags,
    /// Stream ID
    pub stream_id: u32,
    /// Frame payload
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame
    pub fn new(frame_type: FrameType, flags: FrameFlags, stream_id: u32, payload: Bytes) -> Self {
        Frame {
            frame_type,
            flags,
            stream_id,
            payload,
        }
    }

    /// Get payload size
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stream={} flags=0x{:02x} len={}",
            self.frame_type.name(),
            self.stream_id,
            self.flags.as_u8(),
            self.payload.len()
        )
    }
}

/// HEADERS frame (RFC 7540 Section 6.2)
#[derive(Debug, Clone)]
pub struct HeadersFrame {
    /// Stream ID
    pub stream_id: u32,
    /// Header block fragment
    pub header_block: Bytes,
    /// END_STREAM flag
    pub end_stream: bool,
    /// END_HEADERS flag
    pub end_headers: bool,
}

impl HeadersFrame {
    /// Create a new HEADERS frame
    pub fn new(stream_id: u32, header_block: Bytes, end_stream: bool, end_headers: bool) -> Self {
        HeadersFrame {
            stream_id,
            header_block,
            end_stream,
            end_headers,
        }
    }

    /// Extract the header block fragment from a received HEADERS frame
    ///
    /// Padding and the priority block are stripped.
    pub fn decode(frame: &Frame) -> Result<Self> {
        let mut payload = frame.payload.clone();

        let pad_len = if frame.flags.is_padded() {
            if payload.is_empty() {
                return Err(Error::FrameSize("HEADERS missing pad length".to_string()));
            }
            let pad = payload[0] as usize;
            payload = payload.slice(1..);
            pad
        } else {
            0
        };

        if frame.flags.is_priority() {
            if payload.len() < 5 {
                return Err(Error::FrameSize("HEADERS priority block truncated".to_string()));
            }
            payload = payload.slice(5..);
        }

        if pad_len > payload.len() {
            return Err(Error::Protocol("HEADERS padding exceeds payload".to_string()));
        }
        let header_block = payload.slice(..payload.len() - pad_len);

        Ok(HeadersFrame {
            stream_id: frame.stream_id,
            header_block,
            end_stream: frame.flags.is_end_stream(),
            end_headers: frame.flags.is_end_headers(),
        })
    }
}

/// RST_STREAM frame (RFC 7540 Section 6.4)
#[derive(Debug, Clone, Copy)]
pub struct RstStreamFrame {
    /// Stream ID
    pub stream_id: u32,
    /// Error code
    pub error_code: ErrorCode,
}

impl RstStreamFrame {
    /// Create a new RST_STREAM frame
    pub fn new(stream_id: u32, error_code: ErrorCode) -> Self {
        RstStreamFrame {
            stream_id,
            error_code,
        }
    }

    /// Read the raw error code of a received RST_STREAM frame
    pub fn decode_code(frame: &Frame) -> Result<u32> {
        read_u32(&frame.payload, 0)
            .filter(|_| frame.payload.len() == 4)
            .ok_or_else(|| Error::FrameSize("RST_STREAM must be 4 bytes".to_string()))
    }
}

/// SETTINGS frame (RFC 7540 Section 6.5)
#[derive(Debug, Clone)]
pub struct SettingsFrame {
    /// ACK flag
    pub ack: bool,
    /// Settings parameters
    pub settings: Settings,
}

impl SettingsFrame {
    /// Create a new SETTINGS frame
    pub fn new(settings: Settings) -> Self {
        SettingsFrame {
            ack: false,
            settings,
        }
    }

    /// Create a SETTINGS ACK frame
    pub fn ack() -> Self {
        SettingsFrame {
            ack: true,
            settings: Settings::default(),
        }
    }
}

/// PING frame (RFC 7540 Section 6.7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingFrame {
    /// ACK flag
    pub ack: bool,
    /// Opaque data (8 bytes)
    pub data: [u8; 8],
}

impl PingFrame {
    /// Create a new PING frame
    pub fn new(data: [u8; 8]) -> Self {
        PingFrame { ack: false, data }
    }

    /// Create a PING ACK frame
    pub fn ack(data: [u8; 8]) -> Self {
        PingFrame { ack: true, data }
    }

    /// Decode a received PING frame
    pub fn decode(frame: &Frame) -> Result<Self> {
        let data: [u8; 8] = frame
            .payload
            .as_ref()
            .try_into()
            .map_err(|_| Error::FrameSize("PING must be 8 bytes".to_string()))?;

        Ok(PingFrame {
            ack: frame.flags.is_ack(),
            data,
        })
    }
}

/// GOAWAY frame (RFC 7540 Section 6.8)
#[derive(Debug, Clone)]
pub struct GoawayFrame {
    /// Last stream ID
    pub last_stream_id: u32,
    /// Error code, kept raw so unknown codes survive
    pub error_code: u32,
    /// Debug data
    pub debug_data: Bytes,
}

impl GoawayFrame {
    /// Create a new GOAWAY frame
    pub fn new(last_stream_id: u32, error_code: ErrorCode, debug_data: Bytes) -> Self {
        GoawayFrame {
            last_stream_id,
            error_code: error_code.as_u32(),
            debug_data,
        }
    }

    /// Decode a received GOAWAY frame
    pub fn decode(frame: &Frame) -> Result<Self> {
        let payload = &frame.payload;
        match (read_u32(payload, 0), read_u32(payload, 4)) {
            (Some(last), Some(code)) => Ok(GoawayFrame {
                last_stream_id: last & 0x7FFF_FFFF,
                error_code: code,
                debug_data: payload.slice(8..),
            }),
            _ => Err(Error::FrameSize("GOAWAY shorter than 8 bytes".to_string())),
        }
    }

    /// Known error code, if any
    pub fn code(&self) -> Option<ErrorCode> {
        ErrorCode::from_u32(self.error_code)
    }

    /// Turn the frame into the connection-level error it signals
    pub fn into_error(self) -> Error {
        Error::GoAway {
            last_stream_id: self.last_stream_id,
            code: self.error_code,
            debug: String::from_utf8_lossy(&self.debug_data).into_owned(),
        }
    }
}

fn read_u32(buf: &[u8], at: usize) -> Option<u32> {
    buf.get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(frame_type: FrameType, flags: u8, stream_id: u32, payload: &'static [u8]) -> Frame {
        Frame::new(frame_type, FrameFlags::from_u8(flags), stream_id, Bytes::from_static(payload))
    }

    #[test]
    fn test_frame_type_conversion() {
        assert_eq!(FrameType::Data.as_u8(), 0x0);
        assert_eq!(FrameType::Headers.as_u8(), 0x1);
        assert_eq!(FrameType::Continuation.as_u8(), 0x9);

        assert_eq!(FrameType::from_u8(0x3), FrameType::RstStream);
        assert_eq!(FrameType::from_u8(0x9), FrameType::Continuation);
        assert_eq!(FrameType::from_u8(0xff), FrameType::Unknown(0xff));
        assert_eq!(FrameType::Unknown(0xff).as_u8(), 0xff);
    }

    #[test]
    fn test_frame_flags() {
        let mut flags = FrameFlags::empty();
        assert!(!flags.is_end_stream());

        flags.set(FrameFlags::END_STREAM);
        assert!(flags.is_end_stream());
        assert!(!flags.is_end_headers());

        flags.set(FrameFlags::END_HEADERS);
        assert!(flags.is_end_stream());
        assert!(flags.is_end_headers());
    }

    #[test]
    fn test_headers_decode_strips_padding_and_priority() {
        // pad length 2, priority block (5 bytes), block "ab", 2 bytes padding
        let f = frame(
            FrameType::Headers,
            FrameFlags::PADDED | FrameFlags::PRIORITY | FrameFlags::END_HEADERS,
            1,
            b"\x02\x00\x00\x00\x00\x10ab\x00\x00",
        );
        let headers = HeadersFrame::decode(&f).unwrap();
        assert_eq!(&headers.header_block[..], b"ab");
        assert!(headers.end_headers);
        assert!(!headers.end_stream);
    }

    #[test]
    fn test_headers_decode_bad_padding() {
        let f = frame(FrameType::Headers, FrameFlags::PADDED, 1, b"\x09ab");
        assert!(matches!(HeadersFrame::decode(&f), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_goaway_decode() {
        let f = frame(
            FrameType::Goaway,
            0,
            0,
            b"\x00\x00\x00\x01\x00\x00\x00\x0bcalm down",
        );
        let goaway = GoawayFrame::decode(&f).unwrap();
        assert_eq!(goaway.last_stream_id, 1);
        assert_eq!(goaway.code(), Some(ErrorCode::EnhanceYourCalm));
        assert_eq!(&goaway.debug_data[..], b"calm down");

        let short = frame(FrameType::Goaway, 0, 0, b"\x00\x00");
        assert!(GoawayFrame::decode(&short).is_err());
    }

    #[test]
    fn test_ping_decode() {
        let f = frame(FrameType::Ping, FrameFlags::ACK, 0, b"rrscan01");
        let ping = PingFrame::decode(&f).unwrap();
        assert!(ping.ack);
        assert_eq!(&ping.data, b"rrscan01");

        let short = frame(FrameType::Ping, 0, 0, b"1234");
        assert!(matches!(PingFrame::decode(&short), Err(Error::FrameSize(_))));
    }

    #[test]
    fn test_rst_stream_decode() {
        let f = frame(FrameType::RstStream, 0, 3, b"\x00\x00\x00\x08");
        assert_eq!(RstStreamFrame::decode_code(&f).unwrap(), 0x8);

        let long = frame(FrameType::RstStream, 0, 3, b"\x00\x00\x00\x08\x00");
        assert!(RstStreamFrame::decode_code(&long).is_err());
    }
}
