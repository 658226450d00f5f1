//! HTTP/2 frame encoding and decoding
//!
//! Frames are assembled by hand so the prober controls exactly what goes on
//! the wire: one HEADERS, one RST_STREAM, one PING, nothing implicit.

use super::error::{Error, Result};
use super::frames::*;
use crate::http::{HttpSession, SessionOps};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::{self, Read};

/// HTTP/2 frame header size (9 bytes)
pub const FRAME_HEADER_SIZE: usize = 9;

/// Maximum frame payload size (16MB - 1)
pub const MAX_FRAME_SIZE: usize = 0x00FFFFFF;

/// Frame codec for encoding/decoding HTTP/2 frames
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a frame header into a buffer
    pub fn encode_header(frame_type: FrameType, flags: FrameFlags, stream_id: u32, length: usize) -> [u8; FRAME_HEADER_SIZE] {
        let mut header = [0u8; FRAME_HEADER_SIZE];

        // Length (24 bits, big-endian)
        header[0] = ((length >> 16) & 0xFF) as u8;
        header[1] = ((length >> 8) & 0xFF) as u8;
        header[2] = (length & 0xFF) as u8;

        header[3] = frame_type.as_u8();
        header[4] = flags.as_u8();

        // Stream ID (31 bits, big-endian, reserved bit is 0)
        let stream_id = stream_id & 0x7FFFFFFF;
        header[5..9].copy_from_slice(&stream_id.to_be_bytes());

        header
    }

    /// Decode a frame header from bytes
    pub fn decode_header(bytes: &[u8; FRAME_HEADER_SIZE]) -> (FrameType, FrameFlags, u32, usize) {
        let length = ((bytes[0] as usize) << 16)
            | ((bytes[1] as usize) << 8)
            | (bytes[2] as usize);

        let frame_type = FrameType::from_u8(bytes[3]);
        let flags = FrameFlags::from_u8(bytes[4]);

        // Stream ID (31 bits, ignore reserved bit)
        let stream_id = u32::from_be_bytes([bytes[5] & 0x7F, bytes[6], bytes[7], bytes[8]]);

        (frame_type, flags, stream_id, length)
    }

    /// Encode a HEADERS frame
    pub fn encode_headers_frame(frame: &HeadersFrame) -> Bytes {
        let mut flags = FrameFlags::empty();
        if frame.end_stream {
            flags.set(FrameFlags::END_STREAM);
        }
        if frame.end_headers {
            flags.set(FrameFlags::END_HEADERS);
        }

        Self::encode_frame(FrameType::Headers, flags, frame.stream_id, &frame.header_block)
    }

    /// Encode a SETTINGS frame
    pub fn encode_settings_frame(frame: &SettingsFrame) -> Bytes {
        if frame.ack {
            return Self::encode_frame(FrameType::Settings, FrameFlags::from_u8(FrameFlags::ACK), 0, &[]);
        }

        // Stream ID must be 0 for SETTINGS
        let payload = frame.settings.encode_payload();
        Self::encode_frame(FrameType::Settings, FrameFlags::empty(), 0, &payload)
    }

    /// Encode a PING frame
    pub fn encode_ping_frame(frame: &PingFrame) -> Bytes {
        let flags = if frame.ack {
            FrameFlags::from_u8(FrameFlags::ACK)
        } else {
            FrameFlags::empty()
        };

        Self::encode_frame(FrameType::Ping, flags, 0, &frame.data)
    }

    /// Encode a GOAWAY frame
    pub fn encode_goaway_frame(frame: &GoawayFrame) -> Bytes {
        let mut payload = BytesMut::with_capacity(8 + frame.debug_data.len());
        payload.put_u32(frame.last_stream_id & 0x7FFFFFFF);
        payload.put_u32(frame.error_code);
        payload.put_slice(&frame.debug_data);

        Self::encode_frame(FrameType::Goaway, FrameFlags::empty(), 0, &payload)
    }

    /// Encode a RST_STREAM frame
    pub fn encode_rst_stream_frame(frame: &RstStreamFrame) -> Bytes {
        let code = frame.error_code.as_u32().to_be_bytes();
        Self::encode_frame(FrameType::RstStream, FrameFlags::empty(), frame.stream_id, &code)
    }

    /// Encode an arbitrary frame from its parts
    pub fn encode_frame(frame_type: FrameType, flags: FrameFlags, stream_id: u32, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
        buf.put_slice(&Self::encode_header(frame_type, flags, stream_id, payload.len()));
        buf.put_slice(payload);
        buf.freeze()
    }

    /// Read a frame from any reader
    pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Frame> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let (frame_type, flags, stream_id, payload_len) = Self::decode_header(&header);

        if payload_len > MAX_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Frame payload too large: {}", payload_len),
            ));
        }

        let mut payload = vec![0u8; payload_len];
        reader.read_exact(&mut payload)?;

        Ok(Frame::new(frame_type, flags, stream_id, Bytes::from(payload)))
    }

    /// Read a frame from an HttpSession, honouring its timeout
    ///
    /// `max_payload` is the largest payload we advertised we would accept.
    pub fn read_frame_from_session<S: SessionOps>(
        session: &mut HttpSession<S>,
        max_payload: usize,
    ) -> Result<Frame> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        session.read_exact(&mut header)?;

        let (frame_type, flags, stream_id, payload_len) = Self::decode_header(&header);

        if payload_len > max_payload {
            return Err(Error::FrameSize(format!(
                "{} frame of {} bytes exceeds limit {}",
                frame_type.name(),
                payload_len,
                max_payload
            )));
        }

        let mut payload = vec![0u8; payload_len];
        session.read_exact(&mut payload)?;

        Ok(Frame::new(frame_type, flags, stream_id, Bytes::from(payload)))
    }
}
