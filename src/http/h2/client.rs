//! HTTP/2 client implementation with low-level frame control
//!
//! The client writes exactly the frames it is asked to write and nothing
//! else, apart from the acknowledgements the protocol requires (SETTINGS ACK,
//! PING ACK). Connection-level frames that arrive while it waits for
//! something are processed in place; a GOAWAY ends the wait with an error
//! carrying the server's code and debug data.

use super::codec::FrameCodec;
use super::error::{Error, ErrorCode, Result};
use super::frames::*;
use super::settings::Settings;
use super::stream::{StreamId, StreamManager};
use super::{CONNECTION_PREFACE, CONNECTION_STREAM_ID};
use crate::http::{HttpSession, SessionOps, USER_AGENT};
use bytes::{Bytes, BytesMut};
use hpack::Encoder as HpackEncoder;
use std::time::{Duration, Instant};

/// HTTP/2 client
///
/// Provides low-level control over HTTP/2 frame transmission.
pub struct H2Client<S: SessionOps> {
    session: HttpSession<S>,
    stream_manager: StreamManager,
    hpack_encoder: HpackEncoder<'static>,
    hpack_decoder: hpack::Decoder<'static>,
    local_settings: Settings,
    remote_settings: Settings,
    authority: String,
    scheme: &'static str,
    connected: bool,
}

impl<S: SessionOps> H2Client<S> {
    /// Perform HTTP/2 connection preface and settings exchange
    ///
    /// Returns once the server's own SETTINGS frame (its half of the
    /// preface) has been received and acknowledged.
    pub fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }

        // Send connection preface (RFC 7540 Section 3.5)
        let settings = FrameCodec::encode_settings_frame(&SettingsFrame::new(self.local_settings.clone()));
        let mut preface = BytesMut::with_capacity(CONNECTION_PREFACE.len() + settings.len());
        preface.extend_from_slice(CONNECTION_PREFACE);
        preface.extend_from_slice(&settings);
        self.session.write_all(&preface)?;
        log::debug!("-> preface + SETTINGS");

        let frame = self.recv_frame()?;
        if frame.frame_type != FrameType::Settings || frame.flags.is_ack() {
            return Err(match frame.frame_type {
                FrameType::Goaway => GoawayFrame::decode(&frame)?.into_error(),
                _ => Error::Protocol(format!(
                    "expected SETTINGS as server preface, got {}",
                    frame.frame_type.name()
                )),
            });
        }
        self.handle_connection_frame(frame)?;

        self.connected = true;
        Ok(())
    }

    /// Open a new stream with a request HEADERS frame
    ///
    /// Pseudo-headers go out in the order `:method`, `:scheme`, `:authority`,
    /// `:path`, followed by `user-agent`.
    pub fn send_request_headers(&mut self, method: &str, path: &str, end_stream: bool) -> Result<StreamId> {
        self.connect()?;

        let stream_id = self.stream_manager.create_stream()?;

        let headers: [(&[u8], &[u8]); 5] = [
            (&b":method"[..], method.as_bytes()),
            (&b":scheme"[..], self.scheme.as_bytes()),
            (&b":authority"[..], self.authority.as_bytes()),
            (&b":path"[..], path.as_bytes()),
            (&b"user-agent"[..], USER_AGENT.as_bytes()),
        ];
        let header_block = self.hpack_encoder.encode(headers);

        let max_frame = self.remote_settings.get_max_frame_size() as usize;
        if header_block.len() > max_frame {
            return Err(Error::FrameSize(format!(
                "header block of {} bytes exceeds peer limit {}",
                header_block.len(),
                max_frame
            )));
        }

        if let Some(stream) = self.stream_manager.get_stream_mut(stream_id) {
            stream.send_headers(end_stream)?;
        }

        let frame = HeadersFrame::new(stream_id, Bytes::from(header_block), end_stream, true);
        self.session.write_all(&FrameCodec::encode_headers_frame(&frame))?;
        log::debug!("-> HEADERS stream={} {} {}", stream_id, method, path);

        Ok(stream_id)
    }

    /// Wait for the final (non-informational) response HEADERS on a stream
    pub fn recv_response_headers(&mut self, stream_id: StreamId) -> Result<H2Response> {
        loop {
            let frame = self.recv_frame()?;

            match frame.frame_type {
                FrameType::Headers if frame.stream_id == stream_id => {
                    let (end_stream, decoded) = self.read_header_block(frame)?;
                    let response = H2Response::from_decoded(stream_id, decoded, end_stream)?;

                    if response.is_informational() {
                        log::debug!("<- {} informational on stream {}", response.status, stream_id);
                        continue;
                    }

                    if let Some(stream) = self.stream_manager.get_stream_mut(stream_id) {
                        stream.receive_headers(end_stream)?;
                    }
                    return Ok(response);
                }
                FrameType::RstStream if frame.stream_id == stream_id => {
                    let code = RstStreamFrame::decode_code(&frame)?;
                    if let Some(stream) = self.stream_manager.get_stream_mut(stream_id) {
                        stream.close();
                    }
                    return Err(Error::StreamReset { stream_id, code });
                }
                _ => self.handle_connection_frame(frame)?,
            }
        }
    }

    /// Cancel a stream with RST_STREAM
    ///
    /// Refused locally (nothing is written) for unknown, idle or already
    /// closed streams.
    pub fn send_rst_stream(&mut self, stream_id: StreamId, error_code: ErrorCode) -> Result<()> {
        self.stream_manager
            .get_stream_mut(stream_id)
            .ok_or(Error::InvalidStreamId(stream_id))?
            .send_reset()?;

        let frame = RstStreamFrame::new(stream_id, error_code);
        self.session.write_all(&FrameCodec::encode_rst_stream_frame(&frame))?;
        log::debug!("-> RST_STREAM stream={} {}", stream_id, error_code);
        Ok(())
    }

    /// Send a PING and wait for its acknowledgement
    ///
    /// Every frame received in between is processed; a GOAWAY or a closed
    /// connection ends the wait with an error.
    pub fn ping(&mut self, data: [u8; 8]) -> Result<()> {
        self.connect()?;

        self.session.write_all(&FrameCodec::encode_ping_frame(&PingFrame::new(data)))?;
        log::debug!("-> PING");

        loop {
            let frame = self.recv_frame()?;
            if frame.frame_type == FrameType::Ping && frame.flags.is_ack() {
                if PingFrame::decode(&frame)?.data == data {
                    return Ok(());
                }
                log::debug!("ignoring PING ACK with foreign payload");
                continue;
            }
            self.handle_connection_frame(frame)?;
        }
    }

    /// Send GOAWAY(NO_ERROR) and close the connection
    ///
    /// The GOAWAY is best effort: the peer may already be gone.
    pub fn close(&mut self) -> Result<()> {
        if self.connected {
            // no server-initiated streams are ever accepted
            let goaway = GoawayFrame::new(0, ErrorCode::NoError, Bytes::new());
            if let Err(e) = self.session.write_all(&FrameCodec::encode_goaway_frame(&goaway)) {
                log::trace!("GOAWAY on close not sent: {}", e);
            }
            self.connected = false;
        }
        self.session.close()?;
        Ok(())
    }

    /// Receive a frame
    pub fn recv_frame(&mut self) -> Result<Frame> {
        let max_payload = self.local_settings.get_max_frame_size() as usize;
        let frame = FrameCodec::read_frame_from_session(&mut self.session, max_payload)?;
        log::debug!("<- {}", frame);
        Ok(frame)
    }

    /// Process a frame that is not the one being waited for
    fn handle_connection_frame(&mut self, frame: Frame) -> Result<()> {
        match frame.frame_type {
            FrameType::Settings => {
                if frame.stream_id != CONNECTION_STREAM_ID {
                    return Err(Error::Protocol("SETTINGS frame must have stream ID 0".to_string()));
                }
                if frame.flags.is_ack() {
                    return Ok(());
                }

                let settings = Settings::decode(&frame.payload)?;
                self.remote_settings.merge(&settings);
                self.stream_manager
                    .set_max_concurrent_streams(self.remote_settings.get_max_concurrent_streams());

                self.session.write_all(&FrameCodec::encode_settings_frame(&SettingsFrame::ack()))?;
                log::debug!("-> SETTINGS ACK");
            }
            FrameType::Ping => {
                let ping = PingFrame::decode(&frame)?;
                if !ping.ack {
                    self.session.write_all(&FrameCodec::encode_ping_frame(&PingFrame::ack(ping.data)))?;
                    log::debug!("-> PING ACK");
                }
            }
            FrameType::Goaway => {
                return Err(GoawayFrame::decode(&frame)?.into_error());
            }
            FrameType::Headers => {
                // The HPACK context is shared, so every block must be decoded
                let stream_id = frame.stream_id;
                let (end_stream, _) = self.read_header_block(frame)?;
                if let Some(stream) = self.stream_manager.get_stream_mut(stream_id) {
                    if !stream.reset_locally() {
                        stream.receive_headers(end_stream)?;
                    }
                }
            }
            FrameType::Data => {
                if frame.flags.is_end_stream() {
                    if let Some(stream) = self.stream_manager.get_stream_mut(frame.stream_id) {
                        stream.remote_end();
                    }
                }
            }
            FrameType::RstStream => {
                if let Some(stream) = self.stream_manager.get_stream_mut(frame.stream_id) {
                    stream.close();
                }
            }
            FrameType::Continuation => {
                return Err(Error::Protocol(format!(
                    "unexpected CONTINUATION on stream {}",
                    frame.stream_id
                )));
            }
            FrameType::PushPromise => {
                return Err(Error::Protocol("PUSH_PROMISE received with push disabled".to_string()));
            }
            FrameType::WindowUpdate | FrameType::Priority | FrameType::Unknown(_) => {}
        }

        Ok(())
    }

    /// Collect a HEADERS frame and its CONTINUATIONs, then HPACK-decode
    fn read_header_block(&mut self, first: Frame) -> Result<(bool, Vec<(Vec<u8>, Vec<u8>)>)> {
        let headers = HeadersFrame::decode(&first)?;
        let mut block = BytesMut::from(&headers.header_block[..]);
        let mut end_headers = headers.end_headers;

        while !end_headers {
            let next = self.recv_frame()?;
            if next.frame_type != FrameType::Continuation || next.stream_id != headers.stream_id {
                return Err(Error::Protocol(format!(
                    "expected CONTINUATION on stream {}, got {}",
                    headers.stream_id, next
                )));
            }
            block.extend_from_slice(&next.payload);
            end_headers = next.flags.is_end_headers();
        }

        let decoded = self
            .hpack_decoder
            .decode(&block)
            .map_err(|e| Error::Compression(format!("HPACK decode error: {:?}", e)))?;

        Ok((headers.end_stream, decoded))
    }
}

/// HTTP/2 response head
#[derive(Debug, Clone)]
pub struct H2Response {
    /// Stream ID
    pub stream_id: StreamId,
    /// Status code
    pub status: u16,
    /// Regular (non-pseudo) headers, in received order
    pub headers: Vec<(String, String)>,
    /// The HEADERS frame ended the stream
    pub end_stream: bool,
}

impl H2Response {
    fn from_decoded(stream_id: StreamId, decoded: Vec<(Vec<u8>, Vec<u8>)>, end_stream: bool) -> Result<Self> {
        let mut status = None;
        let mut headers = Vec::with_capacity(decoded.len());

        for (name, value) in decoded {
            let name = String::from_utf8_lossy(&name).into_owned();
            let value = String::from_utf8_lossy(&value).into_owned();

            if name == ":status" {
                status = Some(value.parse::<u16>().map_err(|_| {
                    Error::Protocol(format!("invalid :status {:?}", value))
                })?);
            } else {
                headers.push((name, value));
            }
        }

        let status = status.ok_or_else(|| {
            Error::Protocol(format!("response on stream {} lacks :status", stream_id))
        })?;

        Ok(H2Response {
            stream_id,
            status,
            headers,
            end_stream,
        })
    }

    /// Get status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether this is a 1xx response
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status)
    }
}

/// HTTP/2 client builder
pub struct H2ClientBuilder {
    settings: Settings,
    authority: String,
    scheme: &'static str,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl H2ClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        H2ClientBuilder {
            settings: Settings {
                header_table_size: Some(super::DEFAULT_HEADER_TABLE_SIZE),
                enable_push: Some(false),
                initial_window_size: Some(super::DEFAULT_INITIAL_WINDOW_SIZE),
                max_frame_size: Some(super::DEFAULT_MAX_FRAME_SIZE),
                ..Settings::default()
            },
            authority: "localhost".to_string(),
            scheme: "https",
            timeout: None,
            deadline: None,
        }
    }

    /// Set the `:authority` sent with requests
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Set the `:scheme` sent with requests
    pub fn scheme(mut self, scheme: &'static str) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the per-operation I/O timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Give up on any wait still pending at `deadline`
    ///
    /// Frames that keep arriving do not extend it: a peer trickling PINGs
    /// while never answering still fails with `Timeout`.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Settings that will be advertised
    pub fn local_settings(&self) -> &Settings {
        &self.settings
    }

    /// Build a client over a fresh transport
    pub fn build<S: SessionOps>(self, session: S) -> Result<H2Client<S>> {
        self.build_with_session(HttpSession::new(session), StreamManager::new())
    }

    /// Build a client that takes over an upgraded HTTP/1.1 connection
    ///
    /// Bytes already buffered in `session` are read before the socket.
    pub fn build_upgraded<S: SessionOps>(self, session: HttpSession<S>) -> Result<H2Client<S>> {
        self.build_with_session(session, StreamManager::after_upgrade())
    }

    fn build_with_session<S: SessionOps>(
        self,
        mut session: HttpSession<S>,
        stream_manager: StreamManager,
    ) -> Result<H2Client<S>> {
        self.settings.validate()?;
        if let Some(timeout) = self.timeout {
            session.set_timeout(Some(timeout));
        }
        if self.deadline.is_some() {
            session.set_deadline(self.deadline);
        }

        Ok(H2Client {
            session,
            stream_manager,
            hpack_encoder: HpackEncoder::new(),
            hpack_decoder: hpack::Decoder::new(),
            local_settings: self.settings,
            remote_settings: Settings::default(),
            authority: self.authority,
            scheme: self.scheme,
            connected: false,
        })
    }
}

impl Default for H2ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::session::FdSessionOps;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    fn read_preface(stream: &mut TcpStream) {
        let mut preface = [0u8; 24];
        stream.read_exact(&mut preface).unwrap();
        assert_eq!(&preface[..], CONNECTION_PREFACE);
        let settings = FrameCodec::read_frame(stream).unwrap();
        assert_eq!(settings.frame_type, FrameType::Settings);
    }

    fn client_for(addr: std::net::SocketAddr) -> H2Client<FdSessionOps> {
        let stream = TcpStream::connect(addr).unwrap();
        H2ClientBuilder::new()
            .authority("127.0.0.1")
            .scheme("http")
            .timeout(Duration::from_secs(2))
            .build(FdSessionOps::new(stream))
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let builder = H2ClientBuilder::new();
        assert_eq!(builder.local_settings().enable_push, Some(false));
        assert_eq!(builder.local_settings().max_frame_size, Some(16384));
    }

    #[test]
    fn test_response_from_decoded() {
        let decoded = vec![
            (b":status".to_vec(), b"200".to_vec()),
            (b"server".to_vec(), b"mock".to_vec()),
        ];
        let response = H2Response::from_decoded(1, decoded, true).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers, vec![("server".to_string(), "mock".to_string())]);
        assert!(!response.is_informational());

        assert!(H2Response::from_decoded(1, vec![], false).is_err());
    }

    #[test]
    fn test_request_and_ping() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_preface(&mut stream);
            stream
                .write_all(&FrameCodec::encode_settings_frame(&SettingsFrame::new(Settings::new())))
                .unwrap();

            let mut decoder = hpack::Decoder::new();
            let mut encoder = hpack::Encoder::new();
            loop {
                let frame = FrameCodec::read_frame(&mut stream).unwrap();
                match frame.frame_type {
                    FrameType::Headers => {
                        let fields = decoder.decode(&frame.payload).unwrap();
                        let names: Vec<_> = fields.iter().map(|(n, _)| n.clone()).collect();
                        assert_eq!(
                            names,
                            vec![
                                b":method".to_vec(),
                                b":scheme".to_vec(),
                                b":authority".to_vec(),
                                b":path".to_vec(),
                                b"user-agent".to_vec()
                            ]
                        );
                        let block = encoder.encode(vec![(&b":status"[..], &b"200"[..])]);
                        let headers = HeadersFrame::new(frame.stream_id, Bytes::from(block), true, true);
                        stream.write_all(&FrameCodec::encode_headers_frame(&headers)).unwrap();
                    }
                    FrameType::Ping => {
                        let ping = PingFrame::decode(&frame).unwrap();
                        stream
                            .write_all(&FrameCodec::encode_ping_frame(&PingFrame::ack(ping.data)))
                            .unwrap();
                    }
                    FrameType::Goaway => break,
                    _ => {}
                }
            }
        });

        let mut client = client_for(addr);
        let stream_id = client.send_request_headers("GET", "/", true).unwrap();
        assert_eq!(stream_id, 1);

        let response = client.recv_response_headers(stream_id).unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.end_stream);

        client.ping(*b"pingpong").unwrap();
        client.close().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_goaway_surfaces_as_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_preface(&mut stream);
            stream
                .write_all(&FrameCodec::encode_settings_frame(&SettingsFrame::new(Settings::new())))
                .unwrap();
            let goaway = GoawayFrame::new(0, ErrorCode::EnhanceYourCalm, Bytes::from_static(b"calm"));
            stream.write_all(&FrameCodec::encode_goaway_frame(&goaway)).unwrap();
            // keep the socket open until the client has read the GOAWAY
            let mut sink = [0u8; 64];
            while stream.read(&mut sink).map(|n| n > 0).unwrap_or(false) {}
        });

        let mut client = client_for(addr);
        client.connect().unwrap();
        match client.ping(*b"12345678") {
            Err(Error::GoAway { code, debug, .. }) => {
                assert_eq!(code, ErrorCode::EnhanceYourCalm.as_u32());
                assert_eq!(debug, "calm");
            }
            other => panic!("expected GOAWAY, got {:?}", other),
        }
        client.close().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_busy_peer_cannot_outlast_the_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let _handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_preface(&mut stream);
            stream
                .write_all(&FrameCodec::encode_settings_frame(&SettingsFrame::new(Settings::new())))
                .unwrap();
            for _ in 0..100 {
                let ping = FrameCodec::encode_ping_frame(&PingFrame::new(*b"keepbusy"));
                if stream.write_all(&ping).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(50));
            }
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut client = H2ClientBuilder::new()
            .scheme("http")
            .timeout(Duration::from_secs(1))
            .deadline(Instant::now() + Duration::from_millis(400))
            .build(FdSessionOps::new(stream))
            .unwrap();

        let started = Instant::now();
        let stream_id = client.send_request_headers("GET", "/", true).unwrap();
        let err = client.recv_response_headers(stream_id).unwrap_err();
        assert!(matches!(err, Error::Timeout), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_reset_of_unknown_stream_is_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _handle = thread::spawn(move || listener.accept().map(|(s, _)| s));

        let mut client = client_for(addr);
        assert!(matches!(
            client.send_rst_stream(7, ErrorCode::Cancel),
            Err(Error::InvalidStreamId(7))
        ));
    }
}
