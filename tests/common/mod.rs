//! Loopback servers for the probe integration tests
//!
//! Every server binds `127.0.0.1:0`, serves each accepted connection on its
//! own thread and lives until the test process exits.

#![allow(dead_code)]

use bytes::Bytes;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::ssl::{select_next_proto, AlpnError, SslAcceptor, SslMethod, SslStream};
use openssl::x509::{X509Builder, X509NameBuilder};
use rrscan::http::h2::{
    ErrorCode, FrameCodec, FrameType, GoawayFrame, HeadersFrame, PingFrame, SettingsFrame, CONNECTION_PREFACE,
};
use rrscan::http::h2::Settings;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How an HTTP/2 server reacts to a client's RST_STREAM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetBehavior {
    /// Carry on and answer PINGs
    Ignore,
    /// Send GOAWAY with this code, then stop
    GoAway(ErrorCode),
    /// Close the connection without a word
    Close,
    /// Carry on but never answer PINGs
    Silent,
    /// Never answer PINGs and keep sending our own, so the connection is
    /// never idle long enough for a read to time out
    Chatter,
}

impl ResetBehavior {
    fn answers_pings(self) -> bool {
        !matches!(self, ResetBehavior::Silent | ResetBehavior::Chatter)
    }
}

/// Interval between the unsolicited PINGs of a chattering server
pub const CHATTER_INTERVAL: Duration = Duration::from_millis(100);

/// A server-side connection that can end its write half cleanly
pub trait Conn: Read + Write {
    fn finish(&mut self);
}

impl Conn for TcpStream {
    fn finish(&mut self) {
        let _ = self.shutdown(Shutdown::Write);
    }
}

impl Conn for SslStream<TcpStream> {
    fn finish(&mut self) {
        let _ = self.shutdown();
        let _ = self.get_ref().shutdown(Shutdown::Write);
    }
}

/// A port nothing listens on
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn serve<F>(handler: F) -> u16
where
    F: Fn(TcpStream) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handler = Arc::new(handler);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let handler = Arc::clone(&handler);
            thread::spawn(move || handler(stream));
        }
    });

    port
}

fn acceptor(offer_h2: bool) -> SslAcceptor {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "localhost").unwrap();
    let name = name.build();

    let mut cert = X509Builder::new().unwrap();
    cert.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    cert.set_serial_number(&serial).unwrap();
    cert.set_subject_name(&name).unwrap();
    cert.set_issuer_name(&name).unwrap();
    cert.set_pubkey(&key).unwrap();
    cert.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    cert.set_not_after(&Asn1Time::days_from_now(1).unwrap()).unwrap();
    cert.sign(&key, MessageDigest::sha256()).unwrap();
    let cert = cert.build();

    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    builder.set_private_key(&key).unwrap();
    builder.set_certificate(&cert).unwrap();

    let protos: &'static [u8] = if offer_h2 {
        b"\x02h2\x08http/1.1"
    } else {
        b"\x08http/1.1"
    };
    builder.set_alpn_select_callback(move |_, client| select_next_proto(protos, client).ok_or(AlpnError::NOACK));
    builder.build()
}

/// HTTPS server selecting `h2` via ALPN
pub fn h2_tls_server(behavior: ResetBehavior) -> u16 {
    let acceptor = acceptor(true);
    serve(move |stream| {
        let Ok(mut tls) = acceptor.accept(stream) else { return };
        let mut preface = [0u8; 24];
        if tls.read_exact(&mut preface).is_err() || &preface[..] != CONNECTION_PREFACE {
            return;
        }
        if send(&mut tls, &server_settings()).is_err() {
            return;
        }
        serve_frames(&mut tls, behavior, &mut hpack::Encoder::new());
    })
}

/// HTTPS server that only speaks HTTP/1.1
pub fn http1_tls_server() -> u16 {
    let acceptor = acceptor(false);
    serve(move |stream| {
        let Ok(mut tls) = acceptor.accept(stream) else { return };
        if read_request_head(&mut tls).is_err() {
            return;
        }
        let _ = tls.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
        tls.finish();
    })
}

/// Cleartext server accepting `Upgrade: h2c`
pub fn h2c_server(behavior: ResetBehavior) -> u16 {
    serve(move |mut stream| {
        let Ok(head) = read_request_head(&mut stream) else { return };
        if !head.to_ascii_lowercase().contains("upgrade: h2c") {
            let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
            return;
        }

        let mut encoder = hpack::Encoder::new();
        let switched = stream
            .write_all(b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: h2c\r\n\r\n")
            .and_then(|_| send(&mut stream, &server_settings()));
        if switched.is_err() {
            return;
        }

        let mut preface = [0u8; 24];
        if stream.read_exact(&mut preface).is_err() || &preface[..] != CONNECTION_PREFACE {
            return;
        }
        if respond(&mut stream, &mut encoder, 1).is_err() {
            return;
        }
        serve_frames(&mut stream, behavior, &mut encoder);
    })
}

/// Cleartext server that accepts `Upgrade: h2c`, then never answers stream 1
/// while pinging the client every `CHATTER_INTERVAL`
pub fn stalling_h2c_server() -> u16 {
    serve(|mut stream| {
        if read_request_head(&mut stream).is_err() {
            return;
        }
        let switched = stream
            .write_all(b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: h2c\r\n\r\n")
            .and_then(|_| send(&mut stream, &server_settings()));
        if switched.is_err() {
            return;
        }
        chatter(&mut stream);
    })
}

/// Cleartext HTTP/1.0 server ignoring upgrade requests
pub fn http10_server() -> u16 {
    serve(|mut stream| {
        if read_request_head(&mut stream).is_ok() {
            let _ = stream.write_all(b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nhello");
        }
    })
}

/// Accepts connections and never says anything
pub fn silent_server() -> u16 {
    serve(|_stream| thread::sleep(Duration::from_secs(10)))
}

/// HTTP CONNECT proxy answering `status`; counts the CONNECT requests it saw
pub fn connect_proxy(status: u16) -> (u16, Arc<AtomicUsize>) {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let port = serve(move |mut client| {
        let Ok(head) = read_request_head(&mut client) else { return };
        let Some(authority) = head
            .strip_prefix("CONNECT ")
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_string)
        else {
            return;
        };
        counter.fetch_add(1, Ordering::SeqCst);

        if status != 200 {
            let _ = write!(client, "HTTP/1.1 {} Proxy Authentication Required\r\nContent-Length: 0\r\n\r\n", status);
            return;
        }

        let Ok(upstream) = TcpStream::connect(authority.as_str()) else {
            let _ = client.write_all(b"HTTP/1.1 502 Bad Gateway\r\nContent-Length: 0\r\n\r\n");
            return;
        };
        if client.write_all(b"HTTP/1.1 200 Connection established\r\n\r\n").is_err() {
            return;
        }
        pipe(client, upstream);
    });

    (port, seen)
}

fn pipe(client: TcpStream, upstream: TcpStream) {
    let (Ok(mut client_read), Ok(mut upstream_write)) = (client.try_clone(), upstream.try_clone()) else {
        return;
    };
    let forward = thread::spawn(move || {
        let _ = io::copy(&mut client_read, &mut upstream_write);
        let _ = upstream_write.shutdown(Shutdown::Write);
    });

    let (mut client, mut upstream) = (client, upstream);
    let _ = io::copy(&mut upstream, &mut client);
    let _ = client.shutdown(Shutdown::Write);
    let _ = forward.join();
}

/// Read up to and including the blank line, one byte at a time so that
/// nothing behind the head is consumed
fn read_request_head<C: Read>(conn: &mut C) -> io::Result<String> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        conn.read_exact(&mut byte)?;
        head.push(byte[0]);
        if head.len() > 16 * 1024 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "request head too large"));
        }
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}

fn server_settings() -> Bytes {
    let settings = Settings {
        max_concurrent_streams: Some(100),
        ..Settings::default()
    };
    FrameCodec::encode_settings_frame(&SettingsFrame::new(settings))
}

fn send<C: Write>(conn: &mut C, bytes: &[u8]) -> io::Result<()> {
    conn.write_all(bytes)?;
    conn.flush()
}

fn respond<C: Write>(conn: &mut C, encoder: &mut hpack::Encoder<'static>, stream_id: u32) -> io::Result<()> {
    let block = encoder.encode(vec![(&b":status"[..], &b"200"[..])]);
    let frame = HeadersFrame::new(stream_id, Bytes::from(block), true, true);
    send(conn, &FrameCodec::encode_headers_frame(&frame))
}

/// Read frames until the client leaves or the reset behavior ends things
fn serve_frames<C: Conn>(conn: &mut C, behavior: ResetBehavior, encoder: &mut hpack::Encoder<'static>) {
    loop {
        let Ok(frame) = FrameCodec::read_frame(conn) else { return };

        let written = match frame.frame_type {
            FrameType::Settings if !frame.flags.is_ack() => {
                send(conn, &FrameCodec::encode_settings_frame(&SettingsFrame::ack()))
            }
            FrameType::Headers => respond(conn, encoder, frame.stream_id),
            FrameType::Ping if !frame.flags.is_ack() && behavior.answers_pings() => {
                let Ok(ping) = PingFrame::decode(&frame) else { return };
                send(conn, &FrameCodec::encode_ping_frame(&PingFrame::ack(ping.data)))
            }
            FrameType::RstStream => match behavior {
                ResetBehavior::GoAway(code) => {
                    let goaway = GoawayFrame::new(frame.stream_id, code, Bytes::from_static(b"rapid reset detected"));
                    let _ = send(conn, &FrameCodec::encode_goaway_frame(&goaway));
                    conn.finish();
                    drain(conn);
                    return;
                }
                ResetBehavior::Close => {
                    conn.finish();
                    drain(conn);
                    return;
                }
                ResetBehavior::Chatter => {
                    chatter(conn);
                    return;
                }
                ResetBehavior::Ignore | ResetBehavior::Silent => Ok(()),
            },
            FrameType::Goaway => return,
            _ => Ok(()),
        };

        if written.is_err() {
            return;
        }
    }
}

/// Send a PING every `CHATTER_INTERVAL` until the client goes away
fn chatter<C: Write>(conn: &mut C) {
    for _ in 0..100 {
        let ping = FrameCodec::encode_ping_frame(&PingFrame::new(*b"chatter!"));
        if send(conn, &ping).is_err() {
            return;
        }
        thread::sleep(CHATTER_INTERVAL);
    }
}

/// Swallow whatever the client still sends until it closes
fn drain<C: Read>(conn: &mut C) {
    let mut buf = [0u8; 1024];
    while matches!(conn.read(&mut buf), Ok(n) if n > 0) {}
}
