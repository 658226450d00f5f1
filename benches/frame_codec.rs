//! Frame codec benchmarks
//!
//! Measures the frames a probe writes and reads:
//! - frame header encode/decode
//! - the HEADERS + RST_STREAM + PING burst of the reset probe
//! - SETTINGS payload encode/decode, including the h2c `HTTP2-Settings` header
//! - reading frames back from a byte stream and decoding GOAWAY
//!
//! Run with: cargo bench --bench frame_codec

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rrscan::http::h2::{
    ErrorCode, FrameCodec, FrameFlags, FrameType, GoawayFrame, HeadersFrame, PingFrame, RstStreamFrame, Settings,
    SettingsFrame,
};
use rrscan::probe::{classify, NegotiationOutcome, Rejection, ResetOutcome, PROBE_PING};
use std::io::Cursor;
use std::time::Duration;

fn request_block() -> Vec<u8> {
    let mut encoder = hpack::Encoder::new();
    encoder.encode(vec![
        (&b":method"[..], &b"GET"[..]),
        (&b":scheme"[..], &b"https"[..]),
        (&b":authority"[..], &b"example.com"[..]),
        (&b":path"[..], &b"/"[..]),
        (&b"user-agent"[..], &b"rrscan/0.1.0"[..]),
    ])
}

fn bench_frame_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_header");

    group.bench_function("encode_rst_stream_header", |b| {
        b.iter(|| {
            let header = FrameCodec::encode_header(
                black_box(FrameType::RstStream),
                black_box(FrameFlags::empty()),
                black_box(3),
                black_box(4),
            );
            black_box(header);
        });
    });

    let encoded = FrameCodec::encode_header(FrameType::Headers, FrameFlags::from_u8(0x05), 1, 4096);
    group.bench_function("decode_headers_header", |b| {
        b.iter(|| black_box(FrameCodec::decode_header(black_box(&encoded))));
    });

    group.finish();
}

fn bench_reset_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("reset_burst");
    let block = Bytes::from(request_block());

    group.bench_function("headers_rst_ping", |b| {
        b.iter(|| {
            let mut burst = BytesMut::with_capacity(128);
            let headers = HeadersFrame::new(black_box(1), block.clone(), true, true);
            burst.extend_from_slice(&FrameCodec::encode_headers_frame(&headers));
            let rst = RstStreamFrame::new(black_box(1), ErrorCode::Cancel);
            burst.extend_from_slice(&FrameCodec::encode_rst_stream_frame(&rst));
            burst.extend_from_slice(&FrameCodec::encode_ping_frame(&PingFrame::new(PROBE_PING)));
            black_box(burst);
        });
    });

    group.bench_function("hpack_request_block", |b| {
        b.iter(|| black_box(request_block()));
    });

    group.finish();
}

fn bench_settings(c: &mut Criterion) {
    let mut group = c.benchmark_group("settings");

    let settings = Settings {
        header_table_size: Some(4096),
        enable_push: Some(false),
        initial_window_size: Some(65535),
        max_frame_size: Some(16384),
        ..Settings::default()
    };

    group.bench_function("encode_settings_frame", |b| {
        b.iter(|| {
            let frame = SettingsFrame::new(black_box(settings.clone()));
            black_box(FrameCodec::encode_settings_frame(&frame));
        });
    });

    group.bench_function("h2c_settings_header", |b| {
        b.iter(|| black_box(URL_SAFE_NO_PAD.encode(black_box(&settings).encode_payload())));
    });

    let payload = settings.encode_payload();
    group.bench_function("decode_settings_payload", |b| {
        b.iter(|| black_box(Settings::decode(black_box(&payload)).unwrap()));
    });

    group.finish();
}

fn bench_read_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_frames");

    let mut wire = BytesMut::new();
    wire.extend_from_slice(&FrameCodec::encode_settings_frame(&SettingsFrame::ack()));
    wire.extend_from_slice(&FrameCodec::encode_headers_frame(&HeadersFrame::new(
        1,
        Bytes::from_static(&[0x88]),
        true,
        true,
    )));
    wire.extend_from_slice(&FrameCodec::encode_goaway_frame(&GoawayFrame::new(
        1,
        ErrorCode::EnhanceYourCalm,
        Bytes::from_static(b"too many resets"),
    )));
    let wire = wire.freeze();

    group.bench_function("settings_headers_goaway", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(&wire[..]));
            let mut last = None;
            for _ in 0..3 {
                last = Some(FrameCodec::read_frame(&mut cursor).unwrap());
            }
            let goaway = GoawayFrame::decode(&last.unwrap()).unwrap();
            black_box(goaway.into_error());
        });
    });

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    let reset = ResetOutcome::ResetRejected(Rejection::goaway(
        "GOAWAY received: ENHANCE_YOUR_CALM (0xb) (last stream 1)",
        Some(ErrorCode::EnhanceYourCalm),
    ));
    group.bench_function("rejected_reset", |b| {
        b.iter(|| black_box(classify(black_box(&NegotiationOutcome::NegotiatedH2), black_box(&reset))));
    });

    group.finish();
}

criterion_group! {
    name = codec;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(500);
    targets =
        bench_frame_header,
        bench_reset_burst,
        bench_settings,
        bench_read_frames
}

criterion_group! {
    name = classification;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(500);
    targets = bench_classify
}

criterion_main!(codec, classification);
