//! Performance benchmarks for wslite.
//!
//! Run with: `cargo bench`

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::io;
use wslite::protocol::frame::frame_wire_size;
use wslite::protocol::mask::{apply_mask, apply_mask_fast};
use wslite::protocol::{
    MessageReader, OpCode, build_handshake_response, compute_accept_key, make_frame,
    make_masked_frame, parse_handshake, parse_input_frame, write_frame,
};
use wslite::{Config, Transport};

const MASK: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

const REQUEST: &[u8] = b"GET /chat HTTP/1.1\r\n\
    Host: server.example.com\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
    Origin: http://example.com\r\n\
    Sec-WebSocket-Version: 13\r\n\r\n";

// =============================================================================
// Frame Parsing Benchmarks
// =============================================================================

fn bench_frame_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_parsing");

    for (name, size) in [("small_10b", 10), ("medium_1kb", 1024), ("large_64kb", 65536)] {
        let wire = make_masked_frame(&vec![0xAB; size], OpCode::Binary, MASK);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(name, |b| {
            b.iter_batched(
                || wire.clone(),
                |mut buf| {
                    let _ = black_box(parse_input_frame(&mut buf));
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

// =============================================================================
// Frame Encoding Benchmarks
// =============================================================================

fn bench_frame_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encoding");

    for (name, size) in [("small_10b", 10), ("medium_1kb", 1024), ("large_64kb", 65536)] {
        let payload = vec![0xAB; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("make_frame_{}", name), |b| {
            b.iter(|| make_frame(black_box(&payload), OpCode::Binary))
        });

        let mut buf = vec![0u8; frame_wire_size(size, false)];
        group.bench_function(format!("write_frame_{}", name), |b| {
            b.iter(|| write_frame(black_box(&payload), OpCode::Binary, &mut buf))
        });
    }

    group.finish();
}

// =============================================================================
// Masking Benchmarks
// =============================================================================

fn bench_masking(c: &mut Criterion) {
    let mut group = c.benchmark_group("masking");

    for size in [64usize, 1024, 65536] {
        let mut data = vec![0xAB; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("bytewise_{}", size), |b| {
            b.iter(|| apply_mask(black_box(&mut data), MASK))
        });
        group.bench_function(format!("word_{}", size), |b| {
            b.iter(|| apply_mask_fast(black_box(&mut data), MASK))
        });
    }

    group.finish();
}

// =============================================================================
// Handshake Benchmarks
// =============================================================================

fn bench_handshake(c: &mut Criterion) {
    let mut group = c.benchmark_group("handshake");

    group.bench_function("compute_accept_key", |b| {
        b.iter(|| compute_accept_key(black_box("dGhlIHNhbXBsZSBub25jZQ==")))
    });

    group.bench_function("parse_request", |b| {
        b.iter(|| parse_handshake(black_box(REQUEST)))
    });

    let handshake = parse_handshake(REQUEST);
    group.bench_function("build_response", |b| {
        b.iter(|| build_handshake_response(black_box(&handshake)))
    });

    group.finish();
}

// =============================================================================
// Message Reader Benchmarks
// =============================================================================

/// Replays a byte stream in fixed-size reads and discards writes.
struct Replay {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl Transport for Replay {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
}

fn bench_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("reader");

    let large = make_masked_frame(&vec![0x42; 1 << 20], OpCode::Binary, MASK);
    group.throughput(Throughput::Bytes(1 << 20));
    group.bench_function("single_1mb_frame_16kb_reads", |b| {
        b.iter_batched(
            || Replay {
                data: large.clone(),
                pos: 0,
                chunk: 16 * 1024,
            },
            |mut t| MessageReader::new(&Config::default()).read_message(&mut t),
            BatchSize::LargeInput,
        )
    });

    let mut stream = Vec::new();
    for _ in 0..100 {
        stream.extend_from_slice(&make_masked_frame(b"", OpCode::Ping, MASK));
        stream.extend_from_slice(&make_masked_frame(b"hello world", OpCode::Text, MASK));
    }
    group.throughput(Throughput::Elements(100));
    group.bench_function("100_text_with_pings", |b| {
        b.iter_batched(
            || Replay {
                data: stream.clone(),
                pos: 0,
                chunk: 4096,
            },
            |mut t| {
                let mut reader = MessageReader::new(&Config::default());
                for _ in 0..100 {
                    let _ = black_box(reader.read_message(&mut t));
                }
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_parsing,
    bench_frame_encoding,
    bench_masking,
    bench_handshake,
    bench_reader
);
criterion_main!(benches);
