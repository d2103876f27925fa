// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// Framing overhead and end-to-end pump throughput, benchmarked with
// criterion the way the rest of this corpus benchmarks hot loops.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use wiremux::frame::FrameHeader;
use wiremux::socket::DuplexPipe;
use wiremux::{Config, Transport};

fn bench_frame_header_round_trip(c: &mut Criterion) {
    c.bench_function("frame_header_encode_decode", |b| {
        let header = FrameHeader {
            channel_id: 3,
            length: 65536,
        };
        b.iter(|| {
            let encoded = black_box(header).encode();
            black_box(FrameHeader::decode(encoded))
        });
    });
}

fn bench_endpoint_send_receive(c: &mut Criterion) {
    let mut group = c.benchmark_group("endpoint_send_receive");
    for size in [64usize, 4096, 65536] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let (sock_a, sock_b) = DuplexPipe::pair();
            let a = Transport::new(sock_a, Config::default());
            let b_transport = Transport::new(sock_b, Config::default());
            let ep_a = a.open_channel(1);
            let ep_b = b_transport.open_channel(1);
            let payload = vec![0xAB_u8; size];

            b.iter(|| {
                ep_a.send(black_box(&payload));
                black_box(ep_b.blocking_receive());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_frame_header_round_trip, bench_endpoint_send_receive);
criterion_main!(benches);
