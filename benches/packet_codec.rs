use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use udp_audio_streamer::protocol::Packet;

fn bench_packet_codec(c: &mut Criterion) {
    let packet = Packet::audio(7, 1234, 1_700_000_000_000_000, 48000, Bytes::from(vec![0x5A; 160]));
    let encoded = packet.encode();

    let mut group = c.benchmark_group("packet");
    group.throughput(Throughput::Bytes(encoded.len() as u64));

    group.bench_function("encode", |b| {
        let mut buf = BytesMut::with_capacity(2048);
        b.iter(|| {
            buf.clear();
            black_box(&packet).encode_into(&mut buf);
            black_box(buf.len())
        })
    });

    group.bench_function("decode", |b| {
        b.iter(|| Packet::decode(black_box(&encoded)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_packet_codec);
criterion_main!(benches);
