//! Hello extension codec benchmarks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sectls_core::extensions::{decode_opaque, encode_opaque, Extensions, LENGTH_HEADER_SIZE};
use sectls_core::opaque_prf_input::OpaquePrfInput;
use sectls_core::state::Role;

fn benchmark_opaque(c: &mut Criterion) {
    let mut group = c.benchmark_group("opaque_vector");

    for size in [32usize, 1024, 65535] {
        let payload = vec![0x5a; size];
        let mut encoded = vec![0u8; LENGTH_HEADER_SIZE + size];
        encode_opaque(&payload, &mut encoded).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &payload, |b, payload| {
            let mut out = vec![0u8; LENGTH_HEADER_SIZE + payload.len()];
            b.iter(|| black_box(encode_opaque(black_box(payload), &mut out).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, encoded| {
            b.iter(|| black_box(decode_opaque(black_box(encoded)).unwrap().len()))
        });
    }

    group.finish();
}

/// Client offer through server answer, one registry pair per iteration
fn benchmark_prf_input_exchange(c: &mut Criterion) {
    let offer = {
        let mut client = Extensions::new();
        client.register(Box::new(OpaquePrfInput::client(vec![0x11; 32])));
        client.send_block(Role::Client).unwrap()
    };

    c.bench_function("opaque_prf_input_server", |b| {
        b.iter(|| {
            let mut server = Extensions::new();
            server.register(Box::new(OpaquePrfInput::server(Arc::new(
                |client: &[u8], out: &mut [u8]| -> core::result::Result<(), i32> {
                    out.copy_from_slice(client);
                    Ok(())
                },
            ))));
            server.receive_block(Role::Server, black_box(&offer)).unwrap();
            black_box(server.send_block(Role::Server).unwrap())
        })
    });
}

criterion_group!(benches, benchmark_opaque, benchmark_prf_input_exchange);
criterion_main!(benches);
