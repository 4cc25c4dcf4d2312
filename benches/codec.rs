//! Benchmark: schema encode/decode for both topologies, frame wrap, and tokenizing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use p4calc::{fields, tokenize, Dispatcher, Fields, MacAddr, PacketSchema, Topology};

fn bench_schemas(c: &mut Criterion) {
    let single = PacketSchema::single_stage();
    let cascade = PacketSchema::cascade();
    let values = fields([("data", 0x11u64), ("res", 0u64)]);
    let single_bytes = single.encode_with_defaults(&values).unwrap();
    let cascade_bytes = cascade.encode_with_defaults(&Fields::new()).unwrap();

    c.bench_function("single_stage encode", |b| {
        b.iter(|| single.encode_with_defaults(black_box(&values)).unwrap())
    });
    c.bench_function("single_stage decode", |b| {
        b.iter(|| single.decode(black_box(&single_bytes)).unwrap())
    });
    c.bench_function("cascade decode", |b| {
        b.iter(|| cascade.decode(black_box(&cascade_bytes)).unwrap())
    });

    let dispatcher = Dispatcher::for_topology(Topology::SingleStage);
    c.bench_function("wrap frame", |b| {
        b.iter(|| {
            dispatcher
                .wrap(MacAddr::BROADCAST, MacAddr::default(), black_box(&values))
                .unwrap()
                .to_bytes()
        })
    });
}

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize", |b| b.iter(|| tokenize(black_box("  1234 ^ 5678  ")).unwrap()));
}

criterion_group!(benches, bench_schemas, bench_tokenize);
criterion_main!(benches);
