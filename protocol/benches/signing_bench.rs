// Signing benchmarks for the reference codec.
//
// Covers key generation, WIF round-trips, canonical serialization of a
// transaction, and signing with growing key sets.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;

use quill_protocol::crypto::keys::PrivateKey;
use quill_protocol::transaction::{BlockParams, Operation, ReferenceCodec, TransactionCodec};

const PARAMS: BlockParams = BlockParams {
    ref_block_num: 4242,
    ref_block_prefix: 0xdead_beef,
};
const EXPIRATION: &str = "2026-06-01T00:00:30";

fn operations(count: usize) -> Vec<Operation> {
    (0..count)
        .map(|i| {
            Operation::from_json(
                "transfer",
                json!({
                    "from": "alice",
                    "to": format!("user{:04}", i),
                    "amount": "1.000 MORPH",
                    "memo": "",
                }),
            )
        })
        .collect()
}

fn bench_key_generation(c: &mut Criterion) {
    c.bench_function("keys/generate", |b| {
        b.iter(PrivateKey::generate);
    });
}

fn bench_wif_parse(c: &mut Criterion) {
    let wif = PrivateKey::generate().to_wif();
    c.bench_function("keys/from_wif", |b| {
        b.iter(|| PrivateKey::from_wif(&wif).unwrap());
    });
}

fn bench_serialize(c: &mut Criterion) {
    let codec = ReferenceCodec::default();
    let mut group = c.benchmark_group("codec/serialize");

    for ops in [1, 10, 100] {
        let tx = codec.build(PARAMS, EXPIRATION, &operations(ops)).unwrap();
        group.throughput(Throughput::Elements(ops as u64));
        group.bench_with_input(BenchmarkId::from_parameter(ops), &tx, |b, tx| {
            b.iter(|| codec.serialize(tx).unwrap());
        });
    }

    group.finish();
}

fn bench_sign(c: &mut Criterion) {
    let codec = ReferenceCodec::default();
    let tx = codec.build(PARAMS, EXPIRATION, &operations(5)).unwrap();
    let mut group = c.benchmark_group("codec/sign");

    for signers in [1, 3, 10] {
        let keys: Vec<PrivateKey> = (0..signers).map(|_| PrivateKey::generate()).collect();
        group.throughput(Throughput::Elements(signers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(signers), &keys, |b, keys| {
            b.iter(|| codec.sign(&tx, keys).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_key_generation,
    bench_wif_parse,
    bench_serialize,
    bench_sign,
);
criterion_main!(benches);
