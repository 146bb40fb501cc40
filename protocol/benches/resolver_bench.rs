// Authority resolution benchmarks.
//
// Wide graphs: one account with many delegates, each holding a local key.
// Deep graphs: a delegate chain longer than the traversal bound, so the
// cost stays flat past depth three.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use quill_protocol::authority::{
    AccountAuthorities, Authority, AuthorityResolver, MemoryAuthorities, Permission,
};
use quill_protocol::config::DEFAULT_KEY_PREFIX;
use quill_protocol::crypto::keys::PrivateKey;
use quill_protocol::wallet::MemoryKeyStore;

fn key_text(key: &PrivateKey) -> String {
    key.public_key().to_prefixed(DEFAULT_KEY_PREFIX)
}

fn wide(delegates: usize) -> (MemoryKeyStore, MemoryAuthorities) {
    let mut keys = MemoryKeyStore::new();
    let mut authorities = MemoryAuthorities::new();
    let mut root = Authority {
        weight_threshold: u32::MAX,
        account_auths: vec![],
        key_auths: vec![],
    };
    for i in 0..delegates {
        let name = format!("delegate{:04}", i);
        let key = PrivateKey::generate();
        keys.add(key.clone());
        authorities.insert(AccountAuthorities::uniform(
            name.clone(),
            Authority::single_key(key_text(&key)),
        ));
        root = root.with_account(name, 1);
    }
    authorities.insert(AccountAuthorities::uniform("root", root));
    (keys, authorities)
}

fn deep(levels: usize) -> (MemoryKeyStore, MemoryAuthorities) {
    let mut keys = MemoryKeyStore::new();
    let mut authorities = MemoryAuthorities::new();
    for i in 0..levels {
        let key = PrivateKey::generate();
        keys.add(key.clone());
        let mut auth = Authority {
            weight_threshold: u32::MAX,
            account_auths: vec![],
            key_auths: vec![(key_text(&key), 1)],
        };
        if i + 1 < levels {
            auth = auth.with_account(format!("level{}", i + 1), 1);
        }
        authorities.insert(AccountAuthorities::uniform(format!("level{}", i), auth));
    }
    (keys, authorities)
}

fn bench_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver/wide");
    for delegates in [1, 10, 100] {
        let (keys, authorities) = wide(delegates);
        group.bench_with_input(BenchmarkId::from_parameter(delegates), &delegates, |b, _| {
            let resolver = AuthorityResolver::new(&keys, &authorities, DEFAULT_KEY_PREFIX);
            b.iter(|| resolver.resolve("root", Permission::Active).unwrap());
        });
    }
    group.finish();
}

fn bench_deep(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver/deep");
    for levels in [2, 3, 10] {
        let (keys, authorities) = deep(levels);
        group.bench_with_input(BenchmarkId::from_parameter(levels), &levels, |b, _| {
            let resolver = AuthorityResolver::new(&keys, &authorities, DEFAULT_KEY_PREFIX);
            b.iter(|| resolver.resolve("level0", Permission::Active).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_wide, bench_deep);
criterion_main!(benches);
