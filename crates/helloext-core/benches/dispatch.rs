//! Extension dispatch benchmarks.
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use helloext_core::{
    CustomExtension, ExtensionType, HelloExtRegistry, HelloExtSession, HelloMsg, ParseClass,
    SendStatus, TlsRole,
};

fn registry(n_exts: u16) -> Arc<HelloExtRegistry> {
    let mut registry = HelloExtRegistry::empty();
    for i in 0..n_exts {
        registry
            .register(
                CustomExtension::new(ExtensionType(0x6000 + i), "bench")
                    .on_recv(|_, _| Ok(()))
                    .on_send(|_, buf| {
                        buf.extend_from_slice(&[0xAB; 16]);
                        Ok(SendStatus::Normal)
                    }),
            )
            .unwrap();
    }
    Arc::new(registry)
}

fn block(n_exts: u16) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..n_exts {
        out.extend_from_slice(&(0x6000 + i).to_be_bytes());
        out.extend_from_slice(&16u16.to_be_bytes());
        out.extend_from_slice(&[0xAB; 16]);
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for n in [4u16, 16, 32] {
        let registry = registry(n);
        let data = block(n);

        group.bench_with_input(BenchmarkId::new("known", n), &n, |bench, _| {
            bench.iter(|| {
                let mut sess = HelloExtSession::new(registry.clone(), TlsRole::Server);
                sess.parse(HelloMsg::ClientHello, ParseClass::Any, &data)
                    .unwrap();
            });
        });
    }

    // All wire ids unknown to the catalog: the skip path.
    let registry = Arc::new(HelloExtRegistry::with_builtins());
    let data = block(32);
    group.bench_function("unknown", |bench| {
        bench.iter(|| {
            let mut sess = HelloExtSession::new(registry.clone(), TlsRole::Server);
            sess.parse(HelloMsg::ClientHello, ParseClass::Any, &data)
                .unwrap();
        });
    });

    group.finish();
}

fn bench_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit");

    for n in [4u16, 16, 32] {
        let registry = registry(n);

        group.bench_with_input(BenchmarkId::new("client", n), &n, |bench, _| {
            bench.iter(|| {
                let mut sess = HelloExtSession::new(registry.clone(), TlsRole::Client);
                let mut out = Vec::new();
                sess.emit(HelloMsg::ClientHello, ParseClass::Any, &mut out)
                    .unwrap();
                out
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_emit);
criterion_main!(benches);
