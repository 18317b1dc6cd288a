use std::collections::BTreeMap;

use ck_scan::{FunctionRegistry, Scanner};
use criterion::{criterion_group, criterion_main, Criterion};

fn scanner(workers: usize) -> Scanner {
    let registry =
        FunctionRegistry::with_builtins((0..=10).map(|i| i as f64 * 0.2).collect(), true)
            .expect("registry");
    let mut values = BTreeMap::new();
    for name in ["c1", "c2", "c3"] {
        values.insert(name.to_string(), (0..8).map(|i| -1.0 + i as f64 * 0.25).collect());
    }
    let mut scanner = Scanner::new(registry);
    scanner
        .set_spoints_grid(values)
        .set_workers(Some(workers))
        .set_dfunction("polynomial")
        .expect("dfunction");
    scanner
}

fn bench_scan(c: &mut Criterion) {
    for workers in [1, 4] {
        let scanner = scanner(workers);
        c.bench_function(&format!("scan_512_points_{workers}_workers"), |b| {
            b.iter(|| scanner.run().expect("scan"));
        });
    }
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
