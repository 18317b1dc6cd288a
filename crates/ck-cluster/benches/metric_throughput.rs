use ck_cluster::{chi2, ClusterEngine, ClusterMethod, Criterion, Linkage, Metric};
use ck_core::Metadata;
use ck_data::{Column, DataContainer, DataWithErrors, Table};
use criterion::{criterion_group, criterion_main, Criterion as Bench};

fn dataset(rows: usize, nbins: usize) -> DataWithErrors {
    let mut table = Table::with_rows(rows);
    for bin in 0..nbins {
        let values = (0..rows)
            .map(|row| 1.0 + ((row * 31 + bin * 17) % 23) as f64 / 7.0)
            .collect();
        table
            .insert_column(Column::float(format!("bin{bin}"), values))
            .expect("column");
    }
    let mut dwe = DataWithErrors::new(DataContainer::from_table_and_metadata(
        table,
        Metadata::default(),
    ));
    dwe.add_rel_err_uncorr(0.05);
    dwe
}

fn bench_metric(c: &mut Bench) {
    let data = dataset(300, 10);
    let mut group = c.benchmark_group("chi2");
    group.bench_function("300x10", |b| b.iter(|| chi2(&data).expect("chi2")));
    group.finish();

    let small = dataset(120, 10);
    c.bench_function("hierarchical_120", |b| {
        b.iter(|| {
            let mut engine = ClusterEngine::new(ClusterMethod::Hierarchical {
                linkage: Linkage::Average,
                criterion: Criterion::MaxClust { k: 5 },
                metric: Metric::Chi2,
            });
            engine.cluster(&small).expect("cluster").n_clusters()
        })
    });
}

criterion_group!(benches, bench_metric);
criterion_main!(benches);
