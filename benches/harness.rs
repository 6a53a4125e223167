use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array1;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tabular_bench::data::{Column, Table};
use tabular_bench::evaluation::{EvaluationHarness, HarnessConfig};
use tabular_bench::training::{HyperValue, StrategyConfig, StrategyKind};

fn create_classification_data(n_rows: usize, n_features: usize) -> (Table, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let columns: Vec<Column> = (0..n_features)
        .map(|i| {
            let values: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>()).collect();
            Column::numeric(format!("feature_{}", i), values)
        })
        .collect();

    // Label depends on the first feature plus noise
    let first = columns[0].as_f64().map(<[f64]>::to_vec).unwrap_or_default();
    let labels: Vec<f64> = first
        .iter()
        .map(|&v| if v + rng.gen::<f64>() * 0.3 > 0.65 { 1.0 } else { 0.0 })
        .collect();

    (Table::new(columns).unwrap(), Array1::from_vec(labels))
}

fn bench_cross_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_validation");
    group.sample_size(10);

    let strategies = [
        StrategyConfig::new(StrategyKind::LogisticRegression),
        StrategyConfig::new(StrategyKind::RandomForest)
            .with_param("n_estimators", HyperValue::Int(10)),
    ];

    for n_rows in [500, 2000].iter() {
        let (table, labels) = create_classification_data(*n_rows, 10);

        for parallel in [false, true] {
            let harness = EvaluationHarness::new(
                HarnessConfig::default()
                    .with_folds(5)
                    .with_parallel_folds(parallel),
            )
            .unwrap();

            for strategy in &strategies {
                let id = format!(
                    "{}/{}",
                    tabular_bench::training::StrategyFactory::id(strategy),
                    if parallel { "parallel" } else { "sequential" }
                );
                group.bench_with_input(BenchmarkId::new(id, n_rows), n_rows, |b, _| {
                    b.iter(|| {
                        harness
                            .cross_validate(black_box(strategy), black_box(&table), black_box(&labels))
                            .unwrap()
                    })
                });
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_cross_validation);
criterion_main!(benches);
