use criterion::{black_box, criterion_group, criterion_main, Criterion};
use faas_core::model_table::{ModelData, ModelTable};
use faas_core::prewarm::{desired_count, PrewarmingConfig, ReactiveConfig};

fn bench_update_all_derived(c: &mut Criterion) {
    let table = ModelTable::new();
    for i in 0..64 {
        table.register(ModelData::new(
            format!("ptest{i:02}"),
            format!("model-{i}"),
            200 + (i * 7) % 1800,
            1_500 + (i as u64 * 37) % 4_000,
        ));
        table.update_lambda(&format!("ptest{i:02}"), 0.02 * (i as f64 + 1.0));
    }

    c.bench_function("model_table_update_all_derived_64", |b| {
        b.iter(|| table.update_all_derived(black_box(1.0)));
    });
}

fn bench_prewarm_desired_count(c: &mut Criterion) {
    let cfg = PrewarmingConfig {
        initial_count: 2,
        kind: "python:3".into(),
        memory_mb: 256,
        reactive: Some(ReactiveConfig {
            min_count: 1,
            max_count: 16,
            threshold: 5,
            increment: 2,
        }),
    };

    c.bench_function("prewarm_desired_count_reactive_tick", |b| {
        b.iter(|| desired_count(black_box(&cfg), black_box(3), black_box(47), black_box(false)));
    });
}

criterion_group!(benches, bench_update_all_derived, bench_prewarm_desired_count);
criterion_main!(benches);
