//! Explanation performance benchmarks.
//!
//! Measures TreeSHAP attribution, Anchor rule search and the full request
//! cycle against the fixture dataset and pipeline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rookery::explain::{ExplanationAdapter, TreeExplainer};
use rookery::{Dashboard, ExplainRequest, FormValues, RookeryConfig};
use std::path::PathBuf;

fn load_dashboard() -> Dashboard {
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures");
    Dashboard::load(
        RookeryConfig::default(),
        fixtures.join("penguins.csv"),
        fixtures.join("penguin_clf.json"),
    )
    .unwrap()
}

fn specimen() -> FormValues {
    FormValues::new()
        .with("island", "Biscoe")
        .with("gender", "male")
        .with("culmen_length_mm", 48.0)
        .with("culmen_depth_mm", 15.0)
        .with("flipper_length_mm", 220.0)
        .with("body_mass_g", 5400.0)
}

/// Benchmark exact TreeSHAP over every reference row.
fn bench_tree_shap(c: &mut Criterion) {
    let dashboard = load_dashboard();
    let pipeline = dashboard.pipeline();
    let explainer = TreeExplainer::new(&pipeline.classifier).unwrap();
    let rows = &dashboard.reference().rows;

    c.bench_function("tree_shap_reference_rows", |b| {
        b.iter(|| {
            for row in rows {
                black_box(explainer.shap_values(black_box(row)));
            }
        })
    });
}

/// Benchmark Anchor rule search at increasing precision thresholds.
fn bench_anchor_search(c: &mut Criterion) {
    let dashboard = load_dashboard();
    let record = dashboard.collect(&specimen()).unwrap();
    let row = dashboard.pipeline().encode(&record).unwrap();
    let adapter = ExplanationAdapter::new(
        dashboard.pipeline(),
        dashboard.profile(),
        dashboard.reference(),
        &dashboard.config().explain,
    );

    let mut group = c.benchmark_group("anchor_search");
    group.sample_size(20);

    for threshold in [0.80, 0.90, 0.95].iter() {
        let request = ExplainRequest {
            threshold: *threshold,
        };
        group.bench_with_input(
            BenchmarkId::new("threshold", threshold),
            &request,
            |b, request| b.iter(|| black_box(adapter.rule(&row, request))),
        );
    }

    group.finish();
}

/// Benchmark collect, predict and explain for one submitted form.
fn bench_request_cycle(c: &mut Criterion) {
    let dashboard = load_dashboard();
    let values = specimen();
    let request = dashboard.default_request();

    let mut group = c.benchmark_group("request_cycle");
    group.sample_size(20);
    group.bench_function("handle", |b| {
        b.iter(|| black_box(dashboard.handle(black_box(&values), &request)))
    });
    group.bench_function("predict_only", |b| {
        b.iter(|| {
            let record = dashboard.collect(&values).unwrap();
            black_box(dashboard.predict(&record).unwrap())
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_tree_shap,
    bench_anchor_search,
    bench_request_cycle,
);
criterion_main!(benches);
