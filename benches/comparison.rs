use criterion::{criterion_group, criterion_main, Criterion};
use pimms::metrics::percentile_rank_comparison;
use pimms::prelude::*;
use pimms::test_utilities::{random_comparison_pair, random_gff, temp_tsv, NRANDOM_FEATURES};

const NFEATURES: usize = 10 * NRANDOM_FEATURES;
const NINSERTS: usize = 1_000_000;

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    let (control, test) = random_comparison_pair(NFEATURES, 4, 1).unwrap();
    group.sample_size(10);

    group.bench_function("merge_add_suffix", |b| {
        b.iter(|| {
            let merged =
                merge_add_suffix(&control, &test, &KEY_COLUMNS, "_control", "_test").unwrap();
            merged.nrows()
        });
    });

    // reading and merging the files, as the compare command does
    let control_file = temp_tsv(&control).unwrap();
    let test_file = temp_tsv(&test).unwrap();
    group.bench_function("load", |b| {
        b.iter(|| {
            let comparison = ComparisonTable::load(control_file.path(), test_file.path()).unwrap();
            comparison.len()
        });
    });
    group.finish();
}

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    let (control, test) = random_comparison_pair(NFEATURES, 0, 2).unwrap();
    let comparison = ComparisonTable::from_tables(&control, &test, ComparisonConfig::default())
        .unwrap();
    let test_scores = test.numeric_column("Blood_Output_NIM_score").unwrap();
    let control_scores = control.numeric_column("Media_Input_NIM_score").unwrap();
    group.sample_size(10);

    group.bench_function("percentile_rank_comparison", |b| {
        b.iter(|| percentile_rank_comparison(&test_scores, &control_scores).unwrap());
    });

    group.bench_function("derive_default_metrics", |b| {
        b.iter(|| {
            let mut comparison = comparison.clone();
            comparison.derive_default_metrics().unwrap();
            comparison.comparison_columns().len()
        });
    });

    group.bench_function("get_projection", |b| {
        let mut comparison = comparison.clone();
        comparison.derive_default_metrics().unwrap();
        b.iter(|| comparison.get_projection(true, &MetricSelection::All).unwrap());
    });
    group.finish();
}

fn bench_insertion_density(c: &mut Criterion) {
    let mut group = c.benchmark_group("gff");
    let gff = random_gff(NINSERTS, 4_641_652, 3);
    group.sample_size(10);

    group.bench_function("insertion_density", |b| {
        b.iter(|| gff.insertion_density().len());
    });
    group.bench_function("density_histogram", |b| {
        b.iter(|| gff.density_histogram(1.0).unwrap().len());
    });
    group.finish();
}

criterion_group!(benches, bench_merge, bench_metrics, bench_insertion_density);
criterion_main!(benches);
