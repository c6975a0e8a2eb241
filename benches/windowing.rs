use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use deapwin::{Dataset, DatasetConfig, SubjectRecord, WindowedDataset};
use ndarray::{Array2, Array3};

/// One DEAP-sized subject: 40 trials × 40 channels × 8064 samples.
fn subject() -> SubjectRecord {
    let data = Array3::from_shape_fn((40, 40, 8064), |(tr, c, t)| {
        ((tr * 31 + c * 7 + t) as f32 * 0.01).sin()
    });
    let labels = Array2::from_shape_fn((40, 4), |(tr, a)| 1.0 + ((tr + a) % 9) as f32);
    SubjectRecord { data, labels }
}

fn bench_window_single(c: &mut Criterion) {
    let rec = subject();
    let cfg = DatasetConfig { subject_list: vec![0], ..DatasetConfig::default() };
    c.bench_function("from_records 1 subject, num_seq=0", |b| {
        b.iter(|| {
            let ds = WindowedDataset::from_records([Ok(rec.clone())], black_box(&cfg)).unwrap();
            black_box(ds.len())
        })
    });
}

fn bench_window_grouped(c: &mut Criterion) {
    let rec = subject();
    let cfg = DatasetConfig { num_seq: 10, subject_list: vec![0], ..DatasetConfig::default() };
    c.bench_function("from_records 1 subject, num_seq=10", |b| {
        b.iter(|| {
            let ds = WindowedDataset::from_records([Ok(rec.clone())], black_box(&cfg)).unwrap();
            black_box(ds.len())
        })
    });
}

fn bench_get(c: &mut Criterion) {
    let cfg = DatasetConfig { num_seq: 10, ..DatasetConfig::default() };
    let ds = WindowedDataset::from_records([Ok(subject())], &cfg).unwrap();
    c.bench_function("get [10, 32, 128]", |b| {
        b.iter(|| {
            let s = ds.get(black_box(17)).unwrap();
            black_box(s.label[0])
        })
    });
}

criterion_group!(benches, bench_window_single, bench_window_grouped, bench_get);
criterion_main!(benches);
