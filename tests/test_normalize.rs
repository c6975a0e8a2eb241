mod common;
use common::subject_record;
use deapwin::normalize::{tensor_standardize, EPS};
use deapwin::{Dataset, DatasetConfig, WindowedDataset};
use ndarray::{Array3, Axis};

fn lane_stats(x: &Array3<f32>, axis: usize) -> Vec<(f64, f64)> {
    x.lanes(Axis(axis))
        .into_iter()
        .map(|lane| {
            let n = lane.len() as f64;
            let m = lane.iter().map(|&v| v as f64).sum::<f64>() / n;
            let s = (lane.iter().map(|&v| (v as f64 - m).powi(2)).sum::<f64>() / n).sqrt();
            (m, s)
        })
        .collect()
}

#[test]
fn standardize_twice_is_a_fixed_point() {
    let x = Array3::from_shape_fn((4, 6, 128), |(a, c, t)| {
        ((a * 13 + c * 5) as f32 + t as f32 * 0.21).cos() * (1.0 + c as f32) + a as f32
    });
    let once = tensor_standardize(&x, -1).unwrap();
    let twice = tensor_standardize(&once, -1).unwrap();

    for (m, s) in lane_stats(&twice, 2) {
        approx::assert_abs_diff_eq!(m, 0.0, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(s, 1.0, epsilon = 1e-3);
    }
    for (a, b) in once.iter().zip(twice.iter()) {
        approx::assert_abs_diff_eq!(*a, *b, epsilon = 1e-3_f32);
    }
}

#[test]
fn zero_std_lanes_stay_zero_instead_of_nan() {
    let mut x = Array3::from_shape_fn((2, 3, 16), |(_, _, t)| t as f32);
    x.slice_mut(ndarray::s![1, 2, ..]).fill(-4.0);
    let y = tensor_standardize(&tensor_standardize(&x, 2).unwrap(), 2).unwrap();

    assert!(y.iter().all(|v| v.is_finite()));
    assert!(y.slice(ndarray::s![1, 2, ..]).iter().all(|&v| v == 0.0));
    for (i, (m, s)) in lane_stats(&y, 2).into_iter().enumerate() {
        approx::assert_abs_diff_eq!(m, 0.0, epsilon = 1e-6);
        if i != 5 {
            approx::assert_abs_diff_eq!(s, 1.0, epsilon = 1e-4);
        }
    }
    assert!(EPS > 0.0);
}

#[test]
fn standardize_along_channels_of_a_dataset_sample() {
    let cfg = DatasetConfig { sampling_rate: 16, ..DatasetConfig::default() };
    let rec = subject_record(1, 1, 40, 32);
    let ds = WindowedDataset::from_records([Ok(rec)], &cfg).unwrap();
    let x = ds.get(0).unwrap().signal;
    let y = tensor_standardize(&x, 0).unwrap();
    assert_eq!(y.shape(), x.shape());
    for t in 0..16 {
        let col = y.slice(ndarray::s![.., t]);
        approx::assert_abs_diff_eq!(col.sum() / 32.0, 0.0, epsilon = 1e-4_f32);
    }
}
