//! Trial windowing.
//!
//! Each step is a pure function with explicit input and output shapes:
//!
//! ```text
//! [trial, channel, time]
//!   │  select_channels(modal)
//!   ▼
//! [trial, C, time]
//!   │  split_seconds(fs)           trailing partial second dropped
//!   ▼
//! [trial, n_sec, C, fs]
//!   │  group_windows(num_seq)      trailing partial group dropped
//!   ▼
//! [trial, n_groups, group_len, C, fs]          labels: broadcast_labels
//!   │  flatten_trials
//!   ▼
//! [trial·n_groups, group_len, C, fs]
//! ```
//!
//! With `num_seq == 0` every window is its own group: `n_groups = n_sec`,
//! `group_len = 1`.
use anyhow::Result;
use ndarray::{s, Array3, Array4, Array5, ArrayView2, ArrayView3, Axis};

use crate::config::Modality;
use crate::error::DatasetError;

/// Keep only the channels belonging to `modal`.
pub fn select_channels(data: ArrayView3<'_, f32>, modal: Modality) -> Result<ArrayView3<'_, f32>> {
    let range = modal.channel_range(data.shape()[1])?;
    Ok(data.slice_move(s![.., range, ..]))
}

/// Cut every trial into consecutive one-second windows.
///
/// `data`: [trial, C, T]  →  [trial, T / fs, C, fs].
/// Samples past the last full second are discarded.
pub fn split_seconds(data: ArrayView3<'_, f32>, sampling_rate: usize) -> Result<Array4<f32>> {
    if sampling_rate == 0 {
        return Err(DatasetError::Shape("sampling rate must be positive".into()).into());
    }
    let (n_tr, n_ch, n_t) = data.dim();
    let n_sec = n_t / sampling_rate;

    let mut out = Array4::<f32>::zeros((n_tr, n_sec, n_ch, sampling_rate));
    for sec in 0..n_sec {
        let start = sec * sampling_rate;
        out.slice_mut(s![.., sec, .., ..])
           .assign(&data.slice(s![.., .., start..start + sampling_rate]));
    }
    Ok(out)
}

/// Group consecutive windows of each trial.
///
/// `windows`: [trial, n_sec, C, fs]  →  [trial, n_groups, group_len, C, fs]
/// where `group_len = max(num_seq, 1)` and `n_groups = n_sec / group_len`.
/// Windows that do not fill a whole group are discarded.
pub fn group_windows(windows: Array4<f32>, num_seq: usize) -> Result<Array5<f32>> {
    if num_seq == 0 {
        return Ok(windows.insert_axis(Axis(2)));
    }
    let (n_tr, n_sec, n_ch, n_t) = windows.dim();
    let n_groups = n_sec / num_seq;

    let mut out = Array5::<f32>::zeros((n_tr, n_groups, num_seq, n_ch, n_t));
    for g in 0..n_groups {
        let start = g * num_seq;
        out.slice_mut(s![.., g, .., .., ..])
           .assign(&windows.slice(s![.., start..start + num_seq, .., ..]));
    }
    Ok(out)
}

/// Repeat each trial's label row over every group and group position.
///
/// `labels`: [trial, A]  →  [trial, n_groups, group_len, A].
/// Values are copied unchanged.
pub fn broadcast_labels(
    labels: ArrayView2<'_, f32>,
    n_groups: usize,
    group_len: usize,
) -> Array4<f32> {
    let (n_tr, n_attr) = labels.dim();
    Array4::from_shape_fn((n_tr, n_groups, group_len, n_attr), |(tr, _, _, a)| labels[[tr, a]])
}

/// Merge the trial and group axes into a single sample axis.
///
/// Returns `(signal [N, group_len, C, fs], labels [N, group_len, A])`.
pub fn flatten_trials(groups: Array5<f32>, labels: Array4<f32>) -> Result<(Array4<f32>, Array3<f32>)> {
    let (n_tr, n_groups, group_len, n_ch, n_t) = groups.dim();
    let (l_tr, l_groups, l_len, n_attr) = labels.dim();
    if (n_tr, n_groups, group_len) != (l_tr, l_groups, l_len) {
        return Err(DatasetError::Shape(format!(
            "signal groups {:?} do not match label groups {:?}",
            (n_tr, n_groups, group_len),
            (l_tr, l_groups, l_len),
        ))
        .into());
    }
    let n = n_tr * n_groups;
    let signal = groups
        .as_standard_layout()
        .into_owned()
        .into_shape((n, group_len, n_ch, n_t))?;
    let labels = labels
        .as_standard_layout()
        .into_owned()
        .into_shape((n, group_len, n_attr))?;
    Ok((signal, labels))
}

/// Number of samples one trial of `n_times` samples yields.
///
/// ```
/// use deapwin::window::samples_per_trial;
/// assert_eq!(samples_per_trial(8064, 128, 0), 63);
/// assert_eq!(samples_per_trial(8064, 128, 10), 6);
/// ```
pub fn samples_per_trial(n_times: usize, sampling_rate: usize, num_seq: usize) -> usize {
    if sampling_rate == 0 {
        return 0;
    }
    (n_times / sampling_rate) / num_seq.max(1)
}

/// Run every step for one subject's arrays.
///
/// `data`: [trial, channel, time], `labels`: [trial, A].
pub fn window_subject(
    data: ArrayView3<'_, f32>,
    labels: ArrayView2<'_, f32>,
    modal: Modality,
    sampling_rate: usize,
    num_seq: usize,
) -> Result<(Array4<f32>, Array3<f32>)> {
    if data.shape()[0] != labels.nrows() {
        return Err(DatasetError::Shape(format!(
            "signal has {} trials but labels have {} rows",
            data.shape()[0],
            labels.nrows()
        ))
        .into());
    }
    let selected = select_channels(data, modal)?;
    let windows = split_seconds(selected, sampling_rate)?;
    let groups = group_windows(windows, num_seq)?;
    let (_, n_groups, group_len, _, _) = groups.dim();
    let labels = broadcast_labels(labels, n_groups, group_len);
    flatten_trials(groups, labels)
}
