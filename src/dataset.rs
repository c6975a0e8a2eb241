//! Windowed multi-subject dataset.
//!
//! [`WindowedDataset::build`] reads every selected subject file, cuts each
//! trial into one-second windows (see [`crate::window`]), optionally groups
//! them into sequences and concatenates everything into one in-memory array
//! pair.  The result is immutable and can be shared between loader threads.
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{s, Array1, Array3, Array4, ArrayD, Axis};

use crate::config::DatasetConfig;
use crate::error::DatasetError;
use crate::io::{list_subject_files, SubjectRecord};
use crate::window::window_subject;

// ── Dataset contract ──────────────────────────────────────────────────────

/// An indexed collection of samples.
///
/// Implementations must be `Send + Sync` so loaders can read from multiple
/// threads.
pub trait Dataset: Send + Sync {
    type Item;

    /// Total number of samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve the sample at position `index`.
    fn get(&self, index: usize) -> Result<Self::Item>;
}

/// Function applied to every signal before it is handed out.
pub trait Transform: Send + Sync {
    fn apply(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>>;
}

impl<F> Transform for F
where
    F: Fn(ArrayD<f32>) -> ArrayD<f32> + Send + Sync,
{
    fn apply(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        Ok(self(x))
    }
}

/// One dataset item.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// `[C, fs]` without grouping, `[num_seq, C, fs]` with grouping.
    pub signal: ArrayD<f32>,
    /// One binarized class (0 or 1) per group position.
    pub label: Array1<i64>,
}

/// Input discarded while windowing, summed over every trial of a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dropped {
    /// Samples past the last full second of a trial.
    pub samples: usize,
    /// Whole windows past the last full sequence group of a trial.
    pub windows: usize,
}

impl Dropped {
    pub fn is_empty(&self) -> bool {
        self.samples == 0 && self.windows == 0
    }
}

impl std::ops::AddAssign for Dropped {
    fn add_assign(&mut self, rhs: Self) {
        self.samples += rhs.samples;
        self.windows += rhs.windows;
    }
}

// ── WindowedDataset ───────────────────────────────────────────────────────

pub struct WindowedDataset {
    /// [N, group_len, C, fs]; `group_len == 1` when grouping is disabled.
    data: Array4<f32>,
    /// [N, group_len, A] raw ratings.
    labels: Array3<f32>,
    grouped: bool,
    label_dim: usize,
    label_threshold: f32,
    dropped: Dropped,
    transform: Option<Box<dyn Transform>>,
}

impl fmt::Debug for WindowedDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowedDataset")
            .field("data", &self.data.shape())
            .field("labels", &self.labels.shape())
            .field("grouped", &self.grouped)
            .field("label_dim", &self.label_dim)
            .field("label_threshold", &self.label_threshold)
            .field("dropped", &self.dropped)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl WindowedDataset {
    /// Load the subjects in `cfg.subject_list` from `data_path`.
    ///
    /// `data_path` must contain exactly `cfg.num_subjects` regular files; the
    /// subject list indexes into their name-sorted listing.
    ///
    /// # Errors
    /// * [`DatasetError::SubjectCount`] when the file count is wrong.
    /// * [`DatasetError::SubjectIndex`] for an index past the listing.
    /// * Any read or shape error from a subject file; one bad file aborts
    ///   the whole build.
    pub fn build(data_path: impl AsRef<Path>, cfg: &DatasetConfig) -> Result<Self> {
        let dir = data_path.as_ref();
        let files = list_subject_files(dir)?;
        if files.len() != cfg.num_subjects {
            return Err(DatasetError::SubjectCount {
                dir: dir.to_path_buf(),
                expected: cfg.num_subjects,
                found: files.len(),
            }
            .into());
        }
        cfg.check_subjects(files.len())?;

        let records = cfg.subject_list.iter().map(|&i| {
            let path = &files[i];
            tracing::debug!(subject = i, file = %path.display(), "loading subject");
            SubjectRecord::load(path).with_context(|| format!("subject {i}"))
        });
        Self::from_records(records, cfg)
    }

    /// Build from records already in memory, in iteration order.
    pub fn from_records<I>(records: I, cfg: &DatasetConfig) -> Result<Self>
    where
        I: IntoIterator<Item = Result<SubjectRecord>>,
    {
        let mut all_data = Vec::new();
        let mut all_labels = Vec::new();
        let mut dropped = Dropped::default();

        for (k, record) in records.into_iter().enumerate() {
            let record = record?;
            let n_attr = record.labels.ncols();
            if cfg.label_dim >= n_attr {
                return Err(DatasetError::LabelDim { label_dim: cfg.label_dim, n_attributes: n_attr }.into());
            }

            let fs = cfg.sampling_rate.max(1);
            let n_sec = record.n_times() / fs;
            let subject_dropped = Dropped {
                samples: record.n_trials() * (record.n_times() - n_sec * fs),
                windows: match cfg.num_seq {
                    0 => 0,
                    n => record.n_trials() * (n_sec % n),
                },
            };
            if !subject_dropped.is_empty() {
                tracing::debug!(
                    subject = k,
                    samples = subject_dropped.samples,
                    windows = subject_dropped.windows,
                    "trailing samples or windows dropped"
                );
            }
            dropped += subject_dropped;

            let (data, labels) = window_subject(
                record.data.view(),
                record.labels.view(),
                cfg.modal,
                cfg.sampling_rate,
                cfg.num_seq,
            )
            .with_context(|| format!("windowing subject {k}"))?;

            tracing::debug!(
                subject = k,
                trials = record.n_trials(),
                windows = n_sec,
                samples = data.shape()[0],
                "subject windowed"
            );
            all_data.push(data);
            all_labels.push(labels);
        }

        let (data, labels) = if all_data.is_empty() {
            (
                Array4::zeros((0, cfg.group_len(), 0, cfg.sampling_rate)),
                Array3::zeros((0, cfg.group_len(), 0)),
            )
        } else {
            let data_views: Vec<_> = all_data.iter().map(|a| a.view()).collect();
            let label_views: Vec<_> = all_labels.iter().map(|a| a.view()).collect();
            (
                ndarray::concatenate(Axis(0), &data_views)
                    .map_err(|e| DatasetError::Shape(format!("subjects disagree on sample shape: {e}")))?,
                ndarray::concatenate(Axis(0), &label_views)
                    .map_err(|e| DatasetError::Shape(format!("subjects disagree on label shape: {e}")))?,
            )
        };

        if !dropped.is_empty() {
            tracing::warn!(
                samples = dropped.samples,
                windows = dropped.windows,
                sampling_rate = cfg.sampling_rate,
                num_seq = cfg.num_seq,
                "trials do not divide evenly; trailing data dropped"
            );
        }
        tracing::info!(
            subjects = all_data.len(),
            samples = data.shape()[0],
            shape = ?&data.shape()[1..],
            modal = %cfg.modal,
            num_seq = cfg.num_seq,
            "dataset built"
        );

        Ok(Self {
            data,
            labels,
            grouped: cfg.num_seq > 0,
            label_dim: cfg.label_dim,
            label_threshold: cfg.label_threshold,
            dropped,
            transform: None,
        })
    }

    /// Attach a transform applied to every returned signal.
    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Number of channels of the stored signal.
    pub fn channels(&self) -> usize {
        self.data.shape()[2]
    }

    /// Shape of one returned signal (before any transform).
    pub fn sample_shape(&self) -> Vec<usize> {
        let s = self.data.shape();
        if self.grouped { s[1..].to_vec() } else { s[2..].to_vec() }
    }

    /// Trailing samples and windows discarded during the build.
    pub fn dropped(&self) -> Dropped {
        self.dropped
    }

    /// All stored samples, `[N, group_len, C, fs]`.
    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    /// All raw ratings, `[N, group_len, A]`.
    pub fn raw_labels(&self) -> &Array3<f32> {
        &self.labels
    }

    /// Binarized labels of sample `index` for the configured attribute.
    pub fn label(&self, index: usize) -> Result<Array1<i64>> {
        self.check_index(index)?;
        let threshold = self.label_threshold;
        Ok(self
            .labels
            .slice(s![index, .., self.label_dim])
            .mapv(|v| if v >= threshold { 1_i64 } else { 0_i64 }))
    }

    /// Count of class-1 entries over every sample and group position.
    pub fn positive_count(&self) -> usize {
        let threshold = self.label_threshold;
        self.labels
            .slice(s![.., .., self.label_dim])
            .iter()
            .filter(|&&v| v >= threshold)
            .count()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.data.shape()[0];
        if index >= len {
            return Err(DatasetError::IndexOutOfRange { index, len }.into());
        }
        Ok(())
    }
}

impl Dataset for WindowedDataset {
    type Item = Sample;

    fn len(&self) -> usize {
        self.data.shape()[0]
    }

    fn get(&self, index: usize) -> Result<Sample> {
        self.check_index(index)?;
        let signal = if self.grouped {
            self.data.slice(s![index, .., .., ..]).to_owned().into_dyn()
        } else {
            self.data.slice(s![index, 0, .., ..]).to_owned().into_dyn()
        };
        let signal = match &self.transform {
            Some(t) => t.apply(signal)?,
            None => signal,
        };
        Ok(Sample { signal, label: self.label(index)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Modality;
    use ndarray::{Array2, Array3};

    fn record(n_tr: usize, n_ch: usize, n_t: usize, rating: f32) -> Result<SubjectRecord> {
        SubjectRecord::new(
            Array3::from_shape_fn((n_tr, n_ch, n_t), |(tr, c, t)| (tr * 10_000 + c * 100 + t) as f32),
            Array2::from_elem((n_tr, 4), rating),
        )
    }

    fn cfg(num_seq: usize) -> DatasetConfig {
        DatasetConfig { num_seq, sampling_rate: 8, ..DatasetConfig::default() }
    }

    #[test]
    fn single_windows_without_grouping() {
        let ds = WindowedDataset::from_records(vec![record(1, 40, 16, 7.0)], &cfg(0)).unwrap();
        assert_eq!(ds.len(), 2);
        let s = ds.get(1).unwrap();
        assert_eq!(s.signal.shape(), &[32, 8]);
        assert_eq!(s.label.to_vec(), vec![1]);
        assert_eq!(ds.channels(), 32);
    }

    #[test]
    fn grouped_sample_shape() {
        let ds = WindowedDataset::from_records(vec![record(1, 40, 16, 2.0)], &cfg(2)).unwrap();
        assert_eq!(ds.len(), 1);
        let s = ds.get(0).unwrap();
        assert_eq!(s.signal.shape(), &[2, 32, 8]);
        assert_eq!(s.label.to_vec(), vec![0, 0]);
    }

    #[test]
    fn label_dim_past_attributes_is_rejected() {
        let c = DatasetConfig { label_dim: 4, ..cfg(0) };
        let err = WindowedDataset::from_records(vec![record(1, 40, 16, 5.0)], &c).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::LabelDim { label_dim: 4, n_attributes: 4 })
        ));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let ds = WindowedDataset::from_records(vec![record(1, 40, 16, 5.0)], &cfg(0)).unwrap();
        assert!(ds.get(2).is_err());
    }

    #[test]
    fn dropped_input_is_summed_over_trials_and_subjects() {
        // 3 trials × 21 samples at 8 Hz: 2 windows + 5 samples per trial.
        let records = vec![record(3, 40, 21, 5.0), record(3, 40, 21, 5.0)];
        let ds = WindowedDataset::from_records(records, &cfg(0)).unwrap();
        assert_eq!(ds.dropped(), Dropped { samples: 2 * 3 * 5, windows: 0 });

        let records = vec![record(3, 40, 5 * 8, 5.0), record(2, 40, 5 * 8, 5.0)];
        let ds = WindowedDataset::from_records(records, &cfg(2)).unwrap();
        assert_eq!(ds.dropped(), Dropped { samples: 0, windows: 5 });
        assert_eq!(ds.len(), 5 * 2);

        let ds = WindowedDataset::from_records(vec![record(1, 40, 16, 5.0)], &cfg(2)).unwrap();
        assert!(ds.dropped().is_empty());
    }

    #[test]
    fn empty_subject_list_gives_empty_dataset() {
        let ds = WindowedDataset::from_records(Vec::new(), &cfg(3)).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.sample_shape(), vec![3, 0, 8]);
    }

    #[test]
    fn closure_transform_is_applied() {
        let ds = WindowedDataset::from_records(vec![record(1, 40, 8, 5.0)], &cfg(0))
            .unwrap()
            .with_transform(|x: ArrayD<f32>| x.mapv(|v| v * 0.0 + 1.0));
        let s = ds.get(0).unwrap();
        assert!(s.signal.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn emg_keeps_trailing_channels() {
        let c = DatasetConfig { modal: Modality::Emg, ..cfg(0) };
        let ds = WindowedDataset::from_records(vec![record(2, 40, 8, 5.0)], &c).unwrap();
        assert_eq!(ds.channels(), 4);
        assert_eq!(ds.get(1).unwrap().signal[[0, 0]], (10_000 + 3600) as f32);
    }
}
