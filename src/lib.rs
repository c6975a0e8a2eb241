//! # deapwin: windowed affect datasets for physiological-signal models
//!
//! `deapwin` turns a directory of per-subject recordings (DEAP layout:
//! 40 trials × 40 channels × 8064 samples at 128 Hz, plus 4 ratings per
//! trial) into a flat, indexable collection of one-second windows with
//! binarized labels, and provides the diagnostics a training loop needs.
//!
//! ## Pipeline overview
//!
//! ```text
//! s01.mat … s32.mat            (or .safetensors)
//!   │
//!   ├─ io::list_subject_files()   exactly 32 files, name-sorted
//!   ├─ subject_list               pick subjects (train / val / test split)
//!   ├─ window::select_channels    eeg [0,32) · eog [32,36) · emg [36,..)
//!   ├─ window::split_seconds      [trial, sec, C, fs]   partial second dropped
//!   ├─ window::group_windows      num_seq windows / sample, remainder dropped
//!   ├─ window::broadcast_labels   trial ratings repeated per window
//!   └─ concatenate subjects
//!        │
//!        └─→ WindowedDataset::get(i) → ([C, fs] or [num_seq, C, fs] f32,
//!                                        [group_len] i64 with rating ≥ 5 → 1)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use deapwin::{Dataset, DatasetConfig, Modality, WindowedDataset};
//!
//! let cfg = DatasetConfig {
//!     num_seq:      10,
//!     subject_list: (0..28).collect(),
//!     label_dim:    1,                 // arousal
//!     modal:        Modality::Eeg,
//!     ..DatasetConfig::default()
//! };
//! let train = WindowedDataset::build("data/deap/data_preprocessed_matlab", &cfg).unwrap();
//!
//! let sample = train.get(0).unwrap();
//! println!("{} samples, first {:?}", train.len(), sample.signal.shape());
//! ```
//!
//! ## Diagnostics
//!
//! ```
//! use deapwin::metrics::{get_performance, logits_accuracy};
//! use ndarray::array;
//!
//! let scores = array![[2.0, -1.0], [0.5, 1.5], [0.1, 0.0]];
//! let labels = [0, 1, 1];
//!
//! let top1 = logits_accuracy(scores.view(), &labels, &[1]).unwrap();
//! assert!((top1[0] - 200.0 / 3.0).abs() < 1e-9);
//!
//! let perf = get_performance(scores.view(), &labels).unwrap();
//! println!("{perf}");
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod io;
pub mod metrics;
pub mod normalize;
pub mod schedule;
pub mod window;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{DatasetConfig, Modality, ScheduleConfig};

// dataset
pub use dataset::{Dataset, Dropped, Sample, Transform, WindowedDataset};

// error
pub use error::DatasetError;

// io
pub use io::{list_subject_files, StWriter, SubjectRecord};

// metrics
pub use metrics::{get_performance, logits_accuracy, mask_accuracy, Performance};

// normalize
pub use normalize::{tackle_denominator, tensor_standardize, Standardize, EPS};

// schedule
pub use schedule::{adjust_learning_rate, OptimizerState, ParamGroup};

// window
pub use window::{samples_per_trial, window_subject};
