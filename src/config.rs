//! Dataset and learning-rate schedule configuration.
//!
//! [`DatasetConfig`] holds every tunable parameter of the windowed dataset
//! builder.  All fields have defaults matching the DEAP preprocessed release
//! (32 subjects, 128 Hz, 40 physiological channels).
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// Number of EEG channels at the start of the channel axis.
pub const N_EEG_CHANNELS: usize = 32;

/// Number of EOG channels following the EEG block.
pub const N_EOG_CHANNELS: usize = 4;

/// Channel-range partition of a subject recording.
///
/// | modality | channels        |
/// |----------|-----------------|
/// | `Eeg`    | `[0, 32)`       |
/// | `Eog`    | `[32, 36)`      |
/// | `Emg`    | `[36, n_chan)`  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    #[default]
    Eeg,
    Eog,
    Emg,
}

impl Modality {
    /// Channel index range of this modality in a recording with `n_chan`
    /// channels.
    ///
    /// Returns [`DatasetError::Shape`] when the recording does not contain
    /// the whole range (or, for EMG, contains no channel past the EOG block).
    pub fn channel_range(self, n_chan: usize) -> Result<Range<usize>, DatasetError> {
        let eog_end = N_EEG_CHANNELS + N_EOG_CHANNELS;
        let range = match self {
            Modality::Eeg => 0..N_EEG_CHANNELS,
            Modality::Eog => N_EEG_CHANNELS..eog_end,
            Modality::Emg => eog_end..n_chan.max(eog_end),
        };
        if range.is_empty() || range.end > n_chan {
            return Err(DatasetError::Shape(format!(
                "{self} needs channels {}..{} but the recording has {n_chan}",
                range.start,
                range.end.max(range.start + 1),
            )));
        }
        Ok(range)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Modality::Eeg => "eeg",
            Modality::Eog => "eog",
            Modality::Emg => "emg",
        })
    }
}

impl FromStr for Modality {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eeg" => Ok(Modality::Eeg),
            "eog" => Ok(Modality::Eog),
            "emg" => Ok(Modality::Emg),
            _ => Err(DatasetError::UnknownModality(s.to_string())),
        }
    }
}

/// Configuration of the windowed dataset builder.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use deapwin::{DatasetConfig, Modality};
///
/// let cfg = DatasetConfig {
///     num_seq:      10,              // sequences of ten 1 s windows
///     subject_list: (0..24).collect(),
///     modal:        Modality::Eog,
///     ..DatasetConfig::default()
/// };
/// assert_eq!(cfg.label_dim, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Number of consecutive windows per sequence group.
    ///
    /// `0` disables grouping: each sample is a single `[C, fs]` window.
    /// Otherwise each sample is `[num_seq, C, fs]` and windows that do not
    /// fill a complete group at the end of a trial are discarded.
    ///
    /// Default: `0`.
    pub num_seq: usize,

    /// Indices into the sorted subject-file listing, in output order.
    ///
    /// Default: all subjects `0..32`.
    pub subject_list: Vec<usize>,

    /// Label attribute used for binarization
    /// (0 = valence, 1 = arousal, 2 = dominance, 3 = liking).
    ///
    /// Default: `0`.
    pub label_dim: usize,

    /// Channel group to keep.
    ///
    /// Default: [`Modality::Eeg`].
    pub modal: Modality,

    /// Samples per second; also the length of one window.
    ///
    /// Default: `128`.
    pub sampling_rate: usize,

    /// Exact number of subject files the data directory must contain.
    ///
    /// Default: `32`.
    pub num_subjects: usize,

    /// Ratings at or above this value map to class 1, below it to class 0.
    ///
    /// Default: `5.0`.
    pub label_threshold: f32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            num_seq: 0,
            subject_list: (0..32).collect(),
            label_dim: 0,
            modal: Modality::Eeg,
            sampling_rate: 128,
            num_subjects: 32,
            label_threshold: 5.0,
        }
    }
}

impl DatasetConfig {
    /// Length of the grouping axis of every stored sample
    /// (`1` when grouping is disabled).
    ///
    /// ```
    /// use deapwin::DatasetConfig;
    /// assert_eq!(DatasetConfig::default().group_len(), 1);
    /// ```
    pub fn group_len(&self) -> usize {
        self.num_seq.max(1)
    }

    /// Check that every subject index refers to one of `available` files.
    pub fn check_subjects(&self, available: usize) -> Result<(), DatasetError> {
        match self.subject_list.iter().find(|&&i| i >= available) {
            Some(&index) => Err(DatasetError::SubjectIndex { index, available }),
            None => Ok(()),
        }
    }
}

/// Learning-rate schedule settings, mirroring the training script's
/// `--cos` / `--lr-schedule` flags.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Use cosine decay over the whole run instead of step decay.
    pub cos: bool,

    /// Epochs at which the step schedule multiplies the rate by 0.1.
    pub lr_schedule: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modality_parses_case_insensitively() {
        assert_eq!("EEG".parse::<Modality>().unwrap(), Modality::Eeg);
        assert_eq!(" eog".parse::<Modality>().unwrap(), Modality::Eog);
        assert_eq!("emg".parse::<Modality>().unwrap(), Modality::Emg);
    }

    #[test]
    fn unknown_modality_is_rejected() {
        let err = "ecg".parse::<Modality>().unwrap_err();
        assert_eq!(err, DatasetError::UnknownModality("ecg".into()));
    }

    #[test]
    fn channel_ranges_for_deap_layout() {
        assert_eq!(Modality::Eeg.channel_range(40).unwrap(), 0..32);
        assert_eq!(Modality::Eog.channel_range(40).unwrap(), 32..36);
        assert_eq!(Modality::Emg.channel_range(40).unwrap(), 36..40);
    }

    #[test]
    fn channel_range_needs_enough_channels() {
        assert!(Modality::Eeg.channel_range(31).is_err());
        assert!(Modality::Eog.channel_range(35).is_err());
        assert!(Modality::Emg.channel_range(36).is_err());
    }

    #[test]
    fn subject_indices_are_checked() {
        let cfg = DatasetConfig { subject_list: vec![0, 5, 40], ..DatasetConfig::default() };
        assert_eq!(
            cfg.check_subjects(32),
            Err(DatasetError::SubjectIndex { index: 40, available: 32 })
        );
        assert!(DatasetConfig::default().check_subjects(32).is_ok());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: DatasetConfig =
            serde_json::from_str(r#"{ "num_seq": 4, "modal": "emg" }"#).unwrap();
        assert_eq!(cfg.num_seq, 4);
        assert_eq!(cfg.modal, Modality::Emg);
        assert_eq!(cfg.sampling_rate, 128);
        assert_eq!(cfg.subject_list.len(), 32);
    }
}
