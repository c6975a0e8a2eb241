//! Error types for dataset construction and metric evaluation.
//!
//! Library functions return [`anyhow::Result`]; the variants below are the
//! domain failures wrapped inside it, so callers can recover the precise cause
//! with `err.downcast_ref::<DatasetError>()`.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DatasetError {
    #[error("expected {expected} subject files in {dir}, found {found}")]
    SubjectCount {
        dir: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("unknown modality '{0}' (expected one of: eeg, eog, emg)")]
    UnknownModality(String),

    #[error("subject index {index} out of range for {available} subject files")]
    SubjectIndex { index: usize, available: usize },

    #[error("label dimension {label_dim} out of range for {n_attributes} label attributes")]
    LabelDim { label_dim: usize, n_attributes: usize },

    #[error("missing field '{field}' in {path}")]
    MissingField { field: String, path: PathBuf },

    #[error("unsupported subject file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("sample index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("top-k list must contain at least one k")]
    EmptyTopK,
}
