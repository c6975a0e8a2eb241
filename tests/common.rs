/// Shared helpers: synthetic subject directories in a scratch location.
use deapwin::SubjectRecord;
use ndarray::{Array2, Array3};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Directory removed again on drop.
pub struct ScratchDir(PathBuf);

impl ScratchDir {
    pub fn new(tag: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir()
            .join(format!("deapwin-{tag}-{}-{n}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        ScratchDir(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Encodes position so windows can be traced back:
/// value = subject·100 000 + trial·10 000 + channel·100 + time
/// (trial < 10, channel < 100, time < 100; exact in f32).
#[allow(unused)]
pub fn signal_value(subject: usize, trial: usize, channel: usize, time: usize) -> f32 {
    (subject * 100_000 + trial * 10_000 + channel * 100 + time) as f32
}

/// Ratings of `trial` for `subject`: attribute `a` alternates around 5.
#[allow(unused)]
pub fn rating(subject: usize, trial: usize, attr: usize) -> f32 {
    1.0 + ((subject + trial * 3 + attr * 2) % 9) as f32
}

#[allow(unused)]
pub fn subject_record(subject: usize, n_trials: usize, n_channels: usize, n_times: usize) -> SubjectRecord {
    let data = Array3::from_shape_fn((n_trials, n_channels, n_times), |(tr, c, t)| {
        signal_value(subject, tr, c, t)
    });
    let labels = Array2::from_shape_fn((n_trials, 4), |(tr, a)| rating(subject, tr, a));
    SubjectRecord::new(data, labels).unwrap()
}

/// Write `n_subjects` files `s00.safetensors`, `s01.safetensors`, …
#[allow(unused)]
pub fn write_subjects(
    tag: &str,
    n_subjects: usize,
    n_trials: usize,
    n_channels: usize,
    n_times: usize,
) -> ScratchDir {
    let dir = ScratchDir::new(tag);
    for s in 0..n_subjects {
        let rec = subject_record(s, n_trials, n_channels, n_times);
        rec.save_safetensors(&dir.path().join(format!("s{s:02}.safetensors"))).unwrap();
    }
    dir
}
