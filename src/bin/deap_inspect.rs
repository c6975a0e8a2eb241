/// deap_inspect: build a windowed dataset split and report its layout.
///
/// Prints the sample count, per-sample shape, channel count and the balance
/// of the binarized label.  With `--json` the same summary is written as one
/// JSON object on stdout.
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use deapwin::{
    normalize::Standardize, Dataset, DatasetConfig, Modality, WindowedDataset,
};

#[derive(Parser, Debug)]
#[command(name = "deap_inspect", about = "Inspect a windowed DEAP dataset split")]
struct Args {
    /// Directory with one file per subject.
    #[arg(long)]
    data_path: PathBuf,

    /// Windows per sequence (0 = single windows).
    #[arg(long, default_value_t = 0)]
    num_seq: usize,

    /// Subject indices, comma-separated (e.g. "0,1,2") or a range ("0..28").
    #[arg(long, default_value = "0..32")]
    subjects: String,

    /// Label attribute: 0 valence, 1 arousal, 2 dominance, 3 liking.
    #[arg(long, default_value_t = 0)]
    label_dim: usize,

    /// Channel group: eeg, eog or emg.
    #[arg(long, default_value = "eeg")]
    modal: String,

    /// Sampling rate (Hz).
    #[arg(long, default_value_t = 128)]
    sampling_rate: usize,

    /// Standardize each sample along time before reporting its statistics.
    #[arg(long)]
    standardize: bool,

    /// Emit the summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    samples: usize,
    sample_shape: Vec<usize>,
    channels: usize,
    positives: usize,
    negatives: usize,
    dropped_samples: usize,
    dropped_windows: usize,
    first_sample_mean: Option<f32>,
}

fn parse_subjects(s: &str) -> Result<Vec<usize>> {
    if let Some((a, b)) = s.split_once("..") {
        let a: usize = a.trim().parse().context("range start")?;
        let b: usize = b.trim().parse().context("range end")?;
        return Ok((a..b).collect());
    }
    s.split(',')
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.trim().parse::<usize>().with_context(|| format!("subject index '{t}'")))
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let modal: Modality = args.modal.parse()?;

    let cfg = DatasetConfig {
        num_seq: args.num_seq,
        subject_list: parse_subjects(&args.subjects)?,
        label_dim: args.label_dim,
        modal,
        sampling_rate: args.sampling_rate,
        ..DatasetConfig::default()
    };

    let mut ds = WindowedDataset::build(&args.data_path, &cfg)?;
    if args.standardize {
        ds = ds.with_transform(Standardize::default());
    }

    let positions = ds.raw_labels().shape()[0] * ds.raw_labels().shape()[1];
    let positives = ds.positive_count();
    let first_sample_mean = if ds.is_empty() {
        None
    } else {
        ds.get(0)?.signal.mean()
    };

    let summary = Summary {
        samples: ds.len(),
        sample_shape: ds.sample_shape(),
        channels: ds.channels(),
        positives,
        negatives: positions - positives,
        dropped_samples: ds.dropped().samples,
        dropped_windows: ds.dropped().windows,
        first_sample_mean,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("samples       {}", summary.samples);
        println!("sample shape  {:?}", summary.sample_shape);
        println!("channels      {}", summary.channels);
        println!("label {}       {} positive / {} negative", args.label_dim, summary.positives, summary.negatives);
        println!("dropped       {} samples, {} windows", summary.dropped_samples, summary.dropped_windows);
        if let Some(m) = summary.first_sample_mean {
            println!("sample 0 mean {m:.6}");
        }
    }
    Ok(())
}
