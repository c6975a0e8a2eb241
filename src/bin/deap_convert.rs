/// deap_convert: rewrite every `.mat` subject file of a directory as a
/// `.safetensors` subject file with the same stem.
///
/// The output directory is then a drop-in `data_path` for `deap_inspect` and
/// `WindowedDataset::build`.
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use deapwin::{list_subject_files, SubjectRecord};

#[derive(Parser, Debug)]
#[command(name = "deap_convert", about = "Convert DEAP .mat subject files to safetensors")]
struct Args {
    /// Directory of `.mat` subject files.
    #[arg(long)]
    input: PathBuf,

    /// Output directory (created if missing).
    #[arg(long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let files: Vec<PathBuf> = list_subject_files(&args.input)?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "mat"))
        .collect();

    for path in &files {
        let t = std::time::Instant::now();
        let rec = SubjectRecord::load_mat(path)?;
        let stem = path.file_stem().context("file without a name")?;
        let out = args.output.join(stem).with_extension("safetensors");
        rec.save_safetensors(&out)?;
        tracing::info!(
            file = %path.display(),
            trials = rec.n_trials(),
            channels = rec.n_channels(),
            samples = rec.n_times(),
            ms = t.elapsed().as_secs_f64() * 1000.0,
            "converted"
        );
    }
    tracing::info!(files = files.len(), output = %args.output.display(), "done");
    Ok(())
}
