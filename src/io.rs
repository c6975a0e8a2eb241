//! Subject-file I/O.
//!
//! One file per subject holding two tensors:
//!
//! ```text
//! data    [trial, channel, time]   numeric
//! labels  [trial, attribute]       numeric (valence, arousal, dominance, liking)
//! ```
//!
//! Two containers are understood, chosen by file extension:
//! * `.mat`: MATLAB level-5 files as distributed with the DEAP
//!   preprocessed release (column-major, any numeric class).
//! * `.safetensors`: little-endian tensors, written by [`StWriter`].
use anyhow::{anyhow, bail, Context, Result};
use ndarray::{Array, Array2, Array3, ArrayBase, Data, Dimension, Ix2, Ix3, IxDyn, ShapeBuilder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::DatasetError;

/// Field holding the `[trial, channel, time]` signal.
pub const DATA_KEY: &str = "data";
/// Field holding the `[trial, attribute]` ratings.
pub const LABELS_KEY: &str = "labels";

// ── Subject record ────────────────────────────────────────────────────────────

/// All trials of one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    /// [trial, channel, time] signal.
    pub data: Array3<f32>,
    /// [trial, attribute] raw ratings.
    pub labels: Array2<f32>,
}

impl SubjectRecord {
    /// Build a record, checking that both arrays agree on the trial count.
    pub fn new(data: Array3<f32>, labels: Array2<f32>) -> Result<Self> {
        if data.shape()[0] != labels.nrows() {
            return Err(DatasetError::Shape(format!(
                "signal has {} trials but labels have {} rows",
                data.shape()[0],
                labels.nrows()
            ))
            .into());
        }
        Ok(Self { data, labels })
    }

    pub fn n_trials(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn n_channels(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn n_times(&self) -> usize {
        self.data.shape()[2]
    }

    /// Load a subject file, dispatching on its extension.
    pub fn load(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("mat") => Self::load_mat(path),
            Some("safetensors") => Self::load_safetensors(path),
            _ => Err(DatasetError::UnsupportedFormat(path.to_path_buf()).into()),
        }
    }

    /// Read a MATLAB level-5 `.mat` file with `data` and `labels` variables.
    pub fn load_mat(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let mat = matfile::MatFile::parse(std::io::BufReader::new(file))
            .map_err(|e| anyhow!("parsing {}: {e:?}", path.display()))?;

        let field = |name: &str| -> Result<Array<f32, IxDyn>> {
            let arr = mat.find_by_name(name).ok_or_else(|| DatasetError::MissingField {
                field: name.to_string(),
                path: path.to_path_buf(),
            })?;
            mat_to_ndarray(arr).with_context(|| format!("'{name}' in {}", path.display()))
        };

        let data = field(DATA_KEY)?
            .into_dimensionality::<Ix3>()
            .map_err(|e| DatasetError::Shape(format!("'{DATA_KEY}' must be 3-D: {e}")))?;
        let labels = field(LABELS_KEY)?
            .into_dimensionality::<Ix2>()
            .map_err(|e| DatasetError::Shape(format!("'{LABELS_KEY}' must be 2-D: {e}")))?;
        // Column-major on disk; store row-major for cheap slicing later on.
        Self::new(
            data.as_standard_layout().into_owned(),
            labels.as_standard_layout().into_owned(),
        )
    }

    /// Read a `.safetensors` file with `data` and `labels` tensors.
    pub fn load_safetensors(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;

        let field = |name: &str| -> Result<Array<f32, IxDyn>> {
            let entry = header.get(name).ok_or_else(|| DatasetError::MissingField {
                field: name.to_string(),
                path: path.to_path_buf(),
            })?;
            let shape = shape_of(entry)?;
            let values = read_tensor(&bytes, data_start, entry)
                .with_context(|| format!("'{name}' in {}", path.display()))?;
            Ok(Array::from_shape_vec(IxDyn(&shape), values)?)
        };

        let data = field(DATA_KEY)?
            .into_dimensionality::<Ix3>()
            .map_err(|e| DatasetError::Shape(format!("'{DATA_KEY}' must be 3-D: {e}")))?;
        let labels = field(LABELS_KEY)?
            .into_dimensionality::<Ix2>()
            .map_err(|e| DatasetError::Shape(format!("'{LABELS_KEY}' must be 2-D: {e}")))?;
        Self::new(data, labels)
    }

    /// Write this record as a `.safetensors` subject file.
    pub fn save_safetensors(&self, path: &Path) -> Result<()> {
        StWriter::new()
            .add(DATA_KEY, &self.data)
            .add(LABELS_KEY, &self.labels)
            .write(path)
    }
}

/// Sorted listing of the regular files in `dir`, one per subject.
pub fn list_subject_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

// ── MAT-file conversion ───────────────────────────────────────────────────────

fn mat_to_ndarray(arr: &matfile::Array) -> Result<Array<f32, IxDyn>> {
    use matfile::NumericData as N;

    let values: Vec<f32> = match arr.data() {
        N::Double { real, .. } => real.iter().map(|&v| v as f32).collect(),
        N::Single { real, .. } => real.clone(),
        N::Int8 { real, .. } => real.iter().map(|&v| v as f32).collect(),
        N::UInt8 { real, .. } => real.iter().map(|&v| v as f32).collect(),
        N::Int16 { real, .. } => real.iter().map(|&v| v as f32).collect(),
        N::UInt16 { real, .. } => real.iter().map(|&v| v as f32).collect(),
        N::Int32 { real, .. } => real.iter().map(|&v| v as f32).collect(),
        N::UInt32 { real, .. } => real.iter().map(|&v| v as f32).collect(),
        N::Int64 { real, .. } => real.iter().map(|&v| v as f32).collect(),
        N::UInt64 { real, .. } => real.iter().map(|&v| v as f32).collect(),
    };
    Ok(Array::from_shape_vec(IxDyn(arr.size()).f(), values)?)
}

// ── Low-level safetensors parser ──────────────────────────────────────────────

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = u64::from_le_bytes(len) as usize;
    let end = 8usize.checked_add(n).filter(|&e| e <= bytes.len())
        .context("safetensors header length exceeds file size")?;
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes[8..end])
            .context("failed to parse safetensors header")?;
    Ok((header, end))
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("tensor entry without 'shape'")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("non-integer dimension"))
        .collect()
}

/// Decode one tensor to `f32`, whatever its stored dtype.
fn read_tensor(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<f32>> {
    let offsets = entry["data_offsets"].as_array().context("tensor entry without 'data_offsets'")?;
    let (s, e) = match offsets.as_slice() {
        [s, e] => (
            s.as_u64().context("bad data offset")? as usize,
            e.as_u64().context("bad data offset")? as usize,
        ),
        _ => bail!("'data_offsets' must hold two offsets"),
    };
    let (start, end) = match (data_start.checked_add(s), data_start.checked_add(e)) {
        (Some(start), Some(end)) if start <= end => (start, end),
        _ => bail!("invalid data offsets [{s}, {e}]"),
    };
    let raw = bytes.get(start..end).context("tensor data out of bounds")?;

    let dtype = entry["dtype"].as_str().context("tensor entry without 'dtype'")?;
    let values = match dtype {
        "F32" => raw.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        "F64" => raw.chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
            .collect(),
        "I32" => raw.chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32)
            .collect(),
        "I64" => raw.chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
            .collect(),
        "U8" => raw.iter().map(|&b| b as f32).collect(),
        other => bail!("unsupported tensor dtype {other}"),
    };
    Ok(values)
}

// ── Safetensors writer ────────────────────────────────────────────────────────

/// Writer for `.safetensors` subject files.
///
/// Tensors are stored as little-endian `F32`, row-major, in the order they
/// were added.
///
/// ```rust,no_run
/// use deapwin::io::{StWriter, DATA_KEY, LABELS_KEY};
/// use ndarray::{Array2, Array3};
///
/// let mut w = StWriter::new();
/// w.add(DATA_KEY, &Array3::<f32>::zeros((40, 40, 8064)))
///     .add(LABELS_KEY, &Array2::<f32>::from_elem((40, 4), 5.0));
/// w.write(std::path::Path::new("/tmp/s01.safetensors")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StWriter {
    tensors: Vec<StTensor>,
}

#[derive(Debug)]
struct StTensor {
    name: String,
    dtype: &'static str,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `arr` under `name`.
    pub fn add<S, D>(&mut self, name: &str, arr: &ArrayBase<S, D>) -> &mut Self
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        let bytes = arr.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.push(name, "F32", arr.shape(), bytes)
    }

    fn push(&mut self, name: &str, dtype: &'static str, shape: &[usize], bytes: Vec<u8>) -> &mut Self {
        self.tensors.push(StTensor { name: name.to_string(), dtype, shape: shape.to_vec(), bytes });
        self
    }

    /// JSON header, space-padded to a multiple of 8 bytes.
    fn header(&self) -> Result<Vec<u8>> {
        let mut map = serde_json::Map::new();
        let mut offset = 0usize;
        for t in &self.tensors {
            map.insert(t.name.clone(), serde_json::json!({
                "dtype": t.dtype,
                "shape": t.shape,
                "data_offsets": [offset, offset + t.bytes.len()],
            }));
            offset += t.bytes.len();
        }
        let mut header = serde_json::to_vec(&map)?;
        let pad = (8 - header.len() % 8) % 8;
        header.extend(std::iter::repeat(b' ').take(pad));
        Ok(header)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let header = self.header()?;
        let mut f = std::io::BufWriter::new(
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        f.write_all(&(header.len() as u64).to_le_bytes())?;
        f.write_all(&header)?;
        for t in &self.tensors {
            f.write_all(&t.bytes)?;
        }
        f.flush()?;
        Ok(())
    }
}
