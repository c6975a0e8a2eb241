//! Per-axis standardization.
//!
//! `tensor_standardize(x, dim)`:
//!   μ = mean(x, dim),  σ = std(x, dim) (ddof = 0),  σ == 0 → EPS
//!   x = (x - μ) / σ
//!
//! Statistics are accumulated in `f64`.
use anyhow::Result;
use ndarray::{Array, ArrayD, Axis, Dimension};

use crate::dataset::Transform;
use crate::error::DatasetError;

/// Substitute for a zero denominator.
pub const EPS: f64 = 1e-8;

/// Replace every exact zero in `x` by [`EPS`].
pub fn tackle_denominator<D: Dimension>(x: &mut Array<f64, D>) {
    x.mapv_inplace(|v| if v == 0.0 { EPS } else { v });
}

/// Resolve a possibly negative axis index (`-1` = last axis).
fn resolve_axis(ndim: usize, dim: isize) -> Result<Axis> {
    let ax = if dim < 0 { ndim as isize + dim } else { dim };
    if ax < 0 || ax as usize >= ndim {
        return Err(DatasetError::Shape(format!(
            "axis {dim} out of range for a {ndim}-D array"
        ))
        .into());
    }
    Ok(Axis(ax as usize))
}

/// Standardize `x` along `dim`: subtract the mean, divide by the standard
/// deviation, with zero deviations replaced by [`EPS`].
///
/// A lane with constant values becomes all zeros.
///
/// # Errors
/// * `dim` out of range for `x`.
/// * The selected axis has length zero.
pub fn tensor_standardize<D: Dimension>(x: &Array<f32, D>, dim: isize) -> Result<Array<f32, D>> {
    let axis = resolve_axis(x.ndim(), dim)?;
    if x.len_of(axis) == 0 {
        return Err(DatasetError::Shape(format!("axis {} has length zero", axis.index())).into());
    }
    let x64 = x.mapv(|v| v as f64).into_dyn();
    let mean = x64
        .mean_axis(axis)
        .ok_or_else(|| DatasetError::Shape("empty axis".into()))?;
    let mut std = x64.std_axis(axis, 0.0);
    tackle_denominator(&mut std);

    let centered = &x64 - &mean.insert_axis(axis);
    let scaled = &centered / &std.insert_axis(axis);
    Ok(scaled.mapv(|v| v as f32).into_dimensionality::<D>()?)
}

/// [`Transform`] applying [`tensor_standardize`] to every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standardize {
    pub dim: isize,
}

impl Default for Standardize {
    /// Standardize along the time axis.
    fn default() -> Self {
        Self { dim: -1 }
    }
}

impl Transform for Standardize {
    fn apply(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        tensor_standardize(&x, self.dim)
    }
}
