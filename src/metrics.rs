//! Classification diagnostics over already-computed model outputs.
//!
//! * [`logits_accuracy`]: top-k accuracy, in percent, for several k.
//! * [`mask_accuracy`]:   top-k hit rate against a set of acceptable
//!   classes per sample, as a fraction in `[0, 1]`.
//! * [`get_performance`]: accuracy, per-class accuracy, micro/macro F1.
//!
//! Scores are ranked with a stable descending sort, so ties resolve to the
//! lower class index.  `argmax` likewise returns the first maximum.  A NaN
//! score outranks every number.
use std::cmp::Ordering;
use std::fmt;

use anyhow::Result;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::Serialize;

use crate::error::DatasetError;

fn is_nan<A: PartialOrd>(v: &A) -> bool {
    v.partial_cmp(v).is_none()
}

/// Descending score order with NaN ranked above every number.
fn rank_desc<A: PartialOrd>(a: &A, b: &A) -> Ordering {
    match (is_nan(a), is_nan(b)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
    }
}

/// Indices of the `k` highest entries of `row`, best first.
///
/// NaN scores rank highest.
pub fn topk_indices<A: PartialOrd>(row: ArrayView1<'_, A>, k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..row.len()).collect();
    idx.sort_by(|&a, &b| rank_desc(&row[a], &row[b]));
    idx.truncate(k);
    idx
}

/// Index of the first maximum of `row`, or of its first NaN if it has one.
pub fn argmax<A: PartialOrd>(row: ArrayView1<'_, A>) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in row.iter().enumerate() {
        if is_nan(v) {
            return Some(i);
        }
        if best.map_or(true, |b| v.partial_cmp(&row[b]) == Some(Ordering::Greater)) {
            best = Some(i);
        }
    }
    best
}

fn check_topk(topk: &[usize], n_classes: usize) -> Result<usize> {
    let maxk = *topk.iter().max().ok_or(DatasetError::EmptyTopK)?;
    if maxk > n_classes {
        return Err(DatasetError::Shape(format!(
            "k = {maxk} exceeds the number of classes ({n_classes})"
        ))
        .into());
    }
    Ok(maxk)
}

/// Top-k accuracy for each `k` in `topk`, as a percentage of the batch.
///
/// `output`: [batch, classes] scores, `target`: [batch] class indices.
///
/// ```
/// use deapwin::metrics::logits_accuracy;
/// use ndarray::array;
///
/// let scores = array![[0.1, 0.7, 0.2], [0.5, 0.3, 0.2]];
/// let acc = logits_accuracy(scores.view(), &[1, 1], &[1, 2]).unwrap();
/// assert_eq!(acc, vec![50.0, 100.0]);
/// ```
pub fn logits_accuracy<A: PartialOrd>(
    output: ArrayView2<'_, A>,
    target: &[usize],
    topk: &[usize],
) -> Result<Vec<f64>> {
    let (batch, n_classes) = output.dim();
    if target.len() != batch {
        return Err(DatasetError::Shape(format!(
            "{batch} score rows but {} targets",
            target.len()
        ))
        .into());
    }
    let maxk = check_topk(topk, n_classes)?;

    // rank[i] = position of the true class in row i's top-maxk, if present.
    let rank: Vec<Option<usize>> = output
        .rows()
        .into_iter()
        .zip(target)
        .map(|(row, &t)| topk_indices(row, maxk).iter().position(|&p| p == t))
        .collect();

    Ok(topk
        .iter()
        .map(|&k| {
            let correct = rank.iter().filter(|r| matches!(r, Some(p) if *p < k)).count();
            correct as f64 * 100.0 / batch as f64
        })
        .collect())
}

/// Top-k hit rate where a sample counts as correct when any of its top-k
/// predictions is marked in `target_mask`.
///
/// `output`: [batch, classes] scores, `target_mask`: [batch, classes] with
/// non-zero entries for acceptable classes.  Results are returned for
/// `k = 1..=max(topk)` in increasing order, keeping only the `k` listed in
/// `topk`.
pub fn mask_accuracy<A: PartialOrd>(
    output: ArrayView2<'_, A>,
    target_mask: ArrayView2<'_, i64>,
    topk: &[usize],
) -> Result<Vec<f64>> {
    if output.dim() != target_mask.dim() {
        return Err(DatasetError::Shape(format!(
            "scores {:?} and target mask {:?} differ",
            output.dim(),
            target_mask.dim()
        ))
        .into());
    }
    let (batch, n_classes) = output.dim();
    let maxk = check_topk(topk, n_classes)?;
    let preds: Vec<Vec<usize>> = output.rows().into_iter().map(|r| topk_indices(r, maxk)).collect();

    // hits[i] = Σ mask over the predictions accumulated so far.
    let mut hits = vec![0_i64; batch];
    let mut res = Vec::new();
    for k in 0..maxk {
        for (i, p) in preds.iter().enumerate() {
            hits[i] += target_mask[[i, p[k]]];
        }
        if topk.contains(&(k + 1)) {
            let correct = hits.iter().filter(|&&h| h >= 1).count();
            res.push(correct as f64 / batch as f64);
        }
    }
    Ok(res)
}

/// Evaluation summary produced by [`get_performance`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performance {
    pub accuracy: f64,
    /// Sorted union of the true and predicted class indices; row `i` of the
    /// confusion matrix belongs to `classes[i]`.
    pub classes: Vec<usize>,
    /// Recall of each class in `classes`; `NaN` for a class never present in
    /// the ground truth.
    pub accuracy_per_class: Vec<f64>,
    pub f1_micro: f64,
    pub f1_macro: f64,
    pub confusion: Vec<Vec<usize>>,
}

impl Performance {
    /// `(metric, value)` rows in reporting order:
    /// `accuracy`, `accuracy_class_{i}`…, `f1_micro`, `f1_macro`.
    pub fn rows(&self) -> Vec<(String, f64)> {
        let mut rows = vec![("accuracy".to_string(), self.accuracy)];
        rows.extend(
            self.accuracy_per_class
                .iter()
                .enumerate()
                .map(|(i, &a)| (format!("accuracy_class_{i}"), a)),
        );
        rows.push(("f1_micro".to_string(), self.f1_micro));
        rows.push(("f1_macro".to_string(), self.f1_macro));
        rows
    }
}

impl fmt::Display for Performance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        let width = rows.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        for (name, value) in rows {
            writeln!(f, "{name:<width$}  {value:.6}")?;
        }
        Ok(())
    }
}

/// Confusion matrix over `classes`: `cm[i][j]` counts samples of true class
/// `classes[i]` predicted as `classes[j]`.
pub fn confusion_matrix(labels: &[usize], predictions: &[usize], classes: &[usize]) -> Array2<usize> {
    let n = classes.len();
    let mut cm = Array2::<usize>::zeros((n, n));
    for (&t, &p) in labels.iter().zip(predictions) {
        if let (Ok(i), Ok(j)) = (classes.binary_search(&t), classes.binary_search(&p)) {
            cm[[i, j]] += 1;
        }
    }
    cm
}

/// Summarise predictions `argmax(scores)` against `labels`.
///
/// F1 of a class with no true and no predicted samples counts as 0 in the
/// macro average.
pub fn get_performance<A: PartialOrd>(scores: ArrayView2<'_, A>, labels: &[usize]) -> Result<Performance> {
    let n = labels.len();
    if scores.nrows() != n {
        return Err(DatasetError::Shape(format!(
            "{} score rows but {n} labels",
            scores.nrows()
        ))
        .into());
    }
    if n == 0 || scores.ncols() == 0 {
        return Err(DatasetError::Shape("cannot evaluate an empty batch".into()).into());
    }
    let predictions: Vec<usize> = scores
        .rows()
        .into_iter()
        .map(|r| argmax(r).unwrap_or(0))
        .collect();

    let mut classes: Vec<usize> = labels.iter().chain(&predictions).copied().collect();
    classes.sort_unstable();
    classes.dedup();

    let cm = confusion_matrix(labels, &predictions, &classes);
    let k = classes.len();
    let tp: Vec<f64> = (0..k).map(|i| cm[[i, i]] as f64).collect();
    let true_sum: Vec<f64> = (0..k).map(|i| cm.row(i).sum() as f64).collect();
    let pred_sum: Vec<f64> = (0..k).map(|j| cm.column(j).sum() as f64).collect();

    let correct: f64 = tp.iter().sum();
    let accuracy = correct / n as f64;
    let accuracy_per_class: Vec<f64> = tp.iter().zip(&true_sum).map(|(t, s)| t / s).collect();

    let f1 = |tp: f64, pred: f64, truth: f64| {
        let denom = pred + truth;
        if denom == 0.0 { 0.0 } else { 2.0 * tp / denom }
    };
    let f1_micro = f1(correct, pred_sum.iter().sum(), true_sum.iter().sum());
    let f1_macro = (0..k).map(|i| f1(tp[i], pred_sum[i], true_sum[i])).sum::<f64>() / k as f64;

    Ok(Performance {
        accuracy,
        classes,
        accuracy_per_class,
        f1_micro,
        f1_macro,
        confusion: cm.rows().into_iter().map(|r| r.to_vec()).collect(),
    })
}
