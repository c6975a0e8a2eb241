//! Learning-rate schedules.
//!
//! `cos = true`  :  lr · ½ · (1 + cos(π · epoch / total_epochs))
//! `cos = false` :  lr · 0.1^(number of milestones ≤ epoch)
//!
//! The optimizer's learning-rate state is an explicit record updated through
//! `&mut`, one rate per parameter group.
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::config::ScheduleConfig;

/// Learning rate of one group of parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamGroup {
    pub lr: f64,
}

/// The part of an optimizer the scheduler writes to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizerState {
    pub param_groups: Vec<ParamGroup>,
}

impl OptimizerState {
    /// `n` parameter groups all starting at `lr`.
    pub fn uniform(n: usize, lr: f64) -> Self {
        Self { param_groups: vec![ParamGroup { lr }; n] }
    }
}

/// Learning rate for `epoch` given the base rate `lr`.
///
/// `total_epochs == 0` is treated as a single-epoch run.
///
/// ```
/// use deapwin::{schedule::scheduled_lr, ScheduleConfig};
///
/// let step = ScheduleConfig { cos: false, lr_schedule: vec![10, 20] };
/// assert_eq!(scheduled_lr(1.0, 5, 30, &step), 1.0);
/// assert!((scheduled_lr(1.0, 25, 30, &step) - 0.01).abs() < 1e-12);
/// ```
pub fn scheduled_lr(lr: f64, epoch: usize, total_epochs: usize, cfg: &ScheduleConfig) -> f64 {
    if cfg.cos {
        let progress = epoch as f64 / total_epochs.max(1) as f64;
        lr * 0.5 * (1.0 + (PI * progress).cos())
    } else {
        cfg.lr_schedule
            .iter()
            .fold(lr, |acc, &milestone| if epoch >= milestone { acc * 0.1 } else { acc })
    }
}

/// Decay the learning rate for `epoch` and write it into every parameter
/// group of `optimizer`.  Returns the new rate.
pub fn adjust_learning_rate(
    optimizer: &mut OptimizerState,
    lr: f64,
    epoch: usize,
    total_epochs: usize,
    cfg: &ScheduleConfig,
) -> f64 {
    let new_lr = scheduled_lr(lr, epoch, total_epochs, cfg);
    for group in &mut optimizer.param_groups {
        group.lr = new_lr;
    }
    tracing::debug!(epoch, lr = new_lr, "learning rate adjusted");
    new_lr
}
