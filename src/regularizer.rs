//! Penalties added to the training loss, either on a layer's activity
//! or on its kernel.

use crate::error::{Error, Result};

pub trait Regularizer: std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn penalty(&self, values: &[f32]) -> f32;

    /// Adds `scale * d(penalty)/d(values)` into `grads`.
    fn accumulate_gradient(&self, values: &[f32], grads: &mut [f32], scale: f32);

    fn config(&self) -> Vec<(&'static str, f32)>;
}

/// Pushes softmax activations away from their scaled mean, so that a
/// softmax layer learns a sparse code instead of a near-uniform one.
///
/// `penalty(A) = sum(R * |A - C * mean(A)|)`. `R` is the L1 factor and
/// `C` scales the mean, a higher `C` relaxes the constraint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaximiseDiscrepancy {
    r: f32,
    c: f32,
}

impl Default for MaximiseDiscrepancy {
    fn default() -> Self {
        Self { r: 2e-6, c: 1.0 }
    }
}

impl MaximiseDiscrepancy {
    pub fn new(r: f32, c: f32) -> Result<Self> {
        if !r.is_finite() || r < 0.0 {
            return Err(Error::InvalidRegularizer { name: "R", value: r });
        }

        if !c.is_finite() {
            return Err(Error::InvalidRegularizer { name: "C", value: c });
        }

        Ok(Self { r, c })
    }

    pub fn r(&self) -> f32 {
        self.r
    }

    pub fn c(&self) -> f32 {
        self.c
    }

    fn scaled_mean(&self, values: &[f32]) -> f32 {
        if values.is_empty() {
            return 0.0;
        }

        self.c * values.iter().sum::<f32>() / values.len() as f32
    }
}

fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl Regularizer for MaximiseDiscrepancy {
    fn name(&self) -> &'static str {
        "maximise_discrepancy"
    }

    fn penalty(&self, values: &[f32]) -> f32 {
        let mean = self.scaled_mean(values);
        values.iter().map(|&a| self.r * (a - mean).abs()).sum()
    }

    fn accumulate_gradient(&self, values: &[f32], grads: &mut [f32], scale: f32) {
        if values.is_empty() {
            return;
        }

        let mean = self.scaled_mean(values);

        // every value also moves the mean
        let total_sign = values.iter().map(|&a| sign(a - mean)).sum::<f32>();
        let through_mean = self.c * total_sign / values.len() as f32;

        for (g, &a) in grads.iter_mut().zip(values) {
            *g += scale * self.r * (sign(a - mean) - through_mean);
        }
    }

    fn config(&self) -> Vec<(&'static str, f32)> {
        vec![("R", self.r), ("C", self.c)]
    }
}

/// Classic weight decay terms, `l1 * sum|w| + l2 * sum(w^2)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct L1L2 {
    pub l1: f32,
    pub l2: f32,
}

impl Regularizer for L1L2 {
    fn name(&self) -> &'static str {
        "l1_l2"
    }

    fn penalty(&self, values: &[f32]) -> f32 {
        values.iter().map(|&w| self.l1 * w.abs() + self.l2 * w * w).sum()
    }

    fn accumulate_gradient(&self, values: &[f32], grads: &mut [f32], scale: f32) {
        for (g, &w) in grads.iter_mut().zip(values) {
            *g += scale * (self.l1 * sign(w) + 2.0 * self.l2 * w);
        }
    }

    fn config(&self) -> Vec<(&'static str, f32)> {
        vec![("l1", self.l1), ("l2", self.l2)]
    }
}
