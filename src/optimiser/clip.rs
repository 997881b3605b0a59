use std::rc::Rc;

use crate::{constraint::Constraint, tensor::DenseMatrix};

use super::{utils::Placement, OptimiserState};

/// Wraps a weight's optimiser state so that a [`Constraint`] is enforced
/// on the weights around every update.
#[derive(Debug)]
pub struct Constrained {
    inner: Box<dyn OptimiserState>,
    constraint: Rc<dyn Constraint>,
    placement: Placement,
}

impl Constrained {
    pub fn new(inner: Box<dyn OptimiserState>, constraint: Rc<dyn Constraint>, placement: Placement) -> Self {
        Self { inner, constraint, placement }
    }
}

impl OptimiserState for Constrained {
    fn update(&mut self, weights: &mut DenseMatrix, grads: &DenseMatrix, gradient_factor: f32, learning_rate: f32) {
        if self.placement == Placement::Before {
            self.constraint.apply(weights.values_mut());
        }

        self.inner.update(weights, grads, gradient_factor, learning_rate);

        if self.placement == Placement::After {
            self.constraint.apply(weights.values_mut());
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}
