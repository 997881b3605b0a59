use crate::tensor::DenseMatrix;

use super::OptimiserState;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SgdParams {
    pub momentum: f32,
    pub nesterov: bool,
}

#[derive(Debug)]
pub struct Sgd {
    velocity: Vec<f32>,
    params: SgdParams,
}

impl Sgd {
    pub fn new(size: usize, params: SgdParams) -> Self {
        Self { velocity: vec![0.0; size], params }
    }
}

impl OptimiserState for Sgd {
    fn update(&mut self, weights: &mut DenseMatrix, grads: &DenseMatrix, gradient_factor: f32, learning_rate: f32) {
        let SgdParams { momentum, nesterov } = self.params;

        for ((w, &g), v) in weights.values_mut().iter_mut().zip(grads.values()).zip(self.velocity.iter_mut()) {
            let g = gradient_factor * g;
            *v = momentum * *v - learning_rate * g;

            if nesterov {
                *w += momentum * *v - learning_rate * g;
            } else {
                *w += *v;
            }
        }
    }

    fn reset(&mut self) {
        self.velocity.fill(0.0);
    }
}
