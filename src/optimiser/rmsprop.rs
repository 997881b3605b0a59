use crate::tensor::DenseMatrix;

use super::OptimiserState;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RmsPropParams {
    pub rho: f32,
    pub epsilon: f32,
}

impl Default for RmsPropParams {
    fn default() -> Self {
        Self { rho: 0.9, epsilon: 1e-7 }
    }
}

#[derive(Debug)]
pub struct RmsProp {
    mean_square: Vec<f32>,
    params: RmsPropParams,
}

impl RmsProp {
    pub fn new(size: usize, params: RmsPropParams) -> Self {
        Self { mean_square: vec![0.0; size], params }
    }
}

impl OptimiserState for RmsProp {
    fn update(&mut self, weights: &mut DenseMatrix, grads: &DenseMatrix, gradient_factor: f32, learning_rate: f32) {
        let RmsPropParams { rho, epsilon } = self.params;

        for ((w, &g), ms) in weights.values_mut().iter_mut().zip(grads.values()).zip(self.mean_square.iter_mut()) {
            let g = gradient_factor * g;
            *ms = rho * *ms + (1.0 - rho) * g * g;
            *w -= learning_rate * g / (ms.sqrt() + epsilon);
        }
    }

    fn reset(&mut self) {
        self.mean_square.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn first_step_is_scaled_sign() {
        let mut weights = DenseMatrix::from_samples(2, &[0.0, 0.0]).unwrap();
        let grads = DenseMatrix::from_samples(2, &[3.0, -0.01]).unwrap();
        let mut rms = RmsProp::new(2, RmsPropParams::default());

        rms.update(&mut weights, &grads, 1.0, 0.001);

        // g / sqrt(0.1 * g^2) = sign(g) * sqrt(10)
        let step = 0.001 * 10f32.sqrt();
        assert_approx_eq!(weights.values()[0], -step, 1e-6);
        assert_approx_eq!(weights.values()[1], step, 1e-5);
    }
}
