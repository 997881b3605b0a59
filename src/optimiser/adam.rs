use crate::tensor::DenseMatrix;

use super::OptimiserState;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdamParams {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl Default for AdamParams {
    fn default() -> Self {
        Self { beta1: 0.9, beta2: 0.999, epsilon: 1e-7 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdamWParams {
    pub decay: f32,
    pub beta1: f32,
    pub beta2: f32,
    /// Inline weight clipping, applied after each step.
    pub clip: Option<(f32, f32)>,
}

impl Default for AdamWParams {
    fn default() -> Self {
        Self { decay: 0.01, beta1: 0.9, beta2: 0.999, clip: None }
    }
}

#[derive(Debug)]
struct Moments {
    momentum: Vec<f32>,
    velocity: Vec<f32>,
    steps: i32,
}

impl Moments {
    fn new(size: usize) -> Self {
        Self { momentum: vec![0.0; size], velocity: vec![0.0; size], steps: 0 }
    }

    fn reset(&mut self) {
        self.momentum.fill(0.0);
        self.velocity.fill(0.0);
        self.steps = 0;
    }

    /// Bias-corrected step for every weight, written through `apply`.
    fn step(
        &mut self,
        weights: &mut [f32],
        grads: &[f32],
        gradient_factor: f32,
        (beta1, beta2, epsilon): (f32, f32, f32),
        mut apply: impl FnMut(&mut f32, f32),
    ) {
        self.steps += 1;
        let correction1 = 1.0 - beta1.powi(self.steps);
        let correction2 = 1.0 - beta2.powi(self.steps);

        let state = self.momentum.iter_mut().zip(self.velocity.iter_mut());

        for ((w, &g), (m, v)) in weights.iter_mut().zip(grads).zip(state) {
            let g = gradient_factor * g;
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;

            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            apply(w, m_hat / (v_hat.sqrt() + epsilon));
        }
    }
}

#[derive(Debug)]
pub struct Adam {
    moments: Moments,
    params: AdamParams,
}

impl Adam {
    pub fn new(size: usize, params: AdamParams) -> Self {
        Self { moments: Moments::new(size), params }
    }
}

impl OptimiserState for Adam {
    fn update(&mut self, weights: &mut DenseMatrix, grads: &DenseMatrix, gradient_factor: f32, learning_rate: f32) {
        let AdamParams { beta1, beta2, epsilon } = self.params;

        self.moments.step(weights.values_mut(), grads.values(), gradient_factor, (beta1, beta2, epsilon), |w, val| {
            *w -= learning_rate * val;
        });
    }

    fn reset(&mut self) {
        self.moments.reset();
    }
}

/// Adam with decoupled weight decay.
#[derive(Debug)]
pub struct AdamW {
    moments: Moments,
    params: AdamWParams,
}

impl AdamW {
    pub fn new(size: usize, params: AdamWParams) -> Self {
        Self { moments: Moments::new(size), params }
    }
}

impl OptimiserState for AdamW {
    fn update(&mut self, weights: &mut DenseMatrix, grads: &DenseMatrix, gradient_factor: f32, learning_rate: f32) {
        let AdamWParams { decay, beta1, beta2, clip } = self.params;
        let decay_gamma = 1.0 - decay * learning_rate;

        self.moments.step(weights.values_mut(), grads.values(), gradient_factor, (beta1, beta2, 1e-7), |w, val| {
            *w = *w * decay_gamma - learning_rate * val;

            if let Some((min, max)) = clip {
                *w = w.clamp(min, max);
            }
        });
    }

    fn reset(&mut self) {
        self.moments.reset();
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn adam_first_step_is_learning_rate() {
        let mut weights = DenseMatrix::from_samples(2, &[0.5, 0.5]).unwrap();
        let grads = DenseMatrix::from_samples(2, &[2.0, -0.5]).unwrap();
        let mut adam = Adam::new(2, AdamParams::default());

        adam.update(&mut weights, &grads, 1.0, 0.01);

        assert_approx_eq!(weights.values()[0], 0.49, 1e-5);
        assert_approx_eq!(weights.values()[1], 0.51, 1e-5);
    }

    #[test]
    fn adamw_decays_and_clips() {
        let mut weights = DenseMatrix::from_samples(2, &[1.0, -1.0]).unwrap();
        let zero = DenseMatrix::zeroed(weights.shape());
        let mut adamw = AdamW::new(2, AdamWParams { decay: 0.5, clip: Some((-0.5, 2.0)), ..Default::default() });

        adamw.update(&mut weights, &zero, 1.0, 0.1);

        assert_approx_eq!(weights.values()[0], 0.95, 1e-6);
        assert_eq!(weights.values()[1], -0.5);
    }
}
