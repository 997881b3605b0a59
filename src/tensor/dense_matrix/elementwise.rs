use rand::Rng;
use rand_distr::StandardNormal;

use super::DenseMatrix;

impl DenseMatrix {
    pub fn add(input_a: &Self, input_b: &Self, output: &mut Self) {
        assert_eq!(input_a.shape, input_b.shape);
        output.reshape_if_needed(input_a.shape);

        for ((o, &a), &b) in output.buf.iter_mut().zip(&input_a.buf).zip(&input_b.buf) {
            *o = a + b;
        }
    }

    /// `self += input`, used to pass gradients straight through.
    pub fn add_assign(&mut self, input: &Self) {
        self.reshape_if_needed(input.shape);

        for (o, &i) in self.buf.iter_mut().zip(&input.buf) {
            *o += i;
        }
    }

    pub fn add_gaussian_noise(stdev: f32, rng: &mut impl Rng, input: &Self, output: &mut Self) {
        output.reshape_if_needed(input.shape);

        for (o, &i) in output.buf.iter_mut().zip(&input.buf) {
            let noise: f32 = rng.sample(StandardNormal);
            *o = i + stdev * noise;
        }
    }
}
