use crate::shape::Shape;

use super::DenseMatrix;

impl DenseMatrix {
    /// Mean of the squared error over the features of each sample,
    /// summed across the batch into a scalar.
    pub fn squared_error(prediction: &Self, target: &Self, output: &mut Self) {
        assert_eq!(prediction.shape, target.shape);
        output.reshape_if_needed(Shape::new(1, 1));

        let features = prediction.shape.rows() as f32;
        let total = prediction.buf.iter().zip(&target.buf).map(|(p, t)| (p - t) * (p - t)).sum::<f32>();

        output.buf[0] = total / features;
    }

    pub fn backprop_squared_error(prediction: &Self, target: &Self, output_grad: &Self, prediction_grad: &mut Self) {
        assert_eq!(output_grad.shape, Shape::new(1, 1));
        prediction_grad.reshape_if_needed(prediction.shape);

        let scale = 2.0 * output_grad.buf[0] / prediction.shape.rows() as f32;

        for ((g, &p), &t) in prediction_grad.buf.iter_mut().zip(&prediction.buf).zip(&target.buf) {
            *g += scale * (p - t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_error_is_per_sample_mean() {
        let prediction = DenseMatrix::from_samples(2, &[1.0, 2.0, 0.0, 0.0]).unwrap();
        let target = DenseMatrix::from_samples(2, &[0.0, 0.0, 1.0, 1.0]).unwrap();
        let mut output = DenseMatrix::default();

        DenseMatrix::squared_error(&prediction, &target, &mut output);

        // (1 + 4) / 2 + (1 + 1) / 2
        assert_eq!(output.values(), &[3.5]);

        let mut grad = DenseMatrix::zeroed(prediction.shape());
        let unit = DenseMatrix::from_samples(1, &[1.0]).unwrap();
        DenseMatrix::backprop_squared_error(&prediction, &target, &unit, &mut grad);

        assert_eq!(grad.values(), &[1.0, 2.0, -1.0, -1.0]);
    }
}
