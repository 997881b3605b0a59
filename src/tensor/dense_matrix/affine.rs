use crate::shape::Shape;

use super::DenseMatrix;

impl DenseMatrix {
    /// Calculates `output = weights * input + bias`, with the bias
    /// broadcast across every sample.
    pub fn affine(weights: &Self, input: &Self, bias: &Self, output: &mut Self) {
        let out_shape = weights.shape * input.shape;
        assert_eq!(bias.shape.rows(), out_shape.rows());
        assert_eq!(bias.shape.cols(), 1);

        output.reshape_if_needed(out_shape);

        let rows = out_shape.rows();
        let inner = weights.shape.cols();

        for (out, inp) in output.buf.chunks_exact_mut(rows).zip(input.buf.chunks_exact(inner)) {
            out.copy_from_slice(&bias.buf);

            for (col, &x) in weights.buf.chunks_exact(rows).zip(inp) {
                if x != 0.0 {
                    for (o, &w) in out.iter_mut().zip(col) {
                        *o += w * x;
                    }
                }
            }
        }
    }

    /// Accumulates into whichever gradients are present.
    pub fn backprop_affine(
        weights: &Self,
        weights_grad: Option<&mut Self>,
        input: &Self,
        input_grad: Option<&mut Self>,
        bias_grad: Option<&mut Self>,
        output_grad: &Self,
    ) {
        let rows = weights.shape.rows();
        let inner = weights.shape.cols();
        assert_eq!(output_grad.shape, weights.shape * input.shape);

        if let Some(grad) = weights_grad {
            grad.reshape_if_needed(weights.shape);

            for (og, inp) in output_grad.buf.chunks_exact(rows).zip(input.buf.chunks_exact(inner)) {
                for (col, &x) in grad.buf.chunks_exact_mut(rows).zip(inp) {
                    for (g, &o) in col.iter_mut().zip(og) {
                        *g += o * x;
                    }
                }
            }
        }

        if let Some(grad) = bias_grad {
            grad.reshape_if_needed(Shape::new(rows, 1));

            for og in output_grad.buf.chunks_exact(rows) {
                for (g, &o) in grad.buf.iter_mut().zip(og) {
                    *g += o;
                }
            }
        }

        if let Some(grad) = input_grad {
            grad.reshape_if_needed(input.shape);

            for (ig, og) in grad.buf.chunks_exact_mut(inner).zip(output_grad.buf.chunks_exact(rows)) {
                for (g, col) in ig.iter_mut().zip(weights.buf.chunks_exact(rows)) {
                    *g += col.iter().zip(og).map(|(w, o)| w * o).sum::<f32>();
                }
            }
        }
    }
}
