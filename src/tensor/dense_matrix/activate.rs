use std::str::FromStr;

use crate::error::Error;

use super::DenseMatrix;

/// List of supported activation functions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Activation {
    #[default]
    Linear,
    Sigmoid,
    ReLU,
    Tanh,
    /// Normalises each sample (column) independently.
    Softmax,
}

impl Activation {
    pub fn name(&self) -> &'static str {
        match self {
            Activation::Linear => "linear",
            Activation::Sigmoid => "sigmoid",
            Activation::ReLU => "relu",
            Activation::Tanh => "tanh",
            Activation::Softmax => "softmax",
        }
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "identity" => Ok(Activation::Linear),
            "sigmoid" => Ok(Activation::Sigmoid),
            "relu" => Ok(Activation::ReLU),
            "tanh" => Ok(Activation::Tanh),
            "softmax" => Ok(Activation::Softmax),
            _ => Err(Error::UnknownName { kind: "activation", name: s.to_string() }),
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl DenseMatrix {
    pub fn activate(activation: Activation, input: &Self, output: &mut Self) {
        output.reshape_if_needed(input.shape);

        let map = |f: fn(f32) -> f32, output: &mut Self| {
            for (out, &inp) in output.buf.iter_mut().zip(&input.buf) {
                *out = f(inp);
            }
        };

        match activation {
            Activation::Linear => output.buf.copy_from_slice(&input.buf),
            Activation::Sigmoid => map(sigmoid, output),
            Activation::ReLU => map(|x| x.max(0.0), output),
            Activation::Tanh => map(f32::tanh, output),
            Activation::Softmax => {
                let rows = input.shape.rows();
                for (out, inp) in output.buf.chunks_exact_mut(rows).zip(input.buf.chunks_exact(rows)) {
                    let max = inp.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                    let mut total = 0.0;

                    for (o, &i) in out.iter_mut().zip(inp) {
                        *o = (i - max).exp();
                        total += *o;
                    }

                    for o in out.iter_mut() {
                        *o /= total;
                    }
                }
            }
        }
    }

    /// Accumulates the input gradient. Sigmoid, tanh and softmax are
    /// differentiated from their outputs.
    pub fn backprop_activate(
        activation: Activation,
        input: &Self,
        output: &Self,
        input_grad: &mut Self,
        output_grad: &Self,
    ) {
        assert_eq!(input.shape, output_grad.shape);
        assert_eq!(input.shape, output.shape);
        input_grad.reshape_if_needed(input.shape);

        let grads = input_grad.buf.iter_mut().zip(&output_grad.buf);

        match activation {
            Activation::Linear => grads.for_each(|(ig, &og)| *ig += og),
            Activation::Sigmoid => {
                grads.zip(&output.buf).for_each(|((ig, &og), &y)| *ig += og * y * (1.0 - y));
            }
            Activation::ReLU => {
                grads.zip(&input.buf).for_each(|((ig, &og), &x)| *ig += if x > 0.0 { og } else { 0.0 });
            }
            Activation::Tanh => {
                grads.zip(&output.buf).for_each(|((ig, &og), &y)| *ig += og * (1.0 - y * y));
            }
            Activation::Softmax => {
                let rows = input.shape.rows();
                let columns = input_grad
                    .buf
                    .chunks_exact_mut(rows)
                    .zip(output_grad.buf.chunks_exact(rows))
                    .zip(output.buf.chunks_exact(rows));

                for ((ig, og), y) in columns {
                    let dot = og.iter().zip(y).map(|(g, y)| g * y).sum::<f32>();

                    for ((ig, &g), &y) in ig.iter_mut().zip(og).zip(y) {
                        *ig += y * (g - dot);
                    }
                }
            }
        }
    }
}
