use std::rc::Rc;

use crate::{
    error::{Error, Result},
    regularizer::Regularizer,
    shape::Shape,
    tensor::{Activation, DenseMatrix},
};

use super::{builder::GraphBuilder, ExecutionContext, Graph, Node};

#[derive(Clone, Debug)]
pub enum Operation {
    Activate(Node, Activation),
    /// `weights * input + bias`
    Affine { weights: Node, bias: Node, input: Node },
    /// Adds two scalar loss terms.
    Add(Node, Node),
    /// Zero-mean noise, only applied while training.
    GaussianNoise(Node, f32),
    MeanSquaredError { prediction: Node, target: Node },
    /// Regularization penalty on a node. Weight penalties are counted once
    /// per batch, activity penalties once per batch of activations.
    Penalty { input: Node, regularizer: Rc<dyn Regularizer>, on_weights: bool },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Activate(..) => "Activate",
            Operation::Affine { .. } => "Affine",
            Operation::Add(..) => "Add",
            Operation::GaussianNoise(..) => "GaussianNoise",
            Operation::MeanSquaredError { .. } => "MeanSquaredError",
            Operation::Penalty { .. } => "Penalty",
        }
    }

    pub fn output_shape(&self, builder: &GraphBuilder) -> Result<Shape> {
        use Operation::*;

        let shape = |node: &Node| builder.get_node(*node).shape();
        let scalar = Shape::new(1, 1);

        let mismatch = |nodes: &[&Node]| Error::ShapeMismatch {
            op: self.name(),
            message: nodes.iter().map(|&node| shape(node).to_string()).collect::<Vec<_>>().join(", "),
        };

        let ret = |cond: bool, ok: Shape, err: Error| if cond { Ok(ok) } else { Err(err) };

        match self {
            Activate(node, _) => Ok(shape(node)),
            Affine { weights, bias, input } => {
                if shape(weights).cols() != shape(input).rows() || shape(input).cols() != 1 {
                    return Err(mismatch(&[weights, input]));
                }

                let out = shape(weights) * shape(input);
                ret(shape(bias) == out, out, mismatch(&[weights, input, bias]))
            }
            Add(a, b) => ret(shape(a) == scalar && shape(b) == scalar, scalar, mismatch(&[a, b])),
            GaussianNoise(node, stdev) => {
                if !stdev.is_finite() || *stdev < 0.0 {
                    return Err(Error::InvalidConfig(format!("noise stdev must be non-negative, got {stdev}")));
                }

                Ok(shape(node))
            }
            MeanSquaredError { prediction, target } => {
                ret(shape(prediction) == shape(target), scalar, mismatch(&[prediction, target]))
            }
            Penalty { .. } => Ok(scalar),
        }
    }

    pub fn nodes(&self) -> Vec<Node> {
        use Operation::*;

        match *self {
            Activate(node, _) => vec![node],
            Affine { weights, bias, input } => vec![weights, bias, input],
            Add(a, b) => vec![a, b],
            GaussianNoise(node, _) => vec![node],
            MeanSquaredError { prediction, target } => vec![prediction, target],
            Penalty { input, .. } => vec![input],
        }
    }
}

impl Graph {
    pub(super) fn forward_node(&self, output_node: Node, ctx: &mut ExecutionContext) {
        use Operation::*;

        let op = if let Some(op) = &self.operations[output_node.0] { op } else { return };

        let get = |node: Node| self.nodes[node.0].borrow();

        let output_tensor = &mut *self.nodes[output_node.0].borrow_mut();
        let output = &mut output_tensor.values;

        match op {
            Activate(node, act) => DenseMatrix::activate(*act, &get(*node).values, output),
            Affine { weights, bias, input } => {
                DenseMatrix::affine(&get(*weights).values, &get(*input).values, &get(*bias).values, output)
            }
            Add(a, b) => DenseMatrix::add(&get(*a).values, &get(*b).values, output),
            GaussianNoise(node, stdev) => {
                let input = get(*node);

                if ctx.training && *stdev > 0.0 {
                    DenseMatrix::add_gaussian_noise(*stdev, &mut ctx.rng, &input.values, output);
                } else {
                    input.values.copy_into(output);
                }
            }
            MeanSquaredError { prediction, target } => {
                DenseMatrix::squared_error(&get(*prediction).values, &get(*target).values, output)
            }
            Penalty { input, regularizer, on_weights } => {
                let scale = if *on_weights { ctx.batch_size as f32 } else { 1.0 };
                let penalty = regularizer.penalty(get(*input).values.values());
                output.load_from_slice(Shape::new(1, 1), &[scale * penalty]);
            }
        }
    }

    pub(super) fn backward_node(&self, output_node: Node, ctx: &ExecutionContext) {
        use Operation::*;

        let op = if let Some(op) = &self.operations[output_node.0] { op } else { return };

        let get = |node: Node| self.nodes[node.0].borrow_mut();

        let output_tensor = &*self.nodes[output_node.0].borrow();
        let output_grad = if let Some(grad) = output_tensor.gradients.as_ref() { grad } else { return };

        match op {
            Activate(node, act) => {
                let node = &mut *get(*node);
                if let Some(grad) = node.gradients.as_mut() {
                    DenseMatrix::backprop_activate(*act, &node.values, &output_tensor.values, grad, output_grad);
                }
            }
            Affine { weights, bias, input } => {
                let w = &mut *get(*weights);
                let b = &mut *get(*bias);
                let i = &mut *get(*input);

                DenseMatrix::backprop_affine(
                    &w.values,
                    w.gradients.as_mut(),
                    &i.values,
                    i.gradients.as_mut(),
                    b.gradients.as_mut(),
                    output_grad,
                );
            }
            Add(a, b) => {
                for node in [a, b] {
                    if let Some(grad) = get(*node).gradients.as_mut() {
                        grad.add_assign(output_grad);
                    }
                }
            }
            GaussianNoise(node, _) => {
                if let Some(grad) = get(*node).gradients.as_mut() {
                    grad.add_assign(output_grad);
                }
            }
            MeanSquaredError { prediction, target } => {
                let p = &mut *get(*prediction);
                let t = &mut *get(*target);

                if let Some(grad) = p.gradients.as_mut() {
                    DenseMatrix::backprop_squared_error(&p.values, &t.values, output_grad, grad);
                }

                if let Some(grad) = t.gradients.as_mut() {
                    DenseMatrix::backprop_squared_error(&t.values, &p.values, output_grad, grad);
                }
            }
            Penalty { input, regularizer, on_weights } => {
                let input = &mut *get(*input);
                let scale = if *on_weights { ctx.batch_size as f32 } else { 1.0 };
                let values = &input.values;

                if let Some(grad) = input.gradients.as_mut() {
                    grad.reshape_if_needed(values.shape());
                    regularizer.accumulate_gradient(values.values(), grad.values_mut(), scale * output_grad.values()[0]);
                }
            }
        }
    }
}
