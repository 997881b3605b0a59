pub mod builder;
pub mod operation;


use std::{
    cell::{Ref, RefCell},
    collections::HashMap,
};

use rand::rngs::StdRng;

pub use builder::{GraphBuilder, Node};
pub use operation::Operation;

use crate::{
    error::{Error, Result},
    tensor::{DenseMatrix, SharedTensor, Tensor},
};

/// State that operations may read or mutate while executing.
pub struct ExecutionContext {
    pub training: bool,
    pub rng: StdRng,
    pub batch_size: usize,
}

pub struct Graph {
    nodes: Vec<SharedTensor>,
    operations: Vec<Option<Operation>>,
    output: Node,
    loss: Option<Node>,
    inputs: HashMap<String, Node>,
    weights: HashMap<String, Node>,
    predict_plan: Vec<Node>,
    train_plan: Vec<Node>,
    ctx: RefCell<ExecutionContext>,
}

impl Graph {
    fn run(&self, plan: &[Node], training: bool) {
        let mut ctx = self.ctx.borrow_mut();
        ctx.training = training;

        for &node in plan {
            self.forward_node(node, &mut ctx);
        }
    }

    fn loss_value(&self) -> Result<f32> {
        let loss = self.loss.ok_or_else(|| Error::InvalidConfig("graph has no loss node".to_string()))?;
        let value = self.nodes[loss.0].borrow().get_scalar();
        value.ok_or_else(|| Error::ShapeMismatch { op: "forward", message: "loss is not a scalar".to_string() })
    }

    /// Runs the training plan with training-only operations enabled,
    /// returning the loss.
    pub fn forward(&mut self) -> Result<f32> {
        self.run(&self.train_plan, true);
        self.loss_value()
    }

    /// Loss with training-only operations (noise) disabled.
    pub fn forward_inference(&mut self) -> Result<f32> {
        self.run(&self.train_plan, false);
        self.loss_value()
    }

    pub fn backward(&mut self) {
        let loss = if let Some(loss) = self.loss { loss } else { return };

        self.nodes[loss.0].borrow_mut().set_grad_to_unit();

        let ctx = self.ctx.borrow();
        for &node in self.train_plan.iter().rev() {
            self.backward_node(node, &ctx);
        }
    }

    /// Computes the output node only, in inference mode.
    pub fn predict(&mut self) -> DenseMatrix {
        self.run(&self.predict_plan, false);
        self.nodes[self.output.0].borrow().values.clone()
    }

    /// Copies a batch into an input node. Every input stored before a
    /// pass must hold the same number of samples.
    pub fn store_input(&mut self, input: &str, data: &DenseMatrix) -> Result<()> {
        let node = *self.inputs.get(input).ok_or_else(|| Error::UnknownInput(input.to_string()))?;
        let expected = self.nodes[node.0].borrow().shape().rows();

        if data.shape().rows() != expected {
            return Err(Error::ShapeMismatch {
                op: "store_input",
                message: format!("input `{input}` has {expected} features, got {}", data.shape().rows()),
            });
        }

        data.copy_into(&mut self.nodes[node.0].borrow_mut().values);
        self.ctx.get_mut().batch_size = data.num_samples();

        Ok(())
    }

    pub fn zero_grads(&mut self) {
        for node in &self.nodes {
            node.borrow_mut().zero_grad();
        }
    }

    pub fn weight_ids(&self) -> Vec<String> {
        let mut ids = self.weights.keys().cloned().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn get_weights(&self, id: &str) -> Result<Ref<'_, Tensor>> {
        let node = self.weights.get(id).ok_or_else(|| Error::UnknownWeights(id.to_string()))?;
        Ok(self.nodes[node.0].borrow())
    }

    pub fn weights_handle(&self, id: &str) -> Result<SharedTensor> {
        let node = self.weights.get(id).ok_or_else(|| Error::UnknownWeights(id.to_string()))?;
        Ok(self.nodes[node.0].clone())
    }

    pub fn get_node(&self, node: Node) -> Ref<'_, Tensor> {
        self.nodes[node.0].borrow()
    }

    pub fn output_node(&self) -> Node {
        self.output
    }

    pub fn get_num_params(&self) -> usize {
        self.weights.values().map(|node| self.nodes[node.0].borrow().shape().size()).sum()
    }
}
