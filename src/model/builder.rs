use std::rc::Rc;

use log::debug;
use rand::rngs::StdRng;

use crate::{
    constraint::Constraint,
    error::{Error, Result},
    graph::{GraphBuilder, Node, Operation},
    layers::{Dense, GaussianNoise},
    rng,
    tensor::Activation,
};

use super::{LayerSummary, Model, INPUT_ID, TARGET_ID};

/// Functional model construction: start from [`ModelBuilder::input`] and
/// apply layers to nodes, then pick the output node.
pub struct ModelBuilder {
    name: String,
    graph: GraphBuilder,
    rng: StdRng,
    seed: Option<u64>,
    input: Option<Node>,
    dense: Vec<(Rc<Dense>, Node, Node)>,
    penalties: Vec<Node>,
    constraints: Vec<(String, Rc<dyn Constraint>)>,
    layers: Vec<LayerSummary>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>, seed: Option<u64>) -> Self {
        Self {
            name: name.into(),
            graph: GraphBuilder::default(),
            rng: rng::seeded(seed),
            seed,
            input: None,
            dense: Vec::new(),
            penalties: Vec::new(),
            constraints: Vec::new(),
            layers: Vec::new(),
        }
    }

    /// The single data input of the model.
    pub fn input(&mut self, size: usize) -> Result<Node> {
        if self.input.is_some() {
            return Err(Error::DuplicateId(INPUT_ID.to_string()));
        }

        if size == 0 {
            return Err(Error::InvalidConfig("model input must have at least one feature".to_string()));
        }

        let node = self.graph.create_input(INPUT_ID, size)?;
        self.input = Some(node);
        self.layers.push(LayerSummary { name: INPUT_ID.to_string(), kind: "InputLayer", units: size, params: 0 });

        Ok(node)
    }

    pub fn noise(&mut self, layer: &GaussianNoise, node: Node) -> Result<Node> {
        let out = self.graph.create_result_of_operation(Operation::GaussianNoise(node, layer.stdev()))?;
        let units = self.graph.shape_of(node).rows();

        let name = format!("gaussian_noise_{}", self.layers.len());
        self.layers.push(LayerSummary { name, kind: "GaussianNoise", units, params: 0 });

        Ok(out)
    }

    pub fn dense(&mut self, layer: &Rc<Dense>, node: Node) -> Result<Node> {
        let input_size = self.graph.shape_of(node).rows();
        let params = layer.build(input_size, &mut self.rng)?;

        let existing = self.dense.iter().find(|(other, ..)| Rc::ptr_eq(other, layer));

        let (kernel, bias) = match existing {
            Some(&(_, kernel, bias)) => (kernel, bias),
            None => {
                if self.dense.iter().any(|(other, ..)| other.name() == layer.name()) {
                    return Err(Error::DuplicateId(layer.name().to_string()));
                }

                let kernel = self.graph.create_weights(&layer.kernel_id(), params.kernel.clone())?;
                let bias = self.graph.create_weights(&layer.bias_id(), params.bias.clone())?;

                if let Some(constraint) = layer.kernel_constraint() {
                    self.constraints.push((layer.kernel_id(), constraint.clone()));
                }

                if let Some(constraint) = layer.bias_constraint() {
                    self.constraints.push((layer.bias_id(), constraint.clone()));
                }

                if let Some(regularizer) = layer.kernel_regularizer() {
                    let op = Operation::Penalty { input: kernel, regularizer: regularizer.clone(), on_weights: true };
                    let penalty = self.graph.create_result_of_operation(op)?;
                    self.penalties.push(penalty);
                }

                self.dense.push((layer.clone(), kernel, bias));
                debug!("model `{}` uses layer `{}`", self.name, layer.name());

                // a layer applied again shares these weights, so it is listed once
                self.layers.push(LayerSummary {
                    name: layer.name().to_string(),
                    kind: "Dense",
                    units: layer.units(),
                    params: layer.num_params(),
                });

                (kernel, bias)
            }
        };

        let mut out = self.graph.create_result_of_operation(Operation::Affine { weights: kernel, bias, input: node })?;

        if layer.activation() != Activation::Linear {
            out = self.graph.create_result_of_operation(Operation::Activate(out, layer.activation()))?;
        }

        if let Some(regularizer) = layer.activity_regularizer() {
            let op = Operation::Penalty { input: out, regularizer: regularizer.clone(), on_weights: false };
            let penalty = self.graph.create_result_of_operation(op)?;
            self.penalties.push(penalty);
        }

        Ok(out)
    }

    /// Adds a target input matching `output` and a mean squared error loss,
    /// plus any regularization penalties.
    pub fn build(mut self, output: Node) -> Result<Model> {
        let input = self.input.ok_or_else(|| Error::InvalidConfig(format!("model `{}` has no input", self.name)))?;

        let input_size = self.graph.shape_of(input).rows();
        let output_size = self.graph.shape_of(output).rows();

        let target = self.graph.create_input(TARGET_ID, output_size)?;
        let mut loss =
            self.graph.create_result_of_operation(Operation::MeanSquaredError { prediction: output, target })?;

        for penalty in std::mem::take(&mut self.penalties) {
            loss = self.graph.create_result_of_operation(Operation::Add(loss, penalty))?;
        }

        let graph = self.graph.build(output, Some(loss), self.seed);

        Ok(Model {
            name: self.name,
            graph,
            input_size,
            output_size,
            layers: self.layers,
            constraints: self.constraints,
            optimiser: None,
            metrics: Vec::new(),
        })
    }
}
