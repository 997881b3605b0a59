mod builder;
mod summary;
mod training;

#[cfg(test)]
mod tests;

use std::{path::Path, rc::Rc, str::FromStr};

pub use builder::ModelBuilder;
pub use training::{EpochStats, FitOptions, History};

use crate::{
    constraint::Constraint,
    error::{Error, Result},
    graph::Graph,
    optimiser::{
        utils::{self, StagedWeights},
        Constrained, Optimiser, OptimiserKind, Placement,
    },
    tensor::DenseMatrix,
};

pub(crate) const INPUT_ID: &str = "input";
pub(crate) const TARGET_ID: &str = "target";

/// Samples per forward pass when predicting or evaluating.
const INFERENCE_BATCH: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    /// Fraction of samples whose largest output matches the largest target.
    Accuracy,
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accuracy" | "acc" => Ok(Self::Accuracy),
            _ => Err(Error::UnknownName { kind: "metric", name: s.to_string() }),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct LayerSummary {
    name: String,
    kind: &'static str,
    units: usize,
    params: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: Option<f32>,
}

pub struct Model {
    name: String,
    graph: Graph,
    input_size: usize,
    output_size: usize,
    layers: Vec<LayerSummary>,
    constraints: Vec<(String, Rc<dyn Constraint>)>,
    optimiser: Option<Optimiser>,
    metrics: Vec<Metric>,
}

impl Model {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn num_params(&self) -> usize {
        self.graph.get_num_params()
    }

    pub fn is_compiled(&self) -> bool {
        self.optimiser.is_some()
    }

    pub fn compile(&mut self, kind: OptimiserKind, metrics: &[Metric]) {
        self.compile_with(Optimiser::new(kind), metrics);
    }

    /// Compiles with a preconfigured optimiser, e.g. with a custom learning
    /// rate. Constrained parameters get their constraint enforced after
    /// every step.
    pub fn compile_with(&mut self, mut optimiser: Optimiser, metrics: &[Metric]) {
        let kind = optimiser.kind();

        for (id, constraint) in &self.constraints {
            let size = self.graph.get_weights(id).map(|w| w.shape().size()).unwrap_or_default();
            let state = Constrained::new(kind.new_state(size), constraint.clone(), Placement::After);
            optimiser.set_state(id, Box::new(state));
        }

        self.optimiser = Some(optimiser);
        self.metrics = metrics.to_vec();
    }

    fn check_features(&self, what: &str, data: &DenseMatrix, expected: usize) -> Result<()> {
        if data.shape().rows() != expected {
            return Err(Error::InvalidData(format!(
                "{what} for model `{}` has {} features, expected {expected}",
                self.name,
                data.shape().rows()
            )));
        }

        Ok(())
    }

    fn check_pair(&self, x: &DenseMatrix, y: &DenseMatrix) -> Result<()> {
        self.check_features("input", x, self.input_size)?;
        self.check_features("target", y, self.output_size)?;

        if x.num_samples() != y.num_samples() {
            return Err(Error::InvalidData(format!(
                "{} input samples but {} target samples",
                x.num_samples(),
                y.num_samples()
            )));
        }

        Ok(())
    }

    /// Model output for every sample of `x`, with training-only layers
    /// disabled.
    pub fn predict(&mut self, x: &DenseMatrix) -> Result<DenseMatrix> {
        self.check_features("input", x, self.input_size)?;

        let indices = (0..x.num_samples()).collect::<Vec<_>>();
        let mut result: Option<DenseMatrix> = None;

        for chunk in indices.chunks(INFERENCE_BATCH) {
            self.graph.store_input(INPUT_ID, &x.select_samples(chunk))?;
            let out = self.graph.predict();

            match result.as_mut() {
                Some(result) => result.append_samples(&out),
                None => result = Some(out),
            }
        }

        result.ok_or_else(|| Error::InvalidData("cannot predict on zero samples".to_string()))
    }

    /// Mean loss (including penalties) and metrics over `(x, y)`.
    pub fn evaluate(&mut self, x: &DenseMatrix, y: &DenseMatrix) -> Result<Evaluation> {
        self.check_pair(x, y)?;

        let indices = (0..x.num_samples()).collect::<Vec<_>>();
        let mut total_loss = 0.0;
        let mut correct = 0;

        for chunk in indices.chunks(INFERENCE_BATCH) {
            let yb = y.select_samples(chunk);
            self.graph.store_input(INPUT_ID, &x.select_samples(chunk))?;
            self.graph.store_input(TARGET_ID, &yb)?;

            total_loss += self.graph.forward_inference()?;
            correct += self.count_correct(&yb);
        }

        let samples = x.num_samples() as f32;

        Ok(Evaluation { loss: total_loss / samples, accuracy: self.accuracy(correct, samples) })
    }

    fn count_correct(&self, target: &DenseMatrix) -> usize {
        if !self.metrics.contains(&Metric::Accuracy) {
            return 0;
        }

        let output = self.graph.get_node(self.graph.output_node());
        let predicted = output.values.argmax_per_sample();

        predicted.iter().zip(target.argmax_per_sample()).filter(|(p, t)| **p == *t).count()
    }

    fn accuracy(&self, correct: usize, samples: f32) -> Option<f32> {
        self.metrics.contains(&Metric::Accuracy).then(|| correct as f32 / samples)
    }

    pub fn save_weights(&self, path: impl AsRef<Path>) -> Result<()> {
        utils::write_graph_weights_to_file(&self.graph, path)
    }

    /// Replaces the weights with those in `path` and clears the optimiser
    /// moments. On error the model is left as it was.
    pub fn load_weights(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let staged = self.stage_weights(path)?;
        self.apply_weights(staged);
        Ok(())
    }

    pub(crate) fn stage_weights(&self, path: impl AsRef<Path>) -> Result<StagedWeights> {
        utils::stage_graph_weights_from_file(&self.graph, path)
    }

    pub(crate) fn apply_weights(&mut self, staged: StagedWeights) {
        utils::apply_staged_weights(staged);
        self.reset_optimiser();
    }

    pub(crate) fn reset_optimiser(&mut self) {
        if let Some(optimiser) = self.optimiser.as_mut() {
            optimiser.reset_state();
        }
    }

    /// Current values of a parameter, by id (`"{layer}/kernel"` or
    /// `"{layer}/bias"`).
    pub fn weights(&self, id: &str) -> Result<DenseMatrix> {
        Ok(self.graph.get_weights(id)?.values.clone())
    }
}
