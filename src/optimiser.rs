mod adam;
mod clip;
mod rmsprop;
mod sgd;
pub mod utils;

use std::{collections::HashMap, str::FromStr};

pub use adam::{Adam, AdamParams, AdamW, AdamWParams};
pub use clip::Constrained;
pub use rmsprop::{RmsProp, RmsPropParams};
pub use sgd::{Sgd, SgdParams};
pub use utils::Placement;

use crate::{
    error::{Error, Result},
    graph::Graph,
    tensor::DenseMatrix,
};

/// Per-weight optimiser state.
pub trait OptimiserState: std::fmt::Debug {
    /// `grads` are scaled by `gradient_factor` before use.
    fn update(&mut self, weights: &mut DenseMatrix, grads: &DenseMatrix, gradient_factor: f32, learning_rate: f32);

    fn reset(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OptimiserKind {
    Sgd(SgdParams),
    RmsProp(RmsPropParams),
    Adam(AdamParams),
    AdamW(AdamWParams),
}

impl Default for OptimiserKind {
    fn default() -> Self {
        Self::RmsProp(RmsPropParams::default())
    }
}

impl OptimiserKind {
    pub fn name(&self) -> &'static str {
        match self {
            OptimiserKind::Sgd(_) => "sgd",
            OptimiserKind::RmsProp(_) => "rmsprop",
            OptimiserKind::Adam(_) => "adam",
            OptimiserKind::AdamW(_) => "adamw",
        }
    }

    pub fn default_learning_rate(&self) -> f32 {
        match self {
            OptimiserKind::Sgd(_) => 0.01,
            _ => 0.001,
        }
    }

    pub fn new_state(&self, size: usize) -> Box<dyn OptimiserState> {
        match *self {
            OptimiserKind::Sgd(params) => Box::new(Sgd::new(size, params)),
            OptimiserKind::RmsProp(params) => Box::new(RmsProp::new(size, params)),
            OptimiserKind::Adam(params) => Box::new(Adam::new(size, params)),
            OptimiserKind::AdamW(params) => Box::new(AdamW::new(size, params)),
        }
    }
}

impl FromStr for OptimiserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sgd" => Ok(Self::Sgd(SgdParams::default())),
            "rmsprop" => Ok(Self::RmsProp(RmsPropParams::default())),
            "adam" => Ok(Self::Adam(AdamParams::default())),
            "adamw" => Ok(Self::AdamW(AdamWParams::default())),
            _ => Err(Error::UnknownName { kind: "optimiser", name: s.to_string() }),
        }
    }
}

/// Owns one [`OptimiserState`] per weight id of a graph.
#[derive(Debug)]
pub struct Optimiser {
    kind: OptimiserKind,
    learning_rate: f32,
    state: HashMap<String, Box<dyn OptimiserState>>,
}

impl Optimiser {
    pub fn new(kind: OptimiserKind) -> Self {
        Self { kind, learning_rate: kind.default_learning_rate(), state: HashMap::new() }
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn kind(&self) -> OptimiserKind {
        self.kind
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Replaces the state of one weight, e.g. to wrap it in [`Constrained`].
    pub fn set_state(&mut self, id: &str, state: Box<dyn OptimiserState>) {
        self.state.insert(id.to_string(), state);
    }

    pub fn update(&mut self, graph: &Graph, gradient_factor: f32) -> Result<()> {
        for id in graph.weight_ids() {
            let handle = graph.weights_handle(&id)?;
            let tensor = &mut *handle.borrow_mut();

            let grads = if let Some(grads) = tensor.gradients.as_ref() { grads } else { continue };

            if grads.shape() != tensor.values.shape() {
                return Err(Error::ShapeMismatch {
                    op: "optimiser",
                    message: format!("gradient of `{id}` is {}, weights are {}", grads.shape(), tensor.values.shape()),
                });
            }

            let size = tensor.values.shape().size();
            let state = self.state.entry(id).or_insert_with(|| self.kind.new_state(size));
            state.update(&mut tensor.values, grads, gradient_factor, self.learning_rate);
        }

        Ok(())
    }

    pub fn reset_state(&mut self) {
        for single in self.state.values_mut() {
            single.reset();
        }
    }
}
