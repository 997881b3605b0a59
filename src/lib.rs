pub mod constraint;
pub mod error;
pub mod graph;
pub mod layers;
pub mod logger;
pub mod model;
pub mod optimiser;
pub mod regularizer;
pub mod rng;
pub mod shape;
pub mod stacked;
pub mod tensor;

pub use constraint::{Constraint, MinMaxConstraint};
pub use error::{Error, Result};
pub use layers::{Dense, GaussianNoise};
pub use model::{Evaluation, FitOptions, History, Metric, Model, ModelBuilder};
pub use optimiser::{Optimiser, OptimiserKind};
pub use regularizer::{MaximiseDiscrepancy, Regularizer};
pub use stacked::{DecoderSharing, StackedAutoencoder, StackedAutoencoderConfig, DEFAULT_EPOCHS};
pub use tensor::{Activation, DenseMatrix};
