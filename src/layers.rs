//! Layers are parameter holders. Applying one to a node of a
//! [`ModelBuilder`](crate::model::ModelBuilder) adds its operations to that
//! model, and applying the same `Rc<Dense>` in several models shares its
//! weights between them.

mod dense;
mod noise;

pub use dense::{Dense, DenseParams};
pub use noise::GaussianNoise;
