use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid constraint bounds: min_value {min} is greater than max_value {max}")]
    InvalidBounds { min: f32, max: f32 },

    #[error("invalid regularizer parameter `{name}`: {value}")]
    InvalidRegularizer { name: &'static str, value: f32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("shape mismatch in {op}: {message}")]
    ShapeMismatch { op: &'static str, message: String },

    #[error("layer `{layer}` was built for {expected} inputs but was called on {got}")]
    LayerInputMismatch { layer: String, expected: usize, got: usize },

    #[error("operation {0} reads the same node more than once")]
    AliasedNode(&'static str),

    #[error("duplicate node id `{0}`")]
    DuplicateId(String),

    #[error("unknown input `{0}`")]
    UnknownInput(String),

    #[error("unknown weights `{0}`")]
    UnknownWeights(String),

    #[error("unknown {kind} `{name}`")]
    UnknownName { kind: &'static str, name: String },

    #[error("model `{0}` must be compiled before training")]
    NotCompiled(String),

    #[error("loss became NaN during epoch {epoch} of model `{model}`")]
    Diverged { model: String, epoch: usize },

    #[error("malformed weights file: {0}")]
    Format(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
