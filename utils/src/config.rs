use sae::{Activation, DecoderSharing, OptimiserKind, StackedAutoencoderConfig};
use structopt::StructOpt;

/// Flags shared by every command that builds a stack.
#[derive(StructOpt)]
pub struct StackOptions {
    /// Encoder widths, outermost first.
    #[structopt(long, use_delimiter = true, default_value = "26,16,8,4")]
    pub layer_sizes: Vec<usize>,
    #[structopt(long, default_value = "32")]
    pub input_size: usize,
    #[structopt(long, default_value = "0.1")]
    pub noise_stdev: f32,
    #[structopt(long, default_value = "1024")]
    pub batch_size: usize,
    /// One of sgd, rmsprop, adam, adamw.
    #[structopt(long, default_value = "rmsprop")]
    pub optimiser: OptimiserKind,
    #[structopt(long, default_value = "sigmoid")]
    pub activation: Activation,
    /// Give every model its own hidden decoders.
    #[structopt(long)]
    pub per_model_decoders: bool,
    #[structopt(long)]
    pub seed: Option<u64>,
}

impl StackOptions {
    pub fn config(&self) -> StackedAutoencoderConfig {
        StackedAutoencoderConfig {
            layer_sizes: self.layer_sizes.clone(),
            input_size: self.input_size,
            noise_stdev: self.noise_stdev,
            batch_size: self.batch_size,
            optimiser: self.optimiser,
            activation: self.activation,
            decoder_sharing: if self.per_model_decoders {
                DecoderSharing::PerModel
            } else {
                DecoderSharing::AcrossModels
            },
            seed: self.seed,
        }
    }
}
