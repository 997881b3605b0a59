//! Stacked denoising autoencoders.
//!
//! Model `i` (1-based) encodes through the first `i` encoder layers and
//! decodes back through `i - 1` hidden decoders plus its own linear output
//! layer. Encoders are shared by every model deep enough to use them, and
//! hidden decoders are memoized so deeper models reuse what shallower
//! models already trained.

use std::{collections::HashMap, path::Path, rc::Rc};

use log::{debug, info};

use crate::{
    error::{Error, Result},
    graph::Node,
    layers::{Dense, GaussianNoise},
    model::{Evaluation, FitOptions, History, Metric, Model, ModelBuilder},
    optimiser::OptimiserKind,
    rng::Initializer,
    tensor::{Activation, DenseMatrix},
};

/// Epochs per model used by [`StackedAutoencoder::fit_default`].
pub const DEFAULT_EPOCHS: [usize; 4] = [60, 60, 60, 100];

/// Which models may reuse a hidden decoder layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecoderSharing {
    /// A decoder with a given target size is built once and reused by
    /// every deeper model.
    #[default]
    AcrossModels,
    /// Every model gets its own hidden decoders.
    PerModel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecoderKey {
    pub size: usize,
    pub input_size: usize,
    pub depth: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StackedAutoencoderConfig {
    /// Encoder widths, outermost first.
    pub layer_sizes: Vec<usize>,
    pub input_size: usize,
    pub noise_stdev: f32,
    pub batch_size: usize,
    pub optimiser: OptimiserKind,
    pub activation: Activation,
    pub decoder_sharing: DecoderSharing,
    pub seed: Option<u64>,
}

impl Default for StackedAutoencoderConfig {
    fn default() -> Self {
        Self {
            layer_sizes: vec![26, 16, 8, 4],
            input_size: 32,
            noise_stdev: 0.1,
            batch_size: 1024,
            optimiser: OptimiserKind::default(),
            activation: Activation::Sigmoid,
            decoder_sharing: DecoderSharing::default(),
            seed: None,
        }
    }
}

impl StackedAutoencoderConfig {
    fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(Error::InvalidConfig("input size must be positive".to_string()));
        }

        if self.layer_sizes.is_empty() {
            return Err(Error::InvalidConfig("at least one encoder layer is required".to_string()));
        }

        if let Some(idx) = self.layer_sizes.iter().position(|&size| size == 0) {
            return Err(Error::InvalidConfig(format!("encoder layer {} has zero units", idx + 1)));
        }

        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".to_string()));
        }

        Ok(())
    }

    /// Input size followed by the encoder widths.
    fn widths(&self) -> Vec<usize> {
        std::iter::once(self.input_size).chain(self.layer_sizes.iter().copied()).collect()
    }

    fn model_seed(&self, offset: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(offset as u64))
    }
}

pub struct StackedAutoencoder {
    config: StackedAutoencoderConfig,
    encoders: Vec<Rc<Dense>>,
    decoder_memory: HashMap<DecoderKey, Rc<Dense>>,
    models: Vec<Model>,
    encoder_models: Vec<Model>,
    encoder: Model,
}

impl StackedAutoencoder {
    pub fn new(config: StackedAutoencoderConfig) -> Result<Self> {
        config.validate()?;

        let noise = GaussianNoise::new(config.noise_stdev)?;
        let widths = config.widths();
        let depth = config.layer_sizes.len();

        let encoders = (1..=depth)
            .map(|i| Rc::new(hidden_layer(&format!("encoder_N{i}"), widths[i], config.activation)))
            .collect::<Vec<_>>();

        let mut decoder_memory = HashMap::new();
        let mut models = Vec::with_capacity(depth);
        let mut encoder_models = Vec::with_capacity(depth);

        for i in 1..=depth {
            let mut builder = ModelBuilder::new(format!("autoencoder_{i}"), config.model_seed(2 * i));
            let mut node = encode(&mut builder, &noise, &encoders[..i], config.input_size)?;

            for k in 1..i {
                let j = i - k;
                let key = DecoderKey {
                    size: widths[j],
                    input_size: widths[j + 1],
                    depth: match config.decoder_sharing {
                        DecoderSharing::AcrossModels => None,
                        DecoderSharing::PerModel => Some(i),
                    },
                };

                let decoder = decoder_memory
                    .entry(key)
                    .or_insert_with(|| {
                        debug!("new decoder `decoder_N{j}` for {key:?}");
                        Rc::new(hidden_layer(&format!("decoder_N{j}"), widths[j], config.activation))
                    })
                    .clone();

                node = builder.dense(&decoder, node)?;
            }

            let out = Rc::new(hidden_layer("decoder_out", config.input_size, Activation::Linear));
            node = builder.dense(&out, node)?;

            let mut model = builder.build(node)?;
            model.compile(config.optimiser, &[Metric::Accuracy]);
            models.push(model);

            let mut builder = ModelBuilder::new(format!("encoder_{i}"), config.model_seed(2 * i + 1));
            let code = encode(&mut builder, &noise, &encoders[..i], config.input_size)?;
            encoder_models.push(builder.build(code)?);
        }

        let mut builder = ModelBuilder::new("encoder", config.model_seed(0));
        let code = encode(&mut builder, &noise, &encoders, config.input_size)?;
        let mut encoder = builder.build(code)?;
        encoder.compile(config.optimiser, &[Metric::Accuracy]);

        info!("built {depth} stacked autoencoders with {} hidden decoders", decoder_memory.len());

        Ok(Self { config, encoders, decoder_memory, models, encoder_models, encoder })
    }

    pub fn config(&self) -> &StackedAutoencoderConfig {
        &self.config
    }

    /// Autoencoders ordered by depth.
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Uncompiled `input -> encoder_N{i}` models, ordered by depth.
    pub fn encoder_models(&self) -> &[Model] {
        &self.encoder_models
    }

    pub fn encoder_layers(&self) -> &[Rc<Dense>] {
        &self.encoders
    }

    /// The deepest encoder, compiled.
    pub fn encoder(&self) -> &Model {
        &self.encoder
    }

    /// The deepest autoencoder.
    pub fn decoder(&self) -> &Model {
        // non-empty after validation
        &self.models[self.models.len() - 1]
    }

    /// Number of distinct hidden decoder layers.
    pub fn decoder_count(&self) -> usize {
        self.decoder_memory.len()
    }

    /// Trains `models[k]` for `epochs[k]` epochs to reconstruct `x`. Models
    /// without an epoch count, and epoch counts without a model, are
    /// skipped.
    pub fn fit(&mut self, x: &DenseMatrix, batch_size: usize, epochs: &[usize], verbose: u8) -> Result<Vec<History>> {
        let mut histories = Vec::with_capacity(epochs.len().min(self.models.len()));

        for (k, (model, &epochs)) in self.models.iter_mut().zip(epochs).enumerate() {
            let options = FitOptions {
                batch_size,
                epochs,
                shuffle: true,
                verbose,
                seed: self.config.seed.map(|seed| seed.wrapping_mul(31).wrapping_add(k as u64)),
            };

            histories.push(model.fit(x, x, &options)?);
        }

        Ok(histories)
    }

    /// [`Self::fit`] with the configured batch size and [`DEFAULT_EPOCHS`].
    pub fn fit_default(&mut self, x: &DenseMatrix, verbose: u8) -> Result<Vec<History>> {
        self.fit(x, self.config.batch_size, &DEFAULT_EPOCHS, verbose)
    }

    /// Codes of the deepest encoder for every sample.
    pub fn compress(&mut self, x: &DenseMatrix) -> Result<DenseMatrix> {
        self.encoder.predict(x)
    }

    /// Reconstruction quality of the deepest autoencoder.
    pub fn evaluate(&mut self, x: &DenseMatrix) -> Result<Evaluation> {
        let last = self.models.len() - 1;
        self.models[last].evaluate(x, x)
    }

    pub fn summaries(&self) -> Vec<String> {
        self.models.iter().map(Model::summary).collect()
    }

    /// Writes `model_{i}.bin` for every autoencoder into `dir`.
    pub fn save_weights(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        for (idx, model) in self.models.iter().enumerate() {
            model.save_weights(dir.join(format!("model_{}.bin", idx + 1)))?;
        }

        Ok(())
    }

    /// Loads what [`Self::save_weights`] wrote. Shared layers take the
    /// values of the last file that contains them. Every file is read and
    /// checked before any weight changes.
    pub fn load_weights(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();

        let staged = self
            .models
            .iter()
            .enumerate()
            .map(|(idx, model)| model.stage_weights(dir.join(format!("model_{}.bin", idx + 1))))
            .collect::<Result<Vec<_>>>()?;

        for (model, staged) in self.models.iter_mut().zip(staged) {
            model.apply_weights(staged);
        }

        self.encoder.reset_optimiser();

        Ok(())
    }
}

fn hidden_layer(name: &str, units: usize, activation: Activation) -> Dense {
    Dense::new(units)
        .with_name(name)
        .with_activation(activation)
        .with_kernel_initializer(Initializer::random_uniform())
        .with_bias_initializer(Initializer::Zeros)
}

fn encode(
    builder: &mut ModelBuilder,
    noise: &GaussianNoise,
    encoders: &[Rc<Dense>],
    input_size: usize,
) -> Result<Node> {
    let input = builder.input(input_size)?;
    let mut node = builder.noise(noise, input)?;

    for encoder in encoders {
        node = builder.dense(encoder, node)?;
    }

    Ok(node)
}
