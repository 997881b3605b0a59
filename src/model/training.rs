use std::time::Instant;

use log::{info, warn};
use rand::seq::SliceRandom;

use crate::{
    error::{Error, Result},
    logger, rng,
    tensor::DenseMatrix,
};

use super::{Model, INPUT_ID, TARGET_ID};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FitOptions {
    pub batch_size: usize,
    pub epochs: usize,
    pub shuffle: bool,
    /// 0 is silent, 1 reports every batch, 2 reports every epoch.
    pub verbose: u8,
    /// Seeds the per-epoch shuffle.
    pub seed: Option<u64>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self { batch_size: 32, epochs: 1, shuffle: true, verbose: 0, seed: None }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct History {
    pub epochs: Vec<EpochStats>,
}

impl History {
    pub fn losses(&self) -> Vec<f32> {
        self.epochs.iter().map(|stats| stats.loss).collect()
    }

    pub fn final_loss(&self) -> Option<f32> {
        self.epochs.last().map(|stats| stats.loss)
    }
}

impl Model {
    /// Trains on `(x, y)` with mean squared error plus any regularization
    /// penalties. Losses are reported per sample.
    pub fn fit(&mut self, x: &DenseMatrix, y: &DenseMatrix, options: &FitOptions) -> Result<History> {
        if self.optimiser.is_none() {
            return Err(Error::NotCompiled(self.name.clone()));
        }

        if options.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".to_string()));
        }

        self.check_pair(x, y)?;

        let samples = x.num_samples();
        let batches = samples.div_ceil(options.batch_size);
        let mut shuffler = rng::seeded(options.seed);
        let mut indices = (0..samples).collect::<Vec<_>>();
        let mut history = History::default();

        info!("fitting `{}`: {samples} samples, {} epochs", self.name, options.epochs);

        if options.verbose > 0 {
            logger::report_training_start(&self.name, options.epochs, samples, options.batch_size);
        }

        let timer = Instant::now();

        for epoch in 1..=options.epochs {
            let epoch_timer = Instant::now();

            if options.shuffle {
                indices.shuffle(&mut shuffler);
            }

            let mut total_loss = 0.0;
            let mut correct = 0;

            for (batch, chunk) in indices.chunks(options.batch_size).enumerate() {
                let yb = y.select_samples(chunk);
                self.graph.store_input(INPUT_ID, &x.select_samples(chunk))?;
                self.graph.store_input(TARGET_ID, &yb)?;

                self.graph.zero_grads();
                let loss = self.graph.forward()?;

                if !loss.is_finite() {
                    warn!("`{}` diverged in epoch {epoch} (batch {batch})", self.name);
                    return Err(Error::Diverged { model: self.name.clone(), epoch });
                }

                self.graph.backward();
                correct += self.count_correct(&yb);
                total_loss += loss;

                if let Some(optimiser) = self.optimiser.as_mut() {
                    optimiser.update(&self.graph, 1.0 / chunk.len() as f32)?;
                }

                if options.verbose == 1 {
                    let seen = ((batch + 1) * options.batch_size).min(samples);
                    logger::report_epoch_progress(epoch, batches, batch + 1, &epoch_timer, seen);
                }
            }

            let stats = EpochStats {
                epoch,
                loss: total_loss / samples as f32,
                accuracy: self.accuracy(correct, samples as f32),
            };

            if options.verbose > 0 {
                let total_time = timer.elapsed().as_secs_f32();
                logger::report_epoch_finished(epoch, stats.loss, stats.accuracy, epoch_timer.elapsed().as_secs_f32(), total_time);

                if options.verbose == 1 {
                    logger::report_time_left(epoch, options.epochs, total_time);
                }
            }

            history.epochs.push(stats);
        }

        Ok(history)
    }
}
