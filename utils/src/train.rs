use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use log::info;
use sae::{DenseMatrix, StackedAutoencoder, DEFAULT_EPOCHS};
use structopt::StructOpt;

use crate::config::StackOptions;

#[derive(StructOpt)]
pub struct TrainOptions {
    /// CSV file with one sample per line.
    #[structopt(required = true, short, long)]
    pub input: PathBuf,
    /// Directory for weights, the loss log and the compressed codes.
    #[structopt(required = true, short, long)]
    pub output: PathBuf,
    /// Epochs per model, shallowest first.
    #[structopt(long, use_delimiter = true)]
    pub epochs: Vec<usize>,
    /// 0 is silent, 1 reports every batch, 2 every epoch.
    #[structopt(long, default_value = "2")]
    pub progress: u8,
    #[structopt(flatten)]
    pub stack: StackOptions,
}

impl TrainOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        let x = read_csv(&self.input)?;

        if x.shape().rows() != self.stack.input_size {
            bail!(
                "{} has {} columns but the stack expects {} (see --input-size)",
                self.input.display(),
                x.shape().rows(),
                self.stack.input_size
            );
        }

        info!("loaded {} samples from {}", x.num_samples(), self.input.display());

        let mut sae = StackedAutoencoder::new(self.stack.config())?;
        let epochs = if self.epochs.is_empty() { DEFAULT_EPOCHS.to_vec() } else { self.epochs.clone() };
        let histories = sae.fit(&x, self.stack.batch_size, &epochs, self.progress)?;

        std::fs::create_dir_all(&self.output)
            .with_context(|| format!("Failed to create {}", self.output.display()))?;

        sae.save_weights(self.output.join("weights")).with_context(|| "Failed to write weights.")?;

        let log_path = self.output.join("log.txt");
        let mut log = BufWriter::new(
            File::create(&log_path).with_context(|| format!("Failed to create {}", log_path.display()))?,
        );

        for (k, history) in histories.iter().enumerate() {
            for stats in &history.epochs {
                writeln!(log, "model:{},epoch:{},loss:{}", k + 1, stats.epoch, stats.loss)?;
            }
        }

        log.flush()?;

        let codes = sae.compress(&x)?;
        let codes_path = self.output.join("codes.csv");
        let mut writer = BufWriter::new(
            File::create(&codes_path).with_context(|| format!("Failed to create {}", codes_path.display()))?,
        );

        for code in codes.samples() {
            let line = code.iter().map(f32::to_string).collect::<Vec<_>>().join(",");
            writeln!(writer, "{line}")?;
        }

        writer.flush()?;

        let eval = sae.evaluate(&x)?;
        println!("Reconstruction loss: {:.6}", eval.loss);
        println!("Written to {}", self.output.display());

        Ok(())
    }
}

fn read_csv(path: &Path) -> anyhow::Result<DenseMatrix> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        let row = line
            .split(',')
            .map(|value| value.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid number on line {}", idx + 1))?;

        rows.push(row);
    }

    if rows.is_empty() {
        bail!("{} contains no samples", path.display());
    }

    Ok(DenseMatrix::from_rows(&rows)?)
}
