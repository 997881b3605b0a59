use sae::StackedAutoencoder;
use structopt::StructOpt;

use crate::config::StackOptions;

#[derive(StructOpt)]
pub struct SummaryOptions {
    #[structopt(flatten)]
    pub stack: StackOptions,
}

impl SummaryOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        let sae = StackedAutoencoder::new(self.stack.config())?;

        for summary in sae.summaries() {
            println!("{summary}");
            println!();
        }

        println!("Hidden decoders: {}", sae.decoder_count());

        Ok(())
    }
}
