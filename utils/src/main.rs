mod config;
mod graph;
mod summary;
mod train;

use structopt::StructOpt;

#[derive(StructOpt)]
pub struct Options {
    /// Increase log verbosity (-v, -vv, ...).
    #[structopt(short, long, parse(from_occurrences), global = true)]
    verbose: usize,
    /// Colour-blind friendly progress output.
    #[structopt(long, global = true)]
    cbcs: bool,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    Summary(summary::SummaryOptions),
    Train(train::TrainOptions),
    Graph(graph::GraphOptions),
}

fn main() -> anyhow::Result<()> {
    let options = Options::from_args();

    stderrlog::new().module(module_path!()).module("sae_lib").verbosity(options.verbose + 1).init()?;

    sae::logger::set_cbcs(options.cbcs);

    match options.command {
        Command::Summary(options) => options.run(),
        Command::Train(options) => options.run(),
        Command::Graph(options) => options.run(),
    }
}
