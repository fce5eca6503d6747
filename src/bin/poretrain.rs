use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use poretrain::common::Interval;
use poretrain::mixture::EmConfig;
use poretrain::train::{default_work_file, run_align, run_fit, train, TrainConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, about, version)]
struct Opts {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align the reads and fit the model (both phases)
    Train(RunOpts),
    /// Only align the reads and write the event store
    Align(RunOpts),
    /// Only fit the model from an existing event store
    Fit(RunOpts),
}

#[derive(Args, Debug)]
struct RunOpts {
    /// Training data file (reference, read count, then 4 lines per read)
    #[clap(short = 'd', long)]
    training_data: PathBuf,
    /// 5-mer pore model in ONT format
    #[clap(short = 'm', long)]
    pore_model: PathBuf,
    /// Output model table (TSV)
    #[clap(short, long)]
    output: PathBuf,
    /// Intermediate event store. Defaults to `<output>.events`
    #[clap(short, long)]
    work_file: Option<PathBuf>,
    /// First reference position to train (inclusive)
    #[clap(short = 'l', long)]
    lower: usize,
    /// Last reference position to train (exclusive)
    #[clap(short = 'u', long)]
    upper: usize,
    /// Number of threads
    #[clap(short = 't', long, default_value_t = 1)]
    threads: usize,
    /// Offload the event pileup every this many batches of reads
    #[clap(long, default_value_t = 5)]
    offload_every: usize,
    /// Convergence tolerance of the log-likelihood in EM
    #[clap(long, default_value_t = 0.0001)]
    tolerance: f64,
    /// Maximum number of EM iterations per position
    #[clap(long, default_value_t = 10000)]
    max_iterations: usize,
    /// Write a JSON summary of the run
    #[clap(long)]
    summary: Option<PathBuf>,
}

impl RunOpts {
    fn to_config(&self) -> Result<TrainConfig> {
        if self.lower >= self.upper {
            anyhow::bail!(
                "lower bound {} must be smaller than upper bound {}",
                self.lower,
                self.upper
            );
        }
        let mut config = TrainConfig::new(
            &self.training_data,
            &self.pore_model,
            &self.output,
            Interval::new(self.lower, self.upper),
        );
        config.work_file = self
            .work_file
            .clone()
            .unwrap_or_else(|| default_work_file(&self.output));
        config.threads = self.threads;
        config.offload_every = self.offload_every;
        config.em = EmConfig {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            ..Default::default()
        };
        config.summary = self.summary.clone();
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts: Opts = Opts::parse();
    println!("# started_at={}", chrono::Local::now());
    println!("# version={}", env!("CARGO_PKG_VERSION"));
    println!("# opts={:?}", opts);

    let run_opts = match &opts.command {
        Commands::Train(o) | Commands::Align(o) | Commands::Fit(o) => o,
    };
    let config = run_opts.to_config()?;
    println!("# n_threads={}", config.threads);
    info!(
        "config {}",
        serde_json::to_string(&config).context("serializing the config")?
    );
    info!("transitions\n{}", config.transitions);

    let summary = match &opts.command {
        Commands::Train(_) => train(&config),
        Commands::Align(_) => run_align(&config),
        Commands::Fit(_) => run_fit(&config),
    }
    .with_context(|| format!("training from {} failed", config.training_data.display()))?;
    info!(
        "summary {}",
        serde_json::to_string(&summary).context("serializing the summary")?
    );
    println!("# finished_at={}", chrono::Local::now());
    Ok(())
}
