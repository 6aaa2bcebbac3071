//! Turbulence demo training binary.
//!
//! Usage:
//!   fluid-train [OPTIONS]
//!
//! Examples:
//!   # Default run: 2 epochs over 2000 synthetic samples
//!   fluid-train
//!
//!   # Small run with charts in ./runs and the live view afterwards
//!   fluid-train --epochs 1 --samples 256 --output-dir ./runs --animate
//!
//!   # Load settings from a TOML file, overriding the seed
//!   fluid-train --config fluid.toml --seed 7

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use candle_core::Device;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fluid_model_rs::{FluidConfig, FluidTrainer, SyntheticDataset};
use turbulence_tools::{
    plot_gradient_vector_field, plot_loss_curve, plot_turbulence, LiveTurbulenceView,
    DEFAULT_GRADIENT_FIELD_FILE, DEFAULT_LOSS_CURVE_FILE, DEFAULT_TURBULENCE_FILE,
};

#[derive(Parser)]
#[command(name = "fluid-train")]
#[command(about = "Train a small classifier and report gradient turbulence")]
#[command(version)]
struct Args {
    /// TOML configuration file (missing keys use defaults)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of epochs
    #[arg(short = 'e', long)]
    epochs: Option<usize>,

    /// Number of synthetic samples
    #[arg(short = 'n', long)]
    samples: Option<usize>,

    /// Batch size
    #[arg(short = 'b', long)]
    batch_size: Option<usize>,

    /// Learning rate
    #[arg(short = 'l', long)]
    learning_rate: Option<f64>,

    /// Seed for data generation and shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the SVG charts
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Replay loss and turbulence in the terminal after training
    #[arg(long)]
    animate: bool,

    /// Live view frame interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(FluidConfig, bool)> {
        let mut config = match &self.config {
            Some(path) => FluidConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => FluidConfig::default(),
        };

        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(samples) = self.samples {
            config.num_samples = samples;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(lr) = self.learning_rate {
            config.learning_rate = lr;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(ms) = self.interval_ms {
            config.animation_interval_ms = ms;
        }

        config.validate()?;
        Ok((config, self.animate))
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let (config, animate) = args.into_config()?;
    let device = Device::Cpu;

    tracing::info!("=== Gradient Turbulence Demo ===");
    tracing::info!(
        "Model: {} -> {} -> {}",
        config.input_dim,
        config.hidden_dim,
        config.output_dim
    );
    tracing::info!("Samples: {}", config.num_samples);
    tracing::info!("Epochs: {}", config.epochs);
    tracing::info!("Batch size: {}", config.batch_size);
    tracing::info!("Learning rate: {}", config.learning_rate);

    let dataset = SyntheticDataset::generate(
        config.num_samples,
        config.input_dim,
        config.output_dim,
        config.seed,
    )?;

    let output_dir = config.output_dir.clone();
    let interval = Duration::from_millis(config.animation_interval_ms);

    let mut trainer = FluidTrainer::new(config, device)?;
    trainer.train(&dataset)?;
    let tracker = trainer.into_tracker();

    plot_loss_curve(
        tracker.loss_history(),
        Some(&output_dir.join(DEFAULT_LOSS_CURVE_FILE)),
    )?;
    if let Some(last) = tracker.latest_snapshot() {
        plot_gradient_vector_field(
            last,
            "(Last Step)",
            Some(&output_dir.join(DEFAULT_GRADIENT_FIELD_FILE)),
        )?;
    }
    plot_turbulence(
        tracker.turbulence_history(),
        Some(&output_dir.join(DEFAULT_TURBULENCE_FILE)),
    )?;

    let uninformative = tracker
        .turbulence_steps()
        .iter()
        .filter(|step| !step.is_informative())
        .count();
    if uninformative > 0 {
        tracing::warn!(
            "{} of {} turbulence values had no comparable parameters",
            uninformative,
            tracker.turbulence_steps().len()
        );
    }

    println!("\n[Turbulence Diagnosis] {}", tracker.diagnose());

    if animate {
        LiveTurbulenceView::from_tracker(&tracker)
            .with_interval(interval)
            .run()
            .context("live view failed")?;
    }

    Ok(())
}
