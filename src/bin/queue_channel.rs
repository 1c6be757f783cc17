use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use queue_channel::output::{create_timestamped_output_dir, write_curve_csv, write_json};
use queue_channel::sweep::run_sweep_into_dir;
use queue_channel::{
    capacity_curve, ChannelConfig, ChannelParameters, QueueDiscipline, SimConfig,
    SimulationRunner, WaitModel,
};

#[derive(Debug, Parser)]
#[command(name = "queue-channel")]
#[command(about = "Capacity curves and Monte Carlo runs for queue-delayed decoherence channels")]
struct Cli {
    /// Console log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the capacity curve of both disciplines as CSV
    Curve {
        #[arg(long)]
        kappa: f64,
        #[arg(long, default_value_t = 0.01)]
        step: f64,
        #[arg(long, default_value_t = 0.01)]
        lambda_min: f64,
        #[arg(long, default_value_t = 0.99)]
        lambda_max: f64,
        #[arg(long, default_value = "curve.csv")]
        out: PathBuf,
    },
    /// Print the capacity at a single operating point
    Point {
        #[arg(long)]
        lambda: f64,
        #[arg(long)]
        kappa: f64,
        #[arg(long)]
        discipline: Option<QueueDiscipline>,
    },
    /// Transmit a message through the channel
    Simulate {
        #[arg(long)]
        message: String,
        #[arg(long)]
        lambda: f64,
        #[arg(long)]
        kappa: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = WaitModel::SteadyState)]
        wait_model: WaitModel,
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Simulate across a lambda grid and write CSV/JSON results
    Sweep {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "output-queue-channel")]
        outdir: PathBuf,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn resolve_config(path: Option<&Path>) -> Result<ChannelConfig> {
    if let Some(path) = path {
        return ChannelConfig::load(path)
            .with_context(|| format!("failed to load config: {}", path.display()));
    }

    let local = PathBuf::from("configs").join("default.toml");
    if local.exists() {
        return ChannelConfig::load(&local)
            .with_context(|| format!("failed to load config: {}", local.display()));
    }

    Ok(ChannelConfig::default())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Curve {
            kappa,
            step,
            lambda_min,
            lambda_max,
            out,
        } => {
            let curve = capacity_curve(kappa, lambda_min, lambda_max, step)?;
            write_curve_csv(&out, &curve)
                .with_context(|| format!("failed to write curve: {}", out.display()))?;
            info!(points = curve.len(), out = %out.display(), "capacity curve written");
        }
        Command::Point {
            lambda,
            kappa,
            discipline,
        } => {
            ChannelParameters::new(lambda, kappa).validate()?;
            let disciplines = match discipline {
                Some(d) => vec![d],
                None => QueueDiscipline::ALL.to_vec(),
            };
            for d in disciplines {
                println!("{:<30} {:.6}", d.label(), d.capacity(lambda, kappa));
            }
        }
        Command::Simulate {
            message,
            lambda,
            kappa,
            seed,
            wait_model,
            json,
        } => {
            if message.is_empty() {
                bail!("message must not be empty");
            }

            let config = SimConfig {
                wait_model,
                ..SimConfig::default()
            };
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = SimulationRunner::new(config)
                .run(&message, ChannelParameters::new(lambda, kappa), &mut rng)
                .context("simulation failed")?;

            println!("Sent:      {message}");
            println!("Received:  {}", result.received_text);
            println!("Symbols:   {} ({} bits)", result.symbols, result.symbols * 8);
            println!("Bit errors: {}", result.total_bit_errors);
            println!("Avg wait:  {:.3}", result.average_wait);
            println!("BER:       {:.2}%", result.empirical_bit_error_rate * 100.0);
            println!("Capacity:  {:.4} (estimated)", result.estimated_capacity);
            println!("           {:.4} (M/M/1 closed form)", result.theoretical_capacity);
            println!();
            for record in &result.diagnostic_log {
                println!(
                    "S[{:02}] wait:{:.2} | p:{:.2} | flips:{} | {}",
                    record.index,
                    record.wait_time,
                    record.flip_probability,
                    record.bit_errors,
                    if record.corrupted { "FLIP" } else { "OK" }
                );
            }

            if let Some(path) = json {
                write_json(&path, &result)
                    .with_context(|| format!("failed to write result: {}", path.display()))?;
            }
        }
        Command::Sweep { config, outdir } => {
            let config = resolve_config(config.as_deref())?;
            config.validate()?;
            let output_dir = create_timestamped_output_dir(&outdir)?;
            let result = run_sweep_into_dir(&config, &output_dir)?;
            println!("Output directory: {}", result.output_dir.display());
        }
    }

    Ok(())
}
