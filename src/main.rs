use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcma::{Analysis, AnalysisConfig};

#[derive(Parser, Debug)]
#[command(name = "mcma")]
#[command(version)]
#[command(about = "Multi-criteria model analysis: uniform Pareto-front representation of LP/MIP models")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Analysis directory holding cfg.toml
    #[arg(long = "anaDir", default_value = ".")]
    ana_dir: PathBuf,

    /// Override the verbosity level (0..4) of the configuration
    #[arg(short, long)]
    verb: Option<u8>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a template analysis directory for the built-in tiny model
    Install {
        /// Directory to create
        dir: PathBuf,
    },
}

#[cfg(feature = "tracing")]
fn init_logging(verb: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verb {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mcma={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
fn init_logging(_verb: u8) {}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(Commands::Install { dir }) = &args.command {
        init_logging(args.verb.unwrap_or(2));
        let cfg = mcma::install(dir)
            .with_context(|| format!("failed to install template into {}", dir.display()))?;
        println!("Template analysis written; run: mcma --anaDir {}", dir.display());
        println!("Configuration: {}", cfg.display());
        return Ok(());
    }

    let config = AnalysisConfig::load(&args.ana_dir)
        .with_context(|| format!("failed to load configuration from {}", args.ana_dir.display()))?;
    init_logging(args.verb.unwrap_or(config.verb));
    config.validate().context("invalid configuration")?;

    let res_dir = config.res_dir();
    let mut analysis = Analysis::builder(config)
        .persist(true)
        .build()
        .context("failed to set up the analysis")?;
    let report = analysis.run().context("analysis failed")?;

    let s = &report.summary;
    println!(
        "{} iterations, {} Pareto solutions ({} close, {} dominated), hypervolume {:.1}",
        s.n_iterations, s.n_unique, s.n_close, s.n_dominated, s.hypervolume
    );
    if s.max_iter_reached {
        println!("Stopped at maxIter; {} candidate cuboids left", s.n_cubes_left);
    }
    println!("Results written to {}", res_dir.display());
    Ok(())
}
