mod commands;
mod errors;
mod orchestrator;
mod report;

use std::path::PathBuf;

use crate::{
    commands::Commands,
    errors::{CliError, Result},
    orchestrator::Orchestrator,
};
use clap::Parser;
use distprobe_control::HttpControlPlane;
use distprobe_harness::{HarnessConfig, registry};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// distprobe - checks that a server distribution starts and stops from
/// awkward install paths
#[derive(Parser, Debug)]
#[command(name = "distprobe")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Distribution home to test (defaults to $DISTPROBE_HOME)
    #[arg(short = 'd', long = "dist", global = true)]
    pub dist: Option<PathBuf>,

    /// Management interface host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Management interface port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Root for scratch copies and console captures
    #[arg(long, global = true)]
    pub tmp_dir: Option<PathBuf>,

    /// Dotenv file with extra environment for the launched scripts
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Directory name to test; repeat to replace the built-in list
    #[arg(long = "path", value_name = "NAME", global = true)]
    pub paths: Vec<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = build_config(&cli, |key| std::env::var(key).ok())?;
    config.validate_home()?;
    debug!("Using {:?}", config);

    let client = HttpControlPlane::new(&config.host, config.port)?;
    let orchestrator = Orchestrator::new(config, client);
    let plan = cli.command.plan();

    let report = tokio::select! {
        report = orchestrator.run(&plan) => report,
        _ = tokio::signal::ctrl_c() => {
            let killed = registry::global().drain();
            error!("Interrupted, killed {} process group(s)", killed);
            std::process::exit(130);
        }
    };

    print!("{}", report.render());
    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::ChecksFailed {
            failed: report.failure_count(),
            total: report.len(),
        })
    }
}

/// Layer command-line flags over the environment-derived configuration.
fn build_config<F>(cli: &Cli, lookup: F) -> Result<HarnessConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = HarnessConfig::from_lookup(cli.dist.clone(), lookup)?;
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(tmp_dir) = &cli.tmp_dir {
        config.tmp_dir = tmp_dir.clone();
    }
    if !cli.paths.is_empty() {
        config = config.with_path_names(cli.paths.clone());
    }
    if let Some(env_file) = &cli.env_file {
        config.load_env_file(env_file)?;
    }
    Ok(config)
}
