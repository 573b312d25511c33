//! Courier E2E runner
//!
//! Runs the multi-device scenarios against an Appium server.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use courier_e2e::scenarios::is_known_tag;
use courier_e2e::{appium_runner, list, plan, run_all, tally};
use courier_harness::{HarnessConfig, TAG_ALL};

/// Courier multi-device end-to-end scenarios
#[derive(Parser)]
#[command(name = "courier-e2e")]
#[command(about = "Multi-device end-to-end UI scenarios for the Courier messenger and wallet")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List scenario runs
    List {
        /// Only runs carrying this tag (chat, transaction, all)
        #[arg(short, long, default_value = TAG_ALL)]
        tag: String,
    },
    /// Run scenarios
    Run {
        /// Only runs carrying this tag (chat, transaction, all)
        #[arg(short, long, default_value = TAG_ALL)]
        tag: String,
        /// Run a single scenario, or a single case as `name[case]`
        #[arg(short, long)]
        scenario: Option<String>,
        /// Configuration file; defaults to courier.toml plus COURIER_* variables
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the run reports as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print an example configuration file
    Config,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn check_tag(tag: &str) -> anyhow::Result<()> {
    if !is_known_tag(tag) {
        bail!("unknown tag '{}' (expected chat, transaction or all)", tag);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::List { tag } => {
            check_tag(&tag)?;
            for label in list(&tag)? {
                println!("{}", label);
            }
        }
        Commands::Run {
            tag,
            scenario,
            config,
            report,
        } => {
            check_tag(&tag)?;
            let config = match config {
                Some(path) => HarnessConfig::load_from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => HarnessConfig::load()?,
            };

            let runs = plan(&config, &tag, scenario.as_deref())?;
            if runs.is_empty() {
                bail!("no scenario matches tag '{}'", tag);
            }
            info!("Planned {} run(s) against {}", runs.len(), config.appium.server_url);

            let runner = appium_runner(&config)?;
            let reports = run_all(&runner, &runs).await;

            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&reports)?;
                std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
                info!("Wrote report to {}", path.display());
            }

            let (passed, failed) = tally(&reports);
            println!();
            for report in &reports {
                println!("{}", report.summary());
            }
            println!("{} passed, {} failed", passed, failed);
            if failed > 0 {
                bail!("{} of {} run(s) failed", failed, reports.len());
            }
        }
        Commands::Config => {
            println!("{}", HarnessConfig::example_config());
        }
    }

    Ok(())
}
