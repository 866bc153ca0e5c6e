use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod args;

use args::Cli;

use std::collections::HashSet;

use dbslice_core::backend::mysql::{connect, MySqlBackend};
use dbslice_core::backend::SampleBackend;
use dbslice_core::{AnchorSpec, CancelToken, DbSliceError, Sampler};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    // Load .env file if present
    let _ = dotenvy::dotenv();

    if let Err(err) = run(&cli).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    if cli.driver != "mysql" {
        return Err(DbSliceError::UnsupportedDriver {
            driver: cli.driver.clone(),
        }
        .into());
    }

    let spec = AnchorSpec::parse(&cli.anchor)?;
    let sample_schema = cli.sample_schema_name();
    let full_copy: HashSet<String> = cli.no_sample.iter().cloned().collect();

    let pool = connect(&cli.connection_url()).await?;
    let backend = MySqlBackend::new(pool, &cli.target_schema, &sample_schema)?;

    info!(source = %cli.target_schema, dest = %sample_schema, "replicating schema");
    backend.replicate(&full_copy).await?;

    let cancel = CancelToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let mut sampler = Sampler::new(&backend, cancel);
    sampler.sample(&spec).await?;

    info!(
        dest = %sample_schema,
        resolved = sampler.resolved_count(),
        "sampling complete"
    );
    Ok(())
}
