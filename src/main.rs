//! Standalone configuration utility.
//!
//! Loads a configuration source, applies `-p` overrides, validates, and
//! prints the queried parameter. A validation failure exits non-zero
//! after a critical diagnostic; any other failure is reported verbatim.
//!
//! ```bash
//! grafo-config config.yaml dimension -p dimension=400
//! ```

use clap::Parser;
use grafo_config::{query_value, render_value, Cli, ConfigLoader, Error};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(Error::Validation(err)) => {
            tracing::error!("error in the configuration file, aborting");
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, Error> {
    let loader = ConfigLoader::new()?;
    let config = loader.load_config(&cli.config, &cli.param)?;
    let view = serde_json::to_value(&config)?;
    let value =
        query_value(&view, &cli.query).ok_or_else(|| Error::Query(cli.query.clone()))?;
    Ok(render_value(value))
}
