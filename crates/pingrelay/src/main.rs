// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PingRelay - scheduled WhatsApp message dispatch.
//!
//! Binary entry point: loads configuration, initializes tracing, and runs
//! the selected subcommand.

use clap::{Parser, Subcommand};

mod serve;

/// PingRelay - scheduled WhatsApp message dispatch.
#[derive(Parser, Debug)]
#[command(name = "pingrelay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP trigger server.
    Serve,
    /// Run one dispatch tick and print the JSON summary.
    Tick {
        /// Ignore due times and send everything unsent now.
        #[arg(long)]
        force: bool,
    },
    /// Reconcile phone statuses against the gateway and print the summary.
    Reconcile,
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match pingrelay_config::load_and_validate() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pingrelay: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(&config).await,
        Commands::Tick { force } => serve::run_tick_once(&config, force).await,
        Commands::Reconcile => serve::run_reconcile_once(&config).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "fatal");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        super::Cli::command().debug_assert();
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = pingrelay_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.service.name, "pingrelay");
    }
}
