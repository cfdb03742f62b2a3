mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23 requires a process-wide crypto provider before the first
    // TLS handshake. Both reqwest and tiberius go through it.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Bootstrap(args) => commands::bootstrap::run(args, cli.config.as_deref()).await,
        Commands::Secrets(cmd) => commands::secrets::run(cmd, cli.config.as_deref()).await,
        Commands::Bind(args) => commands::bind::run(args).await,
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("groundwork={default_level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(verbose > 0).with_writer(std::io::stderr))
        .init();
}
