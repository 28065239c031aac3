mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pagelift::config;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; variables may come from the environment.
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(err) = run().await {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    match cli.command {
        Commands::Pdf(args) => commands::pdf(args).await,
        Commands::Image(args) => commands::image(args).await,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
