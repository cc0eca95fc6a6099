//! CLI entry point - the composition root.
//!
//! Loads `.env`, parses arguments, initializes logging, bootstraps the
//! context and hands over to the chat loop.

use std::process::ExitCode;

use clap::Parser;
use debate_cli::{Cli, CliError, bootstrap, handlers};
use tracing_subscriber::EnvFilter;

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    // stderr keeps the transcript on stdout clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.settings()?;
    let ctx = bootstrap(settings)?;
    let result = handlers::chat::execute(&ctx).await;
    ctx.shutdown().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}
