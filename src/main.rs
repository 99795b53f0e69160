// songforge binary entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use songforge_lib::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    songforge_lib::run(cli).await
}
