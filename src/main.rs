use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod flow;
mod output;
mod parser;
mod request_builder;
mod session;
mod url_builder;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = cli::CLI::parse();
    init_logging(cli.verbose);

    cli::run(cli).await.into()
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "hh_updater=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
