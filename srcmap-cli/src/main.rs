use clap::Parser;
use srcmap_engine::BatchResolver;
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;

mod cli;
mod commands;
mod config;
mod error;
mod serve;
mod utils;

use cli::CliArgs;
use config::ProgramConfig;
use error::AppError;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    // stdout carries results, logs go to stderr
    let filter = if args.verbose {
        EnvFilter::new(Level::DEBUG.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.as_str()))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let program_config = ProgramConfig::from_args(&args)?;
    let resolver = BatchResolver::new(program_config.resolver)?;

    commands::execute(args.command, resolver).await
}
