use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fact_checker::cli::{self, Cli};
use fact_checker::{Environment, FactCheckError, HttpArticleFetcher};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before the environment snapshot is taken
    let _ = dotenvy::dotenv();

    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: &Cli) -> Result<(), FactCheckError> {
    let env = Environment::capture();
    let fetcher = HttpArticleFetcher::new()?;
    let mut stdout = std::io::stdout().lock();

    cli::run(args, &env, cli::connect, &fetcher, &mut stdout).await
}

fn report(err: &FactCheckError) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(raw) = err.raw_response().filter(|r| !r.trim().is_empty()) {
        eprintln!();
        eprintln!("{}", "Raw response:".yellow());
        eprintln!("{}", raw);
    }
}
