//! Augur CLI - Command-line interface for the hypothesis evaluation engine.

use anyhow::Context;
use augur_cli::commands;
use augur_cli::{build_engine, Cli, Command, Config, Formatter};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr so JSON output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let path = Config::resolve_path(cli.config.as_deref())?;
    let config = Config::load(&path).with_context(|| format!("loading {}", path.display()))?;

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    if let Command::Init(args) = cli.command {
        commands::execute_init(args, &path, &formatter)?;
        return Ok(());
    }

    let engine = build_engine(&config)
        .await
        .with_context(|| format!("opening {}", config.database_path))?;

    match cli.command {
        Command::Run(args) => commands::execute_run(args, engine, &config, &formatter).await?,
        Command::Ingest(args) => commands::execute_ingest(args, &engine, &formatter).await?,
        Command::Outcome(args) => commands::execute_outcome(args, &engine, &formatter)?,
        Command::Episode(args) => commands::execute_episode(args, &engine, &formatter)?,
        Command::Hypotheses(args) => commands::execute_hypotheses(args, &engine, &formatter)?,
        Command::Report => commands::execute_report(&engine, &formatter)?,
        Command::Init(_) => unreachable!("handled above"),
    }

    Ok(())
}
