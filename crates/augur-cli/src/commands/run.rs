//! Run command implementation.

use crate::app::CliEngine;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use augur_engine::EngineWorker;
use std::sync::Arc;
use std::time::Duration;

/// Execute the run command.
///
/// Without `--watch` a single cycle runs; a cycle already in flight
/// elsewhere is reported as an error. With `--watch` the worker loop runs
/// until Ctrl+C and prints the accumulated metrics on exit.
pub async fn execute_run(
    args: RunArgs,
    engine: Arc<CliEngine>,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    if !args.watch {
        let report = engine.run_cycle().await?;
        println!("{}", formatter.cycle(&report)?);
        return Ok(());
    }

    let interval = match args.interval {
        Some(0) => return Err(CliError::InvalidInput("--interval must be > 0".to_string())),
        Some(secs) => Duration::from_secs(secs),
        None => config.worker_interval(),
    };
    eprintln!(
        "{}",
        formatter.info(&format!("Running a cycle every {}s, Ctrl+C to stop", interval.as_secs()))
    );

    let worker = EngineWorker::new(Arc::clone(&engine), interval);
    worker.run().await?;

    eprintln!("{}", formatter.metrics(&engine.metrics()));
    Ok(())
}
