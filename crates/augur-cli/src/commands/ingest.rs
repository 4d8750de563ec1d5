//! Ingest command implementation.

use crate::app::CliEngine;
use crate::cli::IngestArgs;
use crate::error::Result;
use crate::output::Formatter;
use augur_domain::Signal;
use augur_engine::Clock;

/// Execute the ingest command.
pub async fn execute_ingest(args: IngestArgs, engine: &CliEngine, formatter: &Formatter) -> Result<()> {
    let observed_at = args.observed_at.unwrap_or_else(|| Clock::System.now());
    let mut signal =
        Signal::new(args.entity, args.category, args.payload, observed_at).with_source_type(args.source_type);
    if let Some(url) = args.url {
        signal = signal.with_url(url);
    }

    let receipt = engine.ingest_signal(signal).await?;
    println!("{}", formatter.receipt(&receipt)?);
    Ok(())
}
