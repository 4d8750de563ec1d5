//! Report command implementation.

use crate::app::{with_store, CliEngine};
use crate::error::Result;
use crate::output::Formatter;
use augur_analytics::PopulationAnalytics;

/// Execute the report command.
pub fn execute_report(engine: &CliEngine, formatter: &Formatter) -> Result<()> {
    let report = with_store(engine, |s| PopulationAnalytics::new().report(s))?;
    println!("{}", formatter.report(&report)?);
    Ok(())
}
