//! Outcome command implementation.

use crate::app::CliEngine;
use crate::cli::OutcomeArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use augur_domain::{HypothesisId, Outcome};

/// Execute the outcome command.
pub fn execute_outcome(args: OutcomeArgs, engine: &CliEngine, formatter: &Formatter) -> Result<()> {
    let id = HypothesisId::from_string(&args.hypothesis)
        .map_err(|e| CliError::InvalidInput(format!("Invalid hypothesis id '{}': {}", args.hypothesis, e)))?;
    let outcome: Outcome = args.outcome.into();
    let score = resolve_score(outcome, args.score)?;

    let record = engine.record_outcome(id, outcome, score)?;
    println!("{}", formatter.outcome(&record)?);
    Ok(())
}

/// Explicit score, or the outcome's feedback weight when omitted.
fn resolve_score(outcome: Outcome, score: Option<f64>) -> Result<f64> {
    match score {
        Some(s) if !(0.0..=1.0).contains(&s) => Err(CliError::InvalidInput(
            "Effectiveness score must be between 0.0 and 1.0".to_string(),
        )),
        Some(s) => Ok(s),
        None => Ok(outcome.weight()),
    }
}
