//! Episode command implementation.

use crate::app::CliEngine;
use crate::cli::EpisodeArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use augur_domain::{Episode, EpisodeId};
use augur_engine::Clock;

/// Execute the episode command.
pub fn execute_episode(args: EpisodeArgs, engine: &CliEngine, formatter: &Formatter) -> Result<()> {
    let now = Clock::System.now();
    let mut episode = Episode::new(
        args.entity,
        args.episode_type,
        args.payload,
        args.valid_at.unwrap_or(now),
        now,
    );
    if let Some(before) = args.valid_before {
        episode = episode.with_valid_before(before);
    }
    if let Some(corrected) = args.invalidates {
        let id = EpisodeId::from_string(&corrected)
            .map_err(|e| CliError::InvalidInput(format!("Invalid episode id '{}': {}", corrected, e)))?;
        episode = episode.invalidating(id);
    }

    let id = engine.record_episode(episode)?;
    println!("{}", formatter.episode(id)?);
    Ok(())
}
