//! Temporal context from an entity's episodes
//!
//! Produces a bounded narrative for the reasoning judge and a decayed
//! adjustment reported as the (reserved) temporal boost.

use crate::config::EngineConfig;
use crate::text::truncate_chars;
use augur_domain::{effective_timeline, Episode};

/// Narrative and adjustment for one entity at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalContext {
    /// Newest-first lines `"<date> <type>: <payload>"`
    pub narrative: String,
    /// `min(cap, boost × Σ 0.5^(age / half_life))`
    pub adjustment: f64,
    /// Episodes effectively valid inside the horizon
    pub episode_count: usize,
}

/// Summarizes episodes into [`TemporalContext`]
#[derive(Debug, Clone)]
pub struct TemporalContextProvider {
    horizon_secs: u64,
    half_life_secs: u64,
    max_episodes: usize,
    max_chars: usize,
    boost_per_episode: f64,
    max_adjustment: f64,
}

impl TemporalContextProvider {
    /// Provider using the temporal section of `config`
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            horizon_secs: config.horizon_secs(),
            half_life_secs: config.half_life_secs().max(1),
            max_episodes: config.max_narrative_episodes,
            max_chars: config.max_narrative_chars,
            boost_per_episode: config.boost_per_episode,
            max_adjustment: config.max_temporal_adjustment,
        }
    }

    /// Context from the episodes of one entity as seen at `now`
    pub fn summarize(&self, episodes: &[Episode], now: u64) -> TemporalContext {
        let from = now.saturating_sub(self.horizon_secs);
        let mut relevant: Vec<&Episode> = effective_timeline(episodes)
            .into_iter()
            .filter(|e| !e.is_void() && e.overlaps(from, now))
            .map(|e| e.episode)
            .collect();
        relevant.sort_by(|a, b| {
            b.valid_at
                .cmp(&a.valid_at)
                .then(b.recorded_at.cmp(&a.recorded_at))
                .then(b.id.cmp(&a.id))
        });

        let weight: f64 = relevant
            .iter()
            .map(|e| {
                let age = now.saturating_sub(e.valid_at) as f64;
                0.5f64.powf(age / self.half_life_secs as f64)
            })
            .sum();
        let adjustment = (self.boost_per_episode * weight).min(self.max_adjustment);

        let lines: Vec<String> = relevant
            .iter()
            .take(self.max_episodes)
            .map(|e| format!("{} {}: {}", format_date(e.valid_at), e.episode_type, e.payload.trim()))
            .collect();
        let narrative = truncate_chars(&lines.join("\n"), self.max_chars).to_string();

        TemporalContext {
            narrative,
            adjustment,
            episode_count: relevant.len(),
        }
    }
}

fn format_date(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;
    // 2024-03-01T00:00:00Z
    const NOW: u64 = 1_709_251_200;

    fn provider() -> TemporalContextProvider {
        TemporalContextProvider::new(&EngineConfig::default())
    }

    #[test]
    fn test_no_episodes() {
        let ctx = provider().summarize(&[], NOW);
        assert_eq!(ctx, TemporalContext::default());
    }

    #[test]
    fn test_narrative_newest_first_with_dates() {
        let older = Episode::new("org:acme", "funding", "Series B closed", NOW - 10 * DAY, NOW - 10 * DAY);
        let newer = Episode::new("org:acme", "leadership", "New CIO", NOW - DAY, NOW - DAY);
        let ctx = provider().summarize(&[older, newer], NOW);

        let lines: Vec<&str> = ctx.narrative.lines().collect();
        assert_eq!(lines, vec!["2024-02-29 leadership: New CIO", "2024-02-20 funding: Series B closed"]);
        assert_eq!(ctx.episode_count, 2);
    }

    #[test]
    fn test_horizon_and_corrections() {
        let ancient = Episode::new("org:acme", "funding", "Seed", NOW - 400 * DAY, NOW - 400 * DAY)
            .with_valid_before(NOW - 300 * DAY);
        let wrong = Episode::new("org:acme", "leadership", "CTO left", NOW - 5 * DAY, NOW - 5 * DAY);
        // Correction effective from the same instant voids the original
        let fix = Episode::new("org:acme", "leadership", "CTO stayed", NOW - 5 * DAY, NOW - 2 * DAY).invalidating(wrong.id);
        let ctx = provider().summarize(&[ancient, wrong, fix], NOW);

        assert_eq!(ctx.episode_count, 1);
        assert!(ctx.narrative.contains("CTO stayed"));
        assert!(!ctx.narrative.contains("CTO left"));
        assert!(!ctx.narrative.contains("Seed"));
    }

    #[test]
    fn test_closed_episode_inside_horizon_still_counts() {
        let closed = Episode::new("org:acme", "rfp", "Tender open", NOW - 20 * DAY, NOW - 20 * DAY).with_valid_before(NOW - 10 * DAY);
        let ctx = provider().summarize(&[closed], NOW);
        assert_eq!(ctx.episode_count, 1);
    }

    #[test]
    fn test_adjustment_decays_and_caps() {
        let fresh = Episode::new("org:acme", "rfp", "x", NOW, NOW);
        let half = Episode::new("org:acme", "rfp", "y", NOW - 30 * DAY, NOW);

        let p = provider();
        assert!((p.summarize(std::slice::from_ref(&fresh), NOW).adjustment - 0.05).abs() < 1e-12);
        assert!((p.summarize(std::slice::from_ref(&half), NOW).adjustment - 0.025).abs() < 1e-12);

        let many: Vec<Episode> = (0..20).map(|i| Episode::new("org:acme", "rfp", format!("{}", i), NOW, NOW)).collect();
        assert_eq!(p.summarize(&many, NOW).adjustment, 0.25);
    }

    #[test]
    fn test_narrative_bounded() {
        let config = EngineConfig {
            max_narrative_episodes: 2,
            max_narrative_chars: 40,
            ..EngineConfig::default()
        };
        let episodes: Vec<Episode> = (0..5)
            .map(|i| Episode::new("org:acme", "news", "a fairly long payload line", NOW - i * DAY, NOW))
            .collect();
        let ctx = TemporalContextProvider::new(&config).summarize(&episodes, NOW);

        assert!(ctx.narrative.chars().count() <= 40);
        assert_eq!(ctx.episode_count, 5);
        assert!(ctx.narrative.lines().count() <= 2);
    }
}
