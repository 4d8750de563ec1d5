//! Bi-temporal episodes
//!
//! An episode records a fact about an entity together with the window in
//! which it was true (`valid_at` .. `valid_before`) and the moment the engine
//! learned it (`recorded_at`). Episodes are never mutated: a correction is a
//! new episode whose `invalidates` points at the old one, closing the old
//! episode's effective window at the correction's `valid_at`.

use crate::id::EpisodeId;

/// Historical fact about an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    /// Unique identifier
    pub id: EpisodeId,
    /// Subject organization or actor
    pub entity_id: String,
    /// Kind of episode, typically a signal category
    pub episode_type: String,
    /// Free-text payload
    pub payload: String,
    /// Start of the validity window (seconds, inclusive)
    pub valid_at: u64,
    /// End of the validity window (seconds, exclusive); open when `None`
    pub valid_before: Option<u64>,
    /// When the episode was recorded (seconds)
    pub recorded_at: u64,
    /// Episode whose validity this one corrects
    pub invalidates: Option<EpisodeId>,
}

impl Episode {
    /// Create an open-ended episode
    pub fn new(
        entity_id: impl Into<String>,
        episode_type: impl Into<String>,
        payload: impl Into<String>,
        valid_at: u64,
        recorded_at: u64,
    ) -> Self {
        Self {
            id: EpisodeId::new(),
            entity_id: entity_id.into(),
            episode_type: episode_type.into(),
            payload: payload.into(),
            valid_at,
            valid_before: None,
            recorded_at,
            invalidates: None,
        }
    }

    /// Close the validity window
    pub fn with_valid_before(mut self, valid_before: u64) -> Self {
        self.valid_before = Some(valid_before);
        self
    }

    /// Mark this episode as a correction of another
    pub fn invalidating(mut self, corrected: EpisodeId) -> Self {
        self.invalidates = Some(corrected);
        self
    }
}

/// An episode together with its effective end of validity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveEpisode<'a> {
    /// The stored episode
    pub episode: &'a Episode,
    /// Effective exclusive end; open when `None`
    pub valid_until: Option<u64>,
}

impl EffectiveEpisode<'_> {
    /// Whether the episode was effectively valid at `at`
    pub fn is_valid_at(&self, at: u64) -> bool {
        self.episode.valid_at <= at && self.valid_until.map_or(true, |end| at < end)
    }

    /// Whether the effective window intersects `[from, to]`
    pub fn overlaps(&self, from: u64, to: u64) -> bool {
        self.episode.valid_at <= to && self.valid_until.map_or(true, |end| end > from)
    }

    /// Whether a correction emptied the window entirely
    pub fn is_void(&self) -> bool {
        self.valid_until.map_or(false, |end| end <= self.episode.valid_at)
    }
}

/// Effective validity windows for a set of episodes of one entity
///
/// Each episode's window ends at the earliest of its own `valid_before` and
/// the `valid_at` of every episode that invalidates it. Order is preserved.
pub fn effective_timeline(episodes: &[Episode]) -> Vec<EffectiveEpisode<'_>> {
    episodes
        .iter()
        .map(|episode| {
            let corrected_at = episodes
                .iter()
                .filter(|other| other.invalidates == Some(episode.id))
                .map(|other| other.valid_at)
                .min();
            let valid_until = match (episode.valid_before, corrected_at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            EffectiveEpisode { episode, valid_until }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_episode_is_valid_forever() {
        let ep = Episode::new("org:acme", "funding", "Series B", 100, 100);
        let timeline = effective_timeline(std::slice::from_ref(&ep));
        assert_eq!(timeline[0].valid_until, None);
        assert!(timeline[0].is_valid_at(100));
        assert!(timeline[0].is_valid_at(u64::MAX));
        assert!(!timeline[0].is_valid_at(99));
    }

    #[test]
    fn test_correction_closes_window() {
        let original = Episode::new("org:acme", "leadership", "CTO hired", 100, 100);
        let correction = Episode::new("org:acme", "leadership", "CTO departed", 250, 260).invalidating(original.id);
        let episodes = vec![original.clone(), correction];

        let timeline = effective_timeline(&episodes);
        assert_eq!(timeline[0].valid_until, Some(250));
        assert!(timeline[0].is_valid_at(249));
        assert!(!timeline[0].is_valid_at(250));
        assert_eq!(timeline[1].valid_until, None);
        // stored episode untouched
        assert_eq!(episodes[0], original);
    }

    #[test]
    fn test_earliest_end_wins() {
        let original = Episode::new("e", "t", "p", 100, 100).with_valid_before(300);
        let late = Episode::new("e", "t", "late fix", 400, 400).invalidating(original.id);
        let early = Episode::new("e", "t", "early fix", 200, 410).invalidating(original.id);
        let episodes = vec![original, late, early];
        assert_eq!(effective_timeline(&episodes)[0].valid_until, Some(200));
    }

    #[test]
    fn test_retroactive_correction_voids_episode() {
        let original = Episode::new("e", "t", "wrong", 100, 100);
        let correction = Episode::new("e", "t", "never happened", 50, 120).invalidating(original.id);
        let episodes = vec![original, correction];
        let timeline = effective_timeline(&episodes);
        assert!(timeline[0].is_void());
        assert!(!timeline[0].overlaps(0, 1000));
    }

    #[test]
    fn test_overlaps() {
        let ep = Episode::new("e", "t", "p", 100, 100).with_valid_before(200);
        let timeline = effective_timeline(std::slice::from_ref(&ep));
        assert!(timeline[0].overlaps(150, 300));
        assert!(timeline[0].overlaps(0, 100));
        assert!(!timeline[0].overlaps(200, 300));
        assert!(!timeline[0].overlaps(0, 99));
    }
}
