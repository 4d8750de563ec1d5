//! Cycle lease record
//!
//! Replaces a process-wide "is running" flag: the lease lives next to the
//! engine state, so any number of processes sharing a store agree on who runs.

/// Lease held by the owner of a running cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleLease {
    /// Lease name, one per guarded activity
    pub name: String,
    /// Opaque token of the current holder
    pub owner: String,
    /// When the lease was taken (seconds)
    pub acquired_at: u64,
    /// When the lease lapses if not released (seconds)
    pub expires_at: u64,
}

impl CycleLease {
    /// Create a lease request
    pub fn new(name: impl Into<String>, owner: impl Into<String>, acquired_at: u64, expires_at: u64) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            acquired_at,
            expires_at,
        }
    }

    /// Whether the lease has lapsed at `now`
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    /// Whether `owner` holds this lease
    pub fn is_held_by(&self, owner: &str) -> bool {
        self.owner == owner
    }
}

/// Result of trying to take a lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseOutcome {
    /// The lease is now ours
    Acquired(CycleLease),
    /// Someone else holds an unexpired lease
    Held(CycleLease),
}
