//! Time source

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Seconds since the Unix epoch
///
/// The manual variant lets tests pin and advance time; clones share it.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    /// Wall clock
    #[default]
    System,
    /// Manually driven time
    Manual(Arc<AtomicU64>),
}

impl Clock {
    /// Manually driven clock starting at `start`
    pub fn manual(start: u64) -> Self {
        Clock::Manual(Arc::new(AtomicU64::new(start)))
    }

    /// Current time in seconds
    pub fn now(&self) -> u64 {
        match self {
            Clock::System => u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0),
            Clock::Manual(t) => t.load(Ordering::SeqCst),
        }
    }

    /// Move a manual clock forward; no-op for the wall clock
    pub fn advance(&self, secs: u64) {
        if let Clock::Manual(t) = self {
            t.fetch_add(secs, Ordering::SeqCst);
        }
    }
}
