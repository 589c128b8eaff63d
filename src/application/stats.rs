//! Engine Statistics
//!
//! Plain counters owned by the engine. Logged after resync passes and
//! returned when a controller stops.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Upsert and delete events handled
    pub events: u64,
    /// Targets written with fresh source data
    pub replicated: u64,
    /// Syncs skipped because the target already had the source version
    pub up_to_date: u64,
    /// Syncs refused by the permission policy
    pub denied: u64,
    /// Store writes that failed
    pub failed: u64,
    /// Dependents whose data was removed after their source was deleted
    pub cleared: u64,
}

impl EngineStats {
    /// Total number of successful writes.
    pub fn writes(&self) -> u64 {
        self.replicated + self.cleared
    }
}

impl std::fmt::Display for EngineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "events={} replicated={} up_to_date={} denied={} failed={} cleared={}",
            self.events, self.replicated, self.up_to_date, self.denied, self.failed, self.cleared
        )
    }
}
