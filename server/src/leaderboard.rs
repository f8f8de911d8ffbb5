//! Cumulative win statistics keyed by player name.
//!
//! Entries are keyed by display name, so two joins under the same name
//! share one entry. The board outlives lobbies and rounds and is only
//! emptied by an explicit reset.

use shared::LeaderboardEntry;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    entries: HashMap<String, LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one win and `attempts` to the entry for `name`, creating it at
    /// zero when missing. Returns the updated entry.
    pub fn record_win(&mut self, name: &str, attempts: u32) -> LeaderboardEntry {
        let entry = self.entries.entry(name.to_string()).or_default();
        entry.wins += 1;
        entry.total_attempts += attempts;
        *entry
    }

    pub fn get(&self, name: &str) -> Option<&LeaderboardEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> &HashMap<String, LeaderboardEntry> {
        &self.entries
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
