//! Session store records: admin settings and the running/stopped flag.

use shared::{Settings, SettingsUpdate};

/// Merges every provided field into `settings`. Values are taken as-is.
pub fn apply_update(settings: &mut Settings, update: SettingsUpdate) {
    if let Some(key) = update.session_key {
        settings.session_key = key;
    }
    if let Some(max_players) = update.max_players {
        settings.max_players = max_players;
    }
    if let Some(chances) = update.chances_per_player {
        settings.chances_per_player = chances;
    }
}

/// Whether a round is running, and who ended the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub started: bool,
    /// Name of the winner that stopped the round; empty when none.
    pub stopped_by: String,
    pub admin: String,
}

impl SessionState {
    pub fn new(admin: impl Into<String>) -> Self {
        Self {
            started: false,
            stopped_by: String::new(),
            admin: admin.into(),
        }
    }

    pub fn start(&mut self) {
        self.started = true;
        self.stopped_by.clear();
    }

    pub fn stop(&mut self) {
        self.started = false;
    }

    pub fn stop_with_winner(&mut self, name: &str) {
        self.started = false;
        self.stopped_by = name.to_string();
    }
}
