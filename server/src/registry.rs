//! Player registry for the current session
//!
//! Tracks every player who joined the lobby along with their private round
//! state (hidden target and remaining chances). The registry enforces the
//! player cap and hands out ids; all rule decisions live in the game module.

use crate::utils::get_timestamp;
use log::info;
use shared::{GameError, PlayerId, PlayerSummary};
use std::collections::BTreeMap;

/// A joined player and their private round state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Process-unique id, allocated in join order
    pub id: PlayerId,
    /// Display name; also the leaderboard key
    pub name: String,
    /// Guesses remaining before a personal restart
    pub chances_left: u32,
    /// Hidden target this player is guessing
    pub secret: u32,
    /// Join time in milliseconds since the Unix epoch
    pub joined_at: u64,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, chances: u32, secret: u32) -> Self {
        Self {
            id,
            name: name.into(),
            chances_left: chances,
            secret,
            joined_at: get_timestamp(),
        }
    }

    /// Gives the player a new target and a full set of chances.
    pub fn restart(&mut self, secret: u32, chances: u32) {
        self.secret = secret;
        self.chances_left = chances;
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            name: self.name.clone(),
            chances_left: self.chances_left,
            joined_at: self.joined_at,
        }
    }
}

/// All players in the current session, ordered by join
#[derive(Debug, Clone)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, Player>,
    next_player_id: u64,
}

impl PlayerRegistry {
    /// Creates an empty registry. Ids start from 1.
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            next_player_id: 1,
        }
    }

    /// Adds a player unless the registry already holds `max_players`.
    ///
    /// `secret` is only drawn when the player is actually added. Ids are
    /// never reused, even after the player is removed or the lobby is cleared.
    pub fn add_player(
        &mut self,
        name: &str,
        max_players: u32,
        chances: u32,
        secret: impl FnOnce() -> u32,
    ) -> Result<&Player, GameError> {
        if self.players.len() >= max_players as usize {
            return Err(GameError::CapacityExceeded { max_players });
        }

        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;

        info!("Player {} joined as {:?}", id, name);
        Ok(self
            .players
            .entry(id)
            .or_insert_with(|| Player::new(id, name, chances, secret())))
    }

    /// Removes a player. Returns false if they were already gone.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        if let Some(player) = self.players.remove(&id) {
            info!("Player {} ({}) removed", player.id, player.name);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn summaries(&self) -> Vec<PlayerSummary> {
        self.players.values().map(Player::summary).collect()
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
