//! Authoritative game session: settings, players, leaderboard and the guess
//! rules that tie them together.
//!
//! A [`Game`] is built once by whoever hosts the session and then driven one
//! operation at a time. Every successful mutation publishes exactly one
//! [`GameEvent`]; failed operations change nothing and publish nothing.

use crate::leaderboard::Leaderboard;
use crate::notifier::Notifier;
use crate::registry::PlayerRegistry;
use crate::secret::SecretSource;
use crate::settings::{apply_update, SessionState};
use log::{debug, info};
use shared::{
    GameError, GameEvent, GuessOutcome, Hint, PlayerId, PlayerSummary, Settings, SettingsUpdate,
    Snapshot, MAX_NAME_LEN,
};
use std::cmp::Ordering;
use tokio::sync::broadcast;

pub struct Game {
    settings: Settings,
    session: SessionState,
    players: PlayerRegistry,
    leaderboard: Leaderboard,
    notifier: Notifier,
    source: Box<dyn SecretSource>,
}

impl Game {
    pub fn new(settings: Settings, admin: &str, source: impl SecretSource + 'static) -> Self {
        Self {
            settings,
            session: SessionState::new(admin),
            players: PlayerRegistry::new(),
            leaderboard: Leaderboard::new(),
            notifier: Notifier::new(),
            source: Box::new(source),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    pub fn is_running(&self) -> bool {
        self.session.started
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.notifier.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            settings: self.settings.clone(),
            players: self.players.summaries(),
            leaderboard: self.leaderboard.entries().clone(),
            started: self.session.started,
            stopped_by: self.session.stopped_by.clone(),
        }
    }

    pub fn update_settings(&mut self, update: SettingsUpdate) {
        apply_update(&mut self.settings, update);
        info!("Settings updated: {:?}", self.settings);
        self.notifier.publish(GameEvent::SettingsUpdated {
            settings: self.settings.clone(),
        });
    }

    /// Replaces the session key. Players, secrets and the running flag are
    /// left alone.
    pub fn generate_key(&mut self) -> String {
        let key = self.source.next_key();
        self.settings.session_key = key.clone();
        info!("Generated session key {}", key);
        self.notifier.publish(GameEvent::KeyGenerated { key: key.clone() });
        key
    }

    /// Starts a fresh round: every player gets a new target and a full set of
    /// chances.
    pub fn start_game(&mut self) {
        let chances = self.settings.chances_per_player;
        for player in self.players.iter_mut() {
            player.restart(self.source.next_secret(), chances);
        }
        self.session.start();
        info!("Game started with {} players", self.players.len());
        self.notifier.publish(GameEvent::GameStarted);
    }

    pub fn stop_game(&mut self) {
        self.session.stop();
        info!("Game stopped by admin");
        self.notifier.publish(GameEvent::GameStopped);
    }

    pub fn clear_lobby(&mut self) {
        self.players.clear();
        info!("Lobby cleared");
        self.notifier.publish(GameEvent::LobbyCleared);
    }

    pub fn reset_leaderboard(&mut self) {
        self.leaderboard.reset();
        info!("Leaderboard reset");
        self.notifier.publish(GameEvent::LeaderboardReset);
    }

    /// Adds a player with a fresh secret. Names longer than
    /// [`MAX_NAME_LEN`] characters are refused before the capacity check.
    pub fn add_player(&mut self, name: &str) -> Result<PlayerSummary, GameError> {
        if name.chars().count() > MAX_NAME_LEN {
            return Err(GameError::NameTooLong {
                max_len: MAX_NAME_LEN,
            });
        }
        let player = self.players.add_player(
            name,
            self.settings.max_players,
            self.settings.chances_per_player,
            || self.source.next_secret(),
        )?;
        let summary = player.summary();
        self.notifier.publish(GameEvent::PlayerJoined {
            player: summary.clone(),
        });
        Ok(summary)
    }

    /// Joins with a session key. Fails unless a key has been generated and
    /// `key` matches it; the round does not need to be running.
    pub fn join(&mut self, key: &str, name: &str) -> Result<PlayerSummary, GameError> {
        if !self.settings.has_key() || key != self.settings.session_key {
            return Err(GameError::InvalidSessionKey);
        }
        self.add_player(name)
    }

    /// Removes a player if present. Publishes the removal either way.
    pub fn remove_player(&mut self, id: PlayerId) {
        self.players.remove_player(id);
        self.notifier.publish(GameEvent::PlayerRemoved { id });
    }

    /// Evaluates one guess for one player.
    ///
    /// Checks run in a fixed order: unknown player, then stopped session,
    /// then exhausted chances. A player who enters with no chances left gets
    /// a personal restart and the guess is discarded. Otherwise one chance is
    /// spent and the guess is compared; a miss that spends the last chance
    /// also restarts the player. A hit ends the round for everyone.
    pub fn submit_guess(&mut self, id: PlayerId, guess: i64) -> Result<GuessOutcome, GameError> {
        let chances = self.settings.chances_per_player;
        let player = self.players.get_mut(id).ok_or(GameError::PlayerNotFound)?;
        if !self.session.started {
            return Err(GameError::SessionNotActive);
        }

        if player.chances_left == 0 {
            player.restart(self.source.next_secret(), chances);
            info!("Player {} ({}) restarted with no chances left", id, player.name);
            self.notifier.publish(GameEvent::PersonalRestart {
                id,
                name: player.name.clone(),
            });
            return Ok(GuessOutcome::Continue {
                hint: None,
                restarted: true,
                chances_left: player.chances_left,
                message: "You had no chances — your personal game restarted".to_string(),
                event: format!("{} personal game restarted", player.name),
            });
        }

        player.chances_left -= 1;

        let hint = match guess.cmp(&i64::from(player.secret)) {
            Ordering::Equal => {
                let name = player.name.clone();
                let number = player.secret;
                let attempts = chances.saturating_sub(player.chances_left);
                let entry = self.leaderboard.record_win(&name, attempts);
                self.session.stop_with_winner(&name);
                info!(
                    "Player {} ({}) won in {} attempts ({} wins total)",
                    id, name, attempts, entry.wins
                );
                self.notifier.publish(GameEvent::PlayerWon {
                    id,
                    name: name.clone(),
                    attempts,
                    number,
                });
                return Ok(GuessOutcome::Win {
                    message: format!("Correct! {} wins!", name),
                    event: format!("{} won the game", name),
                    name,
                    attempts,
                    number,
                });
            }
            Ordering::Less => Hint::Greater,
            Ordering::Greater => Hint::Smaller,
        };

        if player.chances_left == 0 {
            player.restart(self.source.next_secret(), chances);
            info!("Player {} ({}) ran out of chances", id, player.name);
            self.notifier.publish(GameEvent::PersonalRestart {
                id,
                name: player.name.clone(),
            });
            return Ok(GuessOutcome::Continue {
                hint: Some(hint),
                restarted: true,
                chances_left: player.chances_left,
                message: format!(
                    "{} You ran out of chances — your personal game restarted.",
                    hint.message()
                ),
                event: format!("{} ran out of chances and restarted", player.name),
            });
        }

        debug!(
            "Player {} guessed {}: {} ({} chances left)",
            id, guess, hint, player.chances_left
        );
        self.notifier.publish(GameEvent::PlayerGuess {
            id,
            name: player.name.clone(),
            guess,
            hint,
        });
        Ok(GuessOutcome::Continue {
            hint: Some(hint),
            restarted: false,
            chances_left: player.chances_left,
            message: hint.message().to_string(),
            event: format!("{} guessed {} — {}", player.name, guess, hint),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::ScriptedSource;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio_test::{assert_err, assert_ok};

    fn settings(max_players: u32, chances: u32) -> Settings {
        Settings {
            session_key: "KEY1234".to_string(),
            max_players,
            chances_per_player: chances,
        }
    }

    fn started_game(chances: u32, secrets: &[u32]) -> (Game, PlayerId) {
        let mut game = Game::new(
            settings(5, chances),
            "admin",
            ScriptedSource::new(secrets.iter().copied()),
        );
        let id = game.add_player("ada").unwrap().id;
        game.start_game();
        (game, id)
    }

    fn drain(rx: &mut broadcast::Receiver<GameEvent>) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_game_creation() {
        let game = Game::new(Settings::default(), "admin", ScriptedSource::new([]));
        assert!(!game.is_running());
        assert!(game.players().is_empty());
        assert!(game.leaderboard().is_empty());
        assert_eq!(game.session().admin, "admin");
    }

    #[test]
    fn test_unknown_player_checked_before_session() {
        let mut game = Game::new(settings(5, 5), "admin", ScriptedSource::new([]));
        let mut rx = game.subscribe();

        let result = game.submit_guess(PlayerId(99), 50);
        assert_eq!(result, Err(GameError::PlayerNotFound));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_guess_rejected_while_stopped() {
        let mut game = Game::new(settings(5, 5), "admin", ScriptedSource::new([42]));
        let id = game.add_player("ada").unwrap().id;
        let mut rx = game.subscribe();

        let result = game.submit_guess(id, 42);
        assert_eq!(result, Err(GameError::SessionNotActive));
        assert_eq!(game.players().get(id).unwrap().chances_left, 5);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_miss_gives_direction_and_spends_chance() {
        // join draws 1, start draws 42
        let (mut game, id) = started_game(5, &[1, 42]);

        let outcome = assert_ok!(game.submit_guess(id, 10));
        assert_eq!(outcome.hint(), Some(Hint::Greater));
        assert!(!outcome.is_restart());
        assert_eq!(outcome.message(), "The hidden number is greater.");
        assert_eq!(outcome.event(), "ada guessed 10 — The hidden number is greater.");
        assert_eq!(game.players().get(id).unwrap().chances_left, 4);

        let outcome = game.submit_guess(id, 50).unwrap();
        assert_eq!(outcome.hint(), Some(Hint::Smaller));
        assert_eq!(game.players().get(id).unwrap().chances_left, 3);
    }

    #[test]
    fn test_win_ends_round_and_records_attempts() {
        let (mut game, id) = started_game(5, &[1, 42]);
        let mut rx = game.subscribe();

        game.submit_guess(id, 10).unwrap();
        let outcome = game.submit_guess(id, 42).unwrap();

        match outcome {
            GuessOutcome::Win {
                name,
                attempts,
                number,
                message,
                event,
            } => {
                assert_eq!(name, "ada");
                assert_eq!(attempts, 2);
                assert_eq!(number, 42);
                assert_eq!(message, "Correct! ada wins!");
                assert_eq!(event, "ada won the game");
            }
            other => panic!("expected a win, got {:?}", other),
        }

        assert!(!game.is_running());
        assert_eq!(game.session().stopped_by, "ada");
        let entry = game.leaderboard().get("ada").unwrap();
        assert_eq!(entry.wins, 1);
        assert_eq!(entry.total_attempts, 2);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            GameEvent::PlayerWon {
                id,
                name: "ada".to_string(),
                attempts: 2,
                number: 42,
            }
        );
    }

    #[test]
    fn test_win_stops_everyone() {
        let mut game = Game::new(settings(5, 5), "admin", ScriptedSource::new([1, 2, 30, 60]));
        let ada = game.add_player("ada").unwrap().id;
        let bob = game.add_player("bob").unwrap().id;
        game.start_game();

        game.submit_guess(bob, 60).unwrap();

        assert_eq!(game.session().stopped_by, "bob");
        assert_eq!(game.submit_guess(ada, 30), Err(GameError::SessionNotActive));
    }

    #[test]
    fn test_last_chance_miss_restarts() {
        // join 1, start 7, restart 55
        let (mut game, id) = started_game(2, &[1, 7, 55]);
        let mut rx = game.subscribe();

        game.submit_guess(id, 1).unwrap();
        let outcome = game.submit_guess(id, 1).unwrap();

        assert!(outcome.is_restart());
        assert!(!outcome.is_win());
        assert_eq!(outcome.hint(), Some(Hint::Greater));
        assert_eq!(
            outcome.message(),
            "The hidden number is greater. You ran out of chances — your personal game restarted."
        );
        assert_eq!(outcome.event(), "ada ran out of chances and restarted");

        let player = game.players().get(id).unwrap();
        assert_eq!(player.chances_left, 2);
        assert_eq!(player.secret, 55);

        let events = drain(&mut rx);
        assert_eq!(
            events.last(),
            Some(&GameEvent::PersonalRestart {
                id,
                name: "ada".to_string()
            })
        );
        assert!(!events
            .iter()
            .skip(1)
            .any(|e| matches!(e, GameEvent::PlayerGuess { .. })));
    }

    #[test]
    fn test_guess_with_no_chances_is_not_evaluated() {
        let (mut game, id) = started_game(0, &[1, 42, 43]);

        // chances_per_player is zero so the player enters with nothing left
        let outcome = game.submit_guess(id, 42).unwrap();

        assert!(outcome.is_restart());
        assert_eq!(outcome.hint(), None);
        assert!(!outcome.is_win());
        assert_eq!(outcome.message(), "You had no chances — your personal game restarted");
        assert_eq!(outcome.event(), "ada personal game restarted");
        assert!(game.is_running());
        assert!(game.leaderboard().is_empty());
        assert_eq!(game.players().get(id).unwrap().secret, 43);
    }

    #[test]
    fn test_out_of_range_guess_is_compared() {
        let (mut game, id) = started_game(5, &[1, 42]);
        assert_eq!(game.submit_guess(id, -5).unwrap().hint(), Some(Hint::Greater));
        assert_eq!(game.submit_guess(id, 1000).unwrap().hint(), Some(Hint::Smaller));
    }

    #[test]
    fn test_attempts_saturate_when_chances_lowered_mid_round() {
        let (mut game, id) = started_game(5, &[1, 42]);
        game.update_settings(SettingsUpdate {
            chances_per_player: Some(2),
            ..Default::default()
        });

        let outcome = game.submit_guess(id, 42).unwrap();
        match outcome {
            GuessOutcome::Win { attempts, .. } => assert_eq!(attempts, 0),
            other => panic!("expected a win, got {:?}", other),
        }
    }

    #[test]
    fn test_start_game_resets_every_player() {
        let mut game = Game::new(
            settings(5, 3),
            "admin",
            ScriptedSource::new([1, 2, 3, 10, 20, 30]),
        );
        let ids: Vec<PlayerId> = ["ada", "bob", "cy"]
            .iter()
            .map(|name| game.add_player(name).unwrap().id)
            .collect();
        game.session.stop_with_winner("bob");
        game.players.get_mut(ids[0]).unwrap().chances_left = 1;

        game.start_game();

        assert!(game.is_running());
        assert!(game.session().stopped_by.is_empty());
        let secrets: Vec<u32> = game.players().iter().map(|p| p.secret).collect();
        assert_eq!(secrets, vec![10, 20, 30]);
        assert!(game.players().iter().all(|p| p.chances_left == 3));
    }

    #[test]
    fn test_stop_game_keeps_players() {
        let (mut game, _) = started_game(5, &[1, 2]);
        let mut rx = game.subscribe();
        game.stop_game();

        assert!(!game.is_running());
        assert_eq!(game.players().len(), 1);
        assert!(game.session().stopped_by.is_empty());
        assert_eq!(drain(&mut rx), vec![GameEvent::GameStopped]);
    }

    #[test]
    fn test_update_settings_publishes_merged_settings() {
        let mut game = Game::new(settings(5, 5), "admin", ScriptedSource::new([]));
        let mut rx = game.subscribe();

        game.update_settings(SettingsUpdate {
            max_players: Some(8),
            ..Default::default()
        });

        let expected = Settings {
            session_key: "KEY1234".to_string(),
            max_players: 8,
            chances_per_player: 5,
        };
        assert_eq!(game.settings(), &expected);
        assert_eq!(
            drain(&mut rx),
            vec![GameEvent::SettingsUpdated { settings: expected }]
        );
    }

    #[test]
    fn test_add_player_publishes_summary() {
        let mut game = Game::new(settings(5, 3), "admin", ScriptedSource::new([17]));
        let mut rx = game.subscribe();

        let summary = assert_ok!(game.add_player("ada"));

        assert_eq!(summary.id, PlayerId(1));
        assert_eq!(summary.chances_left, 3);
        assert_eq!(game.players().get(summary.id).unwrap().secret, 17);
        assert_eq!(
            drain(&mut rx),
            vec![GameEvent::PlayerJoined { player: summary }]
        );
    }

    #[test]
    fn test_long_name_refused() {
        let mut game = Game::new(settings(5, 5), "admin", ScriptedSource::new([17]));
        let mut rx = game.subscribe();

        let result = game.join("KEY1234", &"x".repeat(3000));
        assert_eq!(
            assert_err!(result),
            GameError::NameTooLong {
                max_len: MAX_NAME_LEN
            }
        );
        assert!(game.players().is_empty());
        assert!(drain(&mut rx).is_empty());

        // The refused join must not have consumed a secret
        let ada = assert_ok!(game.join("KEY1234", &"é".repeat(MAX_NAME_LEN)));
        assert_eq!(game.players().get(ada.id).unwrap().secret, 17);
    }

    #[test]
    fn test_generate_key_leaves_round_alone() {
        let mut game = Game::new(
            settings(5, 5),
            "admin",
            ScriptedSource::new([1, 2]).with_keys(["NEWKEY1".to_string()]),
        );
        let id = game.add_player("ada").unwrap().id;
        game.start_game();
        let mut rx = game.subscribe();

        let key = game.generate_key();

        assert_eq!(key, "NEWKEY1");
        assert_eq!(game.settings().session_key, "NEWKEY1");
        assert!(game.is_running());
        assert_eq!(game.players().get(id).unwrap().secret, 2);
        assert_eq!(
            drain(&mut rx),
            vec![GameEvent::KeyGenerated {
                key: "NEWKEY1".to_string()
            }]
        );
    }

    #[test]
    fn test_join_requires_matching_key() {
        let mut game = Game::new(Settings::default(), "admin", ScriptedSource::new([]));
        assert_eq!(assert_err!(game.join("", "ada")), GameError::InvalidSessionKey);

        let key = game.generate_key();
        assert_eq!(assert_err!(game.join("WRONG", "ada")), GameError::InvalidSessionKey);

        let player = assert_ok!(game.join(&key, "ada"));
        assert_eq!(player.name, "ada");
        assert_eq!(game.players().len(), 1);
    }

    #[test]
    fn test_capacity_exceeded_publishes_nothing() {
        let mut game = Game::new(settings(1, 5), "admin", ScriptedSource::new([]));
        game.add_player("ada").unwrap();
        let mut rx = game.subscribe();

        let result = game.add_player("bob");

        assert_eq!(result, Err(GameError::CapacityExceeded { max_players: 1 }));
        assert_eq!(game.players().len(), 1);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_remove_missing_player_is_noop() {
        let mut game = Game::new(settings(5, 5), "admin", ScriptedSource::new([]));
        let mut rx = game.subscribe();

        game.remove_player(PlayerId(3));

        assert!(game.players().is_empty());
        assert_eq!(drain(&mut rx), vec![GameEvent::PlayerRemoved { id: PlayerId(3) }]);
    }

    #[test]
    fn test_clear_lobby_keeps_leaderboard_and_settings() {
        let (mut game, id) = started_game(5, &[1, 42]);
        game.submit_guess(id, 42).unwrap();
        let mut rx = game.subscribe();

        game.clear_lobby();

        assert!(game.players().is_empty());
        assert_eq!(drain(&mut rx), vec![GameEvent::LobbyCleared]);
        assert_eq!(game.leaderboard().get("ada").unwrap().wins, 1);
        assert_eq!(game.settings().session_key, "KEY1234");
        assert_eq!(game.session().stopped_by, "ada");
    }

    #[test]
    fn test_reset_leaderboard() {
        let (mut game, id) = started_game(5, &[1, 42]);
        game.submit_guess(id, 42).unwrap();
        let mut rx = game.subscribe();

        game.reset_leaderboard();

        assert!(game.leaderboard().is_empty());
        assert_eq!(drain(&mut rx), vec![GameEvent::LeaderboardReset]);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let (mut game, id) = started_game(5, &[1, 42]);
        game.submit_guess(id, 10).unwrap();

        let snapshot = game.snapshot();
        assert!(snapshot.started);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].chances_left, 4);
        assert_eq!(snapshot.settings.session_key, "KEY1234");
        assert!(snapshot.leaderboard.is_empty());
    }
}
