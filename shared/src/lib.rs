use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const PROTOCOL_VERSION: u32 = 1;
pub const SECRET_MIN: u32 = 1;
pub const SECRET_MAX: u32 = 100;
pub const DEFAULT_MAX_PLAYERS: u32 = 5;
pub const DEFAULT_CHANCES_PER_PLAYER: u32 = 5;
pub const SESSION_KEY_LEN: usize = 7;
/// Longest accepted display name, in characters
pub const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Heartbeat,
    Disconnect,
    AdminLogin {
        username: String,
        password: String,
    },
    Admin(AdminCommand),
    Join {
        key: String,
        name: String,
    },
    Guess {
        player_id: PlayerId,
        guess: i64,
    },
    QuerySnapshot,

    Connected {
        client_id: u32,
    },
    Disconnected {
        reason: String,
    },
    AdminLoginResult {
        success: bool,
    },
    AdminAck,
    KeyGenerated {
        key: String,
        join_url: String,
    },
    JoinResult {
        result: Result<PlayerSummary, GameError>,
    },
    GuessResult {
        result: Result<GuessOutcome, GameError>,
    },
    SnapshotData {
        snapshot: Snapshot,
    },
    Rejected {
        reason: String,
    },
    Event {
        event: GameEvent,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum AdminCommand {
    UpdateSettings(SettingsUpdate),
    GenerateKey,
    StartGame,
    StopGame,
    ClearLobby,
    ResetLeaderboard,
    RemovePlayer { id: PlayerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Admin-controlled game parameters. An empty `session_key` means no key
/// has been generated yet.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub session_key: String,
    pub max_players: u32,
    pub chances_per_player: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_key: String::new(),
            max_players: DEFAULT_MAX_PLAYERS,
            chances_per_player: DEFAULT_CHANCES_PER_PLAYER,
        }
    }
}

impl Settings {
    pub fn has_key(&self) -> bool {
        !self.session_key.is_empty()
    }
}

/// Partial settings change; every `Some` field overwrites the current value.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub session_key: Option<String>,
    pub max_players: Option<u32>,
    pub chances_per_player: Option<u32>,
}

/// A player as seen by observers; the hidden target is never included.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub chances_left: u32,
    pub joined_at: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub wins: u32,
    pub total_attempts: u32,
}

/// Direction feedback for a missed guess.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// The hidden number is greater than the guess.
    Greater,
    /// The hidden number is smaller than the guess.
    Smaller,
}

impl Hint {
    pub fn message(&self) -> &'static str {
        match self {
            Hint::Greater => "The hidden number is greater.",
            Hint::Smaller => "The hidden number is smaller.",
        }
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Non-error result of a guess.
///
/// `Continue` means the round goes on: either the guess missed (with a
/// hint), or the player's chances ran out and their personal game was
/// restarted. `Win` means the guess was correct and the round is over for
/// every player.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    Continue {
        /// `None` when the guess was not evaluated at all because the
        /// player had no chances left on entry.
        hint: Option<Hint>,
        restarted: bool,
        chances_left: u32,
        message: String,
        event: String,
    },
    Win {
        name: String,
        attempts: u32,
        /// The hidden number that was guessed
        number: u32,
        message: String,
        event: String,
    },
}

impl GuessOutcome {
    pub fn is_win(&self) -> bool {
        matches!(self, GuessOutcome::Win { .. })
    }

    pub fn is_restart(&self) -> bool {
        matches!(self, GuessOutcome::Continue { restarted: true, .. })
    }

    pub fn hint(&self) -> Option<Hint> {
        match self {
            GuessOutcome::Continue { hint, .. } => *hint,
            GuessOutcome::Win { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GuessOutcome::Continue { message, .. } | GuessOutcome::Win { message, .. } => message,
        }
    }

    pub fn event(&self) -> &str {
        match self {
            GuessOutcome::Continue { event, .. } | GuessOutcome::Win { event, .. } => event,
        }
    }
}

/// Recoverable failures of game operations. None of them mutate state.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Player not found")]
    PlayerNotFound,
    #[error("Game not started by admin")]
    SessionNotActive,
    #[error("Room full ({max_players} players)")]
    CapacityExceeded { max_players: u32 },
    #[error("Invalid or expired key")]
    InvalidSessionKey,
    #[error("Name too long (at most {max_len} characters)")]
    NameTooLong { max_len: usize },
}

/// Flat `{success, message, event}` view of a guess result for activity
/// logs and simple frontends.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GuessReport {
    pub success: bool,
    pub message: String,
    pub event: Option<String>,
}

impl From<&Result<GuessOutcome, GameError>> for GuessReport {
    fn from(result: &Result<GuessOutcome, GameError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: outcome.is_win(),
                message: outcome.message().to_string(),
                event: Some(outcome.event().to_string()),
            },
            Err(e) => Self {
                success: false,
                message: e.to_string(),
                event: None,
            },
        }
    }
}

/// Every observable state transition, published once per successful
/// mutating operation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum GameEvent {
    SettingsUpdated { settings: Settings },
    KeyGenerated { key: String },
    PlayerJoined { player: PlayerSummary },
    PlayerRemoved { id: PlayerId },
    GameStarted,
    GameStopped,
    LobbyCleared,
    LeaderboardReset,
    PlayerGuess {
        id: PlayerId,
        name: String,
        guess: i64,
        hint: Hint,
    },
    PersonalRestart { id: PlayerId, name: String },
    PlayerWon {
        id: PlayerId,
        name: String,
        attempts: u32,
        number: u32,
    },
}

impl GameEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::SettingsUpdated { .. } => "settings_updated",
            GameEvent::KeyGenerated { .. } => "key_generated",
            GameEvent::PlayerJoined { .. } => "player_joined",
            GameEvent::PlayerRemoved { .. } => "player_removed",
            GameEvent::GameStarted => "game_started",
            GameEvent::GameStopped => "game_stopped",
            GameEvent::LobbyCleared => "lobby_cleared",
            GameEvent::LeaderboardReset => "leader_reset",
            GameEvent::PlayerGuess { .. } => "player_guess",
            GameEvent::PersonalRestart { .. } => "player_personal_restart",
            GameEvent::PlayerWon { .. } => "player_won",
        }
    }
}

/// Queryable current state; observers re-read it on (re)connect since
/// events are never replayed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub settings: Settings,
    pub players: Vec<PlayerSummary>,
    pub leaderboard: HashMap<String, LeaderboardEntry>,
    pub started: bool,
    pub stopped_by: String,
}
