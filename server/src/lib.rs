//! # Guessing Game Server Library
//!
//! This library provides the authoritative server for the multiplayer
//! number-guessing game. It owns the canonical game state, evaluates every
//! guess, and pushes each state change to all connected observers.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Game State
//! One [`game::Game`] value holds the settings, the session flag, the player
//! registry and the leaderboard. It is created once at startup and mutated
//! only by the server's main loop, one request at a time, so no operation
//! ever observes a half-applied change.
//!
//! ### Guess Evaluation
//! Each player chases their own hidden number in `[1, 100]` with a limited
//! number of chances. Running out of chances restarts that player's personal
//! game instead of eliminating them; the round ends only when somebody
//! guesses right, which stops the session for everyone and credits the
//! winner on the leaderboard.
//!
//! ### Event Broadcasting
//! Every successful mutation publishes one [`shared::GameEvent`]. Delivery is
//! best-effort: observers that were not listening never see old events and
//! re-query the snapshot instead.
//!
//! ## Module Organization
//!
//! - `game`: the session object and the guess rules
//! - `settings`: settings merge and the running/stopped record
//! - `registry`: joined players and their private round state
//! - `leaderboard`: wins and attempts per player name
//! - `notifier`: at-most-once event fan-out
//! - `secret`: hidden numbers and session keys
//! - `auth`: admin credential check used by the transport
//! - `connections`: connected UDP peers
//! - `network`: the UDP server loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::auth::StaticCredentials;
//! use server::game::Game;
//! use server::network::{Server, ServerConfig};
//! use server::secret::RandomSource;
//! use shared::Settings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let game = Game::new(Settings::default(), "admin", RandomSource::new());
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         game,
//!         StaticCredentials::new("admin", "1234"),
//!         ServerConfig::default(),
//!     )
//!     .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod connections;
pub mod game;
pub mod leaderboard;
pub mod network;
pub mod notifier;
pub mod registry;
pub mod secret;
pub mod settings;
pub mod utils;
