//! # Guessing Game Client Library
//!
//! A line-oriented terminal client for the guessing game server. It is a
//! thin shell: every decision is made by the server, and the client only
//! turns typed commands into request packets and prints what comes back.
//!
//! ## Module Organization
//!
//! ### Commands Module (`commands`)
//! Parses typed lines (`join`, `guess`, `login`, `start`, ...) into
//! requests, filling in the joined player id and default name.
//!
//! ### Network Module (`network`)
//! Owns the UDP socket: connects, keeps the connection alive with
//! heartbeats, sends requests, and prints replies and pushed events.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new("127.0.0.1:8080", Some("ada".to_string())).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod network;
