//! Randomness used by the game: hidden targets and session keys.
//!
//! The game never calls `rand` directly; it asks a [`SecretSource`]. The
//! server uses [`RandomSource`], tests plug in a scripted source so that
//! hidden numbers are known in advance.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{SECRET_MAX, SECRET_MIN, SESSION_KEY_LEN};
use std::collections::VecDeque;

const KEY_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub trait SecretSource: Send {
    /// Returns a hidden target in `[SECRET_MIN, SECRET_MAX]`.
    fn next_secret(&mut self) -> u32;

    /// Returns a fresh session key. No uniqueness against earlier keys.
    fn next_key(&mut self) -> String;
}

/// [`SecretSource`] backed by a seedable standard RNG
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretSource for RandomSource {
    fn next_secret(&mut self) -> u32 {
        self.rng.gen_range(SECRET_MIN..=SECRET_MAX)
    }

    fn next_key(&mut self) -> String {
        (0..SESSION_KEY_LEN)
            .map(|_| KEY_ALPHABET[self.rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect()
    }
}

/// Hands out pre-arranged secrets and keys in order, then falls back to a
/// seeded RNG once the script runs out.
pub struct ScriptedSource {
    secrets: VecDeque<u32>,
    keys: VecDeque<String>,
    fallback: RandomSource,
}

impl ScriptedSource {
    pub fn new(secrets: impl IntoIterator<Item = u32>) -> Self {
        Self {
            secrets: secrets.into_iter().collect(),
            keys: VecDeque::new(),
            fallback: RandomSource::seeded(0),
        }
    }

    pub fn with_keys(mut self, keys: impl IntoIterator<Item = String>) -> Self {
        self.keys = keys.into_iter().collect();
        self
    }
}

impl SecretSource for ScriptedSource {
    fn next_secret(&mut self) -> u32 {
        self.secrets
            .pop_front()
            .unwrap_or_else(|| self.fallback.next_secret())
    }

    fn next_key(&mut self) -> String {
        self.keys
            .pop_front()
            .unwrap_or_else(|| self.fallback.next_key())
    }
}
