//! Connected observers of the game server
//!
//! Every UDP peer that completed the `Connect` handshake gets a
//! [`Connection`], keyed by its socket address since that is all a datagram
//! tells us about its sender. A connection remembers whether it logged in as
//! admin and which player it joined as.
//!
//! Connections and players are separate: a player stays in the lobby when the
//! connection that created it goes away.

use log::info;
use shared::PlayerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Silence after which a connection is dropped
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct Connection {
    /// Id handed back in `Connected`
    pub id: u32,
    pub addr: SocketAddr,
    pub last_seen: Instant,
    pub is_admin: bool,
    /// Player created by this connection's most recent join
    pub player_id: Option<PlayerId>,
}

impl Connection {
    fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            is_admin: false,
            player_id: None,
        }
    }

    pub fn is_stale(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Live connections, capped at `capacity`
pub struct ConnectionTable {
    by_addr: HashMap<SocketAddr, Connection>,
    next_id: u32,
    capacity: usize,
}

impl ConnectionTable {
    /// Creates an empty table. Connection ids start from 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            by_addr: HashMap::new(),
            next_id: 1,
            capacity,
        }
    }

    /// Registers `addr`, replacing any earlier connection from the same
    /// address. Returns `None` when the table is full.
    pub fn open(&mut self, addr: SocketAddr) -> Option<u32> {
        if let Some(old) = self.by_addr.remove(&addr) {
            info!("Replacing connection {} from {}", old.id, addr);
        }
        if self.by_addr.len() >= self.capacity {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.by_addr.insert(addr, Connection::new(id, addr));
        info!("Connection {} opened from {}", id, addr);
        Some(id)
    }

    /// Drops the connection for `addr`. Returns false if there was none.
    pub fn close(&mut self, addr: SocketAddr) -> bool {
        match self.by_addr.remove(&addr) {
            Some(conn) => {
                info!("Connection {} closed", conn.id);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, addr: SocketAddr) -> Option<&Connection> {
        self.by_addr.get(&addr)
    }

    /// Marks `addr` as alive and returns its connection, or `None` for peers
    /// that never connected.
    pub fn touch(&mut self, addr: SocketAddr) -> Option<&mut Connection> {
        let conn = self.by_addr.get_mut(&addr)?;
        conn.last_seen = Instant::now();
        Some(conn)
    }

    pub fn is_admin(&self, addr: SocketAddr) -> bool {
        self.get(addr).map_or(false, |conn| conn.is_admin)
    }

    /// Removes connections silent for longer than `timeout` and returns
    /// their ids.
    pub fn expire(&mut self, timeout: Duration) -> Vec<u32> {
        let mut expired = Vec::new();
        self.by_addr.retain(|_, conn| {
            if conn.is_stale(timeout) {
                expired.push(conn.id);
                false
            } else {
                true
            }
        });
        expired
    }

    /// Addresses to fan pushed events out to
    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.by_addr.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }
}
