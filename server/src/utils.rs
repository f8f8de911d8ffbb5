use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Link a player opens to join with the given key; rendering it as a QR code
// is up to the frontend
pub fn join_url(base: &str, key: &str) -> String {
    format!("{}/game.html?key={}", base.trim_end_matches('/'), key)
}
