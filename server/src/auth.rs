//! Admin credential check
//!
//! The game itself never sees credentials. The network layer asks a
//! [`CredentialCheck`] once per `AdminLogin` and remembers the answer on the
//! connection.

pub trait CredentialCheck: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// A single username/password pair taken from the command line
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    username: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl CredentialCheck for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}
