//! Error taxonomy for the fleet engine.
//!
//! Fatal conditions abort the current operation: a broken configuration, an
//! inventory provider reporting an explicit failure, a remote command that
//! exits non-zero, or an unreadable cache file. Non-fatal conditions
//! (placement exhaustion) never appear here — they are logged warnings at
//! their call sites and the pass continues.

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or contradictory configuration. Never continued past.
    #[error("configuration error: {0}")]
    Config(String),

    /// The inventory provider returned an explicit failure payload.
    #[error("inventory provider error: {0}")]
    Provider(String),

    /// A remote command failed. Aborts the current pass; no retry, no
    /// rollback of changes already applied.
    #[error("remote command failed on {host}: {message}")]
    Remote { host: String, message: String },

    /// Output from a remote host could not be interpreted.
    #[error("unparseable output from {host}: {message}")]
    Parse { host: String, message: String },

    #[error("cache error: {0}")]
    Cache(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Shorthand for a remote failure on a named host.
    pub fn remote(host: &str, message: impl Into<String>) -> Self {
        Error::Remote {
            host: host.to_string(),
            message: message.into(),
        }
    }
}
