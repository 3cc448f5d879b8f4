//! Error types for mocknifi

use crate::types::EntryKind;

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for mocknifi
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Keystore bytes do not follow the container layout
    #[error("Malformed keystore: {0}")]
    MalformedKeystore(String),

    /// Container is a keystore type this decoder does not read
    #[error("Unsupported keystore format: {0}")]
    UnsupportedKeystore(String),

    /// Integrity digest mismatch
    #[error("Keystore was tampered with, or password was incorrect")]
    KeystoreDecrypt,

    /// Key entry could not be recovered with the supplied password
    #[error("Cannot recover private key '{alias}': wrong key password or corrupt entry")]
    KeyDecrypt {
        /// Alias of the key entry
        alias: String,
    },

    /// Key protection or key algorithm not understood
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A required entry is missing
    #[error("No {kind} entry with alias '{alias}'")]
    EntryNotFound {
        /// Entry kind that was looked up
        kind: EntryKind,
        /// Alias that was looked up
        alias: String,
    },

    /// TLS context could not be assembled
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    /// TLS handshake with a peer failed
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Runtime error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an entry-not-found error
    pub fn entry_not_found(kind: EntryKind, alias: impl Into<String>) -> Self {
        Error::EntryNotFound {
            kind,
            alias: alias.into(),
        }
    }

    /// Whether this error aborts startup rather than a single connection
    pub fn is_fatal_at_startup(&self) -> bool {
        !matches!(self, Error::Handshake(_))
    }
}
