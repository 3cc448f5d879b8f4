//! Common types used throughout mocknifi

use serde::Serialize;
use std::fmt;

/// Kind of entry held in a keystore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Encrypted private key with its certificate chain
    PrivateKey,
    /// Standalone trusted certificate
    TrustedCertificate,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKey => write!(f, "private key"),
            Self::TrustedCertificate => write!(f, "trusted certificate"),
        }
    }
}
