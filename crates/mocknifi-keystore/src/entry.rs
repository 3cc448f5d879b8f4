//! Keystore entry types

use chrono::{DateTime, Utc};
use der::asn1::ObjectIdentifier;
use mocknifi_core::{EntryKind, Error, Result};
use pkcs8::PrivateKeyInfo;
use serde::Serialize;
use std::fmt;
use zeroize::Zeroizing;

/// `rsaEncryption` from PKCS#1
pub const RSA_ENCRYPTION_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Certificate as stored in a keystore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    cert_type: String,
    der: Vec<u8>,
}

impl Certificate {
    /// Create a certificate from its type name and encoding
    pub fn new(cert_type: impl Into<String>, der: impl Into<Vec<u8>>) -> Self {
        Self {
            cert_type: cert_type.into(),
            der: der.into(),
        }
    }

    /// Certificate type, `X.509` in practice
    pub fn cert_type(&self) -> &str {
        &self.cert_type
    }

    /// DER encoding
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

/// Private key algorithm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// RSA, exposed in its PKCS#1 form
    Rsa,
    /// Any other algorithm, exposed as PKCS#8
    Other(ObjectIdentifier),
}

impl KeyAlgorithm {
    fn from_oid(oid: ObjectIdentifier) -> Self {
        if oid == RSA_ENCRYPTION_OID {
            Self::Rsa
        } else {
            Self::Other(oid)
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa => write!(f, "RSA"),
            Self::Other(oid) => write!(f, "{oid}"),
        }
    }
}

/// Decrypted private key with its certificate chain
pub struct PrivateKeyEntry {
    alias: String,
    created: DateTime<Utc>,
    algorithm: KeyAlgorithm,
    pkcs8: Zeroizing<Vec<u8>>,
    key: Zeroizing<Vec<u8>>,
    cert_chain: Vec<Certificate>,
}

impl PrivateKeyEntry {
    /// Build an entry from a PKCS#8 `PrivateKeyInfo` document
    pub fn from_pkcs8(
        alias: impl Into<String>,
        created: DateTime<Utc>,
        pkcs8: Zeroizing<Vec<u8>>,
        cert_chain: Vec<Certificate>,
    ) -> Result<Self> {
        let alias = alias.into();
        let info = PrivateKeyInfo::try_from(pkcs8.as_slice()).map_err(|e| {
            Error::MalformedKeystore(format!("key entry '{alias}' is not PKCS#8: {e}"))
        })?;

        let algorithm = KeyAlgorithm::from_oid(info.algorithm.oid);
        let key = match algorithm {
            KeyAlgorithm::Rsa => Zeroizing::new(info.private_key.to_vec()),
            KeyAlgorithm::Other(_) => pkcs8.clone(),
        };

        Ok(Self {
            alias,
            created,
            algorithm,
            pkcs8,
            key,
            cert_chain,
        })
    }

    /// Alias the entry was stored under
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Creation date recorded in the keystore
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Key algorithm
    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }

    /// Algorithm-specific key encoding: PKCS#1 for RSA, PKCS#8 otherwise
    pub fn key_der(&self) -> &[u8] {
        &self.key
    }

    /// Generic PKCS#8 key encoding
    pub fn pkcs8_der(&self) -> &[u8] {
        &self.pkcs8
    }

    /// Certificate chain, leaf first
    pub fn cert_chain(&self) -> &[Certificate] {
        &self.cert_chain
    }
}

impl fmt::Debug for PrivateKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyEntry")
            .field("alias", &self.alias)
            .field("created", &self.created)
            .field("algorithm", &self.algorithm)
            .field("cert_chain", &self.cert_chain.len())
            .finish_non_exhaustive()
    }
}

/// Trusted certificate entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedCertificateEntry {
    alias: String,
    created: DateTime<Utc>,
    certificate: Certificate,
}

impl TrustedCertificateEntry {
    /// Create a trusted certificate entry
    pub fn new(alias: impl Into<String>, created: DateTime<Utc>, certificate: Certificate) -> Self {
        Self {
            alias: alias.into(),
            created,
            certificate,
        }
    }

    /// Alias the entry was stored under
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Creation date recorded in the keystore
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// The certificate
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }
}

/// Private key entry as read from disk, still encrypted
#[derive(Debug, Clone)]
pub(crate) struct ProtectedKeyEntry {
    pub(crate) alias: String,
    pub(crate) created: DateTime<Utc>,
    pub(crate) protected: Vec<u8>,
    pub(crate) cert_chain: Vec<Certificate>,
}

/// Listing view of an entry, without key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    /// Alias
    pub alias: String,
    /// Entry kind
    pub kind: EntryKind,
    /// Creation date
    pub created: DateTime<Utc>,
    /// Number of certificates attached to the entry
    pub certificates: usize,
}
