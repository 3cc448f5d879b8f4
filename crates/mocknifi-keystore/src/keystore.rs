//! JKS keystore loading and lookup

use crate::codec::Reader;
use crate::entry::{
    Certificate, EntrySummary, PrivateKeyEntry, ProtectedKeyEntry, TrustedCertificateEntry,
};
use crate::protector::{self, password_bytes};
use chrono::{DateTime, Utc};
use mocknifi_core::{EntryKind, Error, Result};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

pub(crate) const JKS_MAGIC: u32 = 0xFEED_FEED;
pub(crate) const JCEKS_MAGIC: u32 = 0xCECE_CECE;

pub(crate) const TAG_PRIVATE_KEY: u32 = 1;
pub(crate) const TAG_TRUSTED_CERT: u32 = 2;

/// Salt mixed into the integrity digest by every JDK since 1.2
pub(crate) const INTEGRITY_SALT: &[u8] = b"Mighty Aphrodite";

const HEADER_LEN: usize = 12;
const DIGEST_LEN: usize = 20;

#[derive(Debug, Clone)]
enum StoredEntry {
    PrivateKey(ProtectedKeyEntry),
    TrustedCertificate(TrustedCertificateEntry),
}

/// A decoded JKS keystore
///
/// Aliases are case-insensitive. Private keys remain encrypted until
/// [`KeyStore::private_key`] is called with the key password.
#[derive(Debug, Clone)]
pub struct KeyStore {
    version: u32,
    entries: BTreeMap<String, StoredEntry>,
}

impl KeyStore {
    /// Load and verify a keystore file
    pub fn load(path: impl AsRef<Path>, password: &str) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            Error::Io(io::Error::new(
                e.kind(),
                format!("failed to read keystore {}: {e}", path.display()),
            ))
        })?;

        let store = Self::from_bytes(&bytes, password)?;

        info!(
            path = %path.display(),
            version = store.version,
            entries = store.len(),
            "Loaded keystore"
        );

        Ok(store)
    }

    /// Decode and verify keystore bytes
    pub fn from_bytes(bytes: &[u8], password: &str) -> Result<Self> {
        let magic = bytes
            .get(..4)
            .map(|m| u32::from_be_bytes([m[0], m[1], m[2], m[3]]))
            .ok_or_else(|| Error::MalformedKeystore("file is too short".to_string()))?;

        match magic {
            JKS_MAGIC => {}
            JCEKS_MAGIC => {
                return Err(Error::UnsupportedKeystore(
                    "JCEKS keystores are not supported, convert to JKS".to_string(),
                ))
            }
            _ if bytes[0] == 0x30 => {
                return Err(Error::UnsupportedKeystore(
                    "file looks like PKCS#12, convert with keytool -deststoretype JKS".to_string(),
                ))
            }
            other => {
                return Err(Error::MalformedKeystore(format!(
                    "unknown magic number {other:#010x}"
                )))
            }
        }

        if bytes.len() < HEADER_LEN + DIGEST_LEN {
            return Err(Error::MalformedKeystore("file is too short".to_string()));
        }

        let (body, digest) = bytes.split_at(bytes.len() - DIGEST_LEN);
        if integrity_digest(password, body).as_slice() != digest {
            return Err(Error::KeystoreDecrypt);
        }

        let mut reader = Reader::new(body);
        reader.read_u32("magic")?;
        let version = reader.read_u32("version")?;
        if !matches!(version, 1 | 2) {
            return Err(Error::UnsupportedKeystore(format!(
                "JKS version {version}"
            )));
        }

        let count = reader.read_u32("entry count")?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let (alias, entry) = read_entry(&mut reader, version)?;
            if entries.insert(normalize_alias(&alias), entry).is_some() {
                debug!(alias = %alias, "Duplicate alias, keeping the later entry");
            }
        }

        if reader.remaining() != 0 {
            return Err(Error::MalformedKeystore(format!(
                "{} unexpected bytes after the last entry",
                reader.remaining()
            )));
        }

        Ok(Self { version, entries })
    }

    /// JKS format version (1 or 2)
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the keystore has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry is stored under `alias`
    pub fn contains_alias(&self, alias: &str) -> bool {
        self.entries.contains_key(&normalize_alias(alias))
    }

    /// Look up and decrypt a private key entry
    ///
    /// Returns `Ok(None)` when no private key is stored under `alias`.
    pub fn private_key(&self, alias: &str, password: &str) -> Result<Option<PrivateKeyEntry>> {
        let Some(StoredEntry::PrivateKey(entry)) = self.entries.get(&normalize_alias(alias)) else {
            return Ok(None);
        };

        let pkcs8 = protector::recover(&entry.alias, &entry.protected, password)?;
        PrivateKeyEntry::from_pkcs8(
            entry.alias.clone(),
            entry.created,
            pkcs8,
            entry.cert_chain.clone(),
        )
        .map(Some)
    }

    /// Look up a trusted certificate entry
    pub fn certificate(&self, alias: &str) -> Option<&TrustedCertificateEntry> {
        match self.entries.get(&normalize_alias(alias)) {
            Some(StoredEntry::TrustedCertificate(entry)) => Some(entry),
            _ => None,
        }
    }

    /// All trusted certificate entries, in alias order
    pub fn certificates(&self) -> impl Iterator<Item = &TrustedCertificateEntry> + '_ {
        self.entries.values().filter_map(|entry| match entry {
            StoredEntry::TrustedCertificate(cert) => Some(cert),
            StoredEntry::PrivateKey(_) => None,
        })
    }

    /// Summaries of every entry, in alias order
    pub fn entries(&self) -> impl Iterator<Item = EntrySummary> + '_ {
        self.entries.values().map(|entry| match entry {
            StoredEntry::PrivateKey(key) => EntrySummary {
                alias: key.alias.clone(),
                kind: EntryKind::PrivateKey,
                created: key.created,
                certificates: key.cert_chain.len(),
            },
            StoredEntry::TrustedCertificate(cert) => EntrySummary {
                alias: cert.alias().to_string(),
                kind: EntryKind::TrustedCertificate,
                created: cert.created(),
                certificates: 1,
            },
        })
    }
}

/// SHA-1 over the UTF-16BE password, the JDK salt and the keystore body
pub(crate) fn integrity_digest(password: &str, body: &[u8]) -> sha1::digest::Output<Sha1> {
    Sha1::new()
        .chain_update(&password_bytes(password)[..])
        .chain_update(INTEGRITY_SALT)
        .chain_update(body)
        .finalize()
}

fn normalize_alias(alias: &str) -> String {
    alias.to_lowercase()
}

fn read_entry(reader: &mut Reader<'_>, version: u32) -> Result<(String, StoredEntry)> {
    let tag = reader.read_u32("entry tag")?;
    let alias = reader.read_utf("alias")?;
    let created = read_timestamp(reader, &alias)?;

    let entry = match tag {
        TAG_PRIVATE_KEY => {
            let protected = reader.read_bytes("protected key")?.to_vec();
            let chain_len = reader.read_u32("certificate chain length")?;
            let cert_chain = (0..chain_len)
                .map(|_| read_certificate(reader, version))
                .collect::<Result<Vec<_>>>()?;

            StoredEntry::PrivateKey(ProtectedKeyEntry {
                alias: alias.clone(),
                created,
                protected,
                cert_chain,
            })
        }
        TAG_TRUSTED_CERT => {
            let certificate = read_certificate(reader, version)?;
            StoredEntry::TrustedCertificate(TrustedCertificateEntry::new(
                alias.clone(),
                created,
                certificate,
            ))
        }
        other => {
            return Err(Error::MalformedKeystore(format!(
                "entry '{alias}' has unknown tag {other}"
            )))
        }
    };

    Ok((alias, entry))
}

fn read_timestamp(reader: &mut Reader<'_>, alias: &str) -> Result<DateTime<Utc>> {
    let millis = reader.read_u64("timestamp")?;
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| {
            Error::MalformedKeystore(format!("entry '{alias}' has invalid timestamp {millis}"))
        })
}

fn read_certificate(reader: &mut Reader<'_>, version: u32) -> Result<Certificate> {
    let cert_type = if version == 2 {
        reader.read_utf("certificate type")?
    } else {
        "X.509".to_string()
    };
    let der = reader.read_bytes("certificate")?;
    Ok(Certificate::new(cert_type, der))
}
