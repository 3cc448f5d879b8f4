//! Java keystore support for mocknifi
//!
//! Reads Sun JKS containers (version 1 and 2), verifies their integrity
//! digest, recovers private keys protected with the JDK key protector and
//! re-encodes keys and certificates as PEM.
//!
//! ```no_run
//! use mocknifi_keystore::{pem, KeyStore};
//!
//! # fn main() -> mocknifi_core::Result<()> {
//! let store = KeyStore::load("/ssl/keystore.jks", "changeit")?;
//! let key = store.private_key("cid", "changeit")?;
//! let key_pem = pem::encode_private_key(key.as_ref());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

mod codec;
pub mod entry;
pub mod keystore;
pub mod pem;
mod protector;
#[cfg(test)]
mod testutil;

pub use entry::{Certificate, EntrySummary, KeyAlgorithm, PrivateKeyEntry, TrustedCertificateEntry};
pub use keystore::KeyStore;
