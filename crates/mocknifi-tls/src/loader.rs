//! Certificate and key parsing from in-memory PEM

use mocknifi_core::{Error, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};

/// Parse every certificate block in a PEM buffer
///
/// Blocks of other types are skipped, so a key+chain buffer yields its chain.
pub fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = pem;
    certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::TlsConfig(format!("Failed to parse certificates: {e}")))
}

/// Parse the first private key block in a PEM buffer
pub fn parse_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>> {
    let mut reader = pem;
    private_key(&mut reader)
        .map_err(|e| Error::TlsConfig(format!("Failed to parse private key: {e}")))?
        .ok_or_else(|| Error::TlsConfig("No private key found in encoded key".to_string()))
}
