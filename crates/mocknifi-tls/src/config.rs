//! TLS bootstrap settings

use mocknifi_core::{Error, Result};
use rustls::SupportedProtocolVersion;
use std::fmt;
use std::path::PathBuf;

/// Default keystore location
pub const DEFAULT_KEYSTORE_PATH: &str = "/ssl/keystore.jks";
/// Default truststore location
pub const DEFAULT_TRUSTSTORE_PATH: &str = "/ssl/truststore.jks";
/// Default alias for both the key and the certificate
pub const DEFAULT_ALIAS: &str = "cid";
/// Default minimum TLS version
pub const DEFAULT_MIN_TLS_VERSION: &str = "1.2";

static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Everything needed to assemble the server's TLS identity
#[derive(Clone, PartialEq, Eq)]
pub struct TlsSettings {
    /// Keystore holding the server key (default `/ssl/keystore.jks`)
    pub keystore_path: PathBuf,

    /// Keystore integrity password (default empty)
    pub keystore_password: String,

    /// Truststore holding the presented and trusted certificates
    /// (default `/ssl/truststore.jks`)
    pub truststore_path: PathBuf,

    /// Truststore integrity password (default empty)
    pub truststore_password: String,

    /// Password protecting the key entry (default empty, meaning the
    /// keystore password is used)
    pub key_password: String,

    /// Alias of the private key entry (default `cid`)
    pub key_alias: String,

    /// Alias of the trusted certificate entry (default `cid`)
    pub cert_alias: String,

    /// Minimum TLS version, 1.2 or 1.3 (default 1.2)
    pub min_tls_version: String,

    /// Also accept clients chaining to the platform roots (default false)
    pub trust_system_roots: bool,

    /// Directory to write the encoded PEM files to (default none)
    pub pem_export_dir: Option<PathBuf>,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            keystore_path: PathBuf::from(DEFAULT_KEYSTORE_PATH),
            keystore_password: String::new(),
            truststore_path: PathBuf::from(DEFAULT_TRUSTSTORE_PATH),
            truststore_password: String::new(),
            key_password: String::new(),
            key_alias: DEFAULT_ALIAS.to_string(),
            cert_alias: DEFAULT_ALIAS.to_string(),
            min_tls_version: DEFAULT_MIN_TLS_VERSION.to_string(),
            trust_system_roots: false,
            pem_export_dir: None,
        }
    }
}

impl TlsSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if !self.keystore_path.exists() {
            return Err(Error::Config(format!(
                "Keystore file not found: {}",
                self.keystore_path.display()
            )));
        }

        if !self.truststore_path.exists() {
            return Err(Error::Config(format!(
                "Truststore file not found: {}",
                self.truststore_path.display()
            )));
        }

        if self.key_alias.trim().is_empty() {
            return Err(Error::Config("key alias cannot be empty".to_string()));
        }

        if self.cert_alias.trim().is_empty() {
            return Err(Error::Config("certificate alias cannot be empty".to_string()));
        }

        match self.min_tls_version.as_str() {
            "1.2" | "1.3" => Ok(()),
            _ => Err(Error::Config(format!(
                "Invalid TLS version: {} (must be 1.2 or 1.3)",
                self.min_tls_version
            ))),
        }
    }

    /// Password used to recover the key entry
    pub fn effective_key_password(&self) -> &str {
        if self.key_password.is_empty() {
            &self.keystore_password
        } else {
            &self.key_password
        }
    }

    /// Protocol versions enabled by the minimum version
    pub fn protocol_versions(&self) -> &'static [&'static SupportedProtocolVersion] {
        match self.min_tls_version.as_str() {
            "1.3" => TLS13_ONLY,
            _ => rustls::ALL_VERSIONS,
        }
    }
}

impl fmt::Debug for TlsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSettings")
            .field("keystore_path", &self.keystore_path)
            .field("keystore_password", &"<redacted>")
            .field("truststore_path", &self.truststore_path)
            .field("truststore_password", &"<redacted>")
            .field("key_password", &"<redacted>")
            .field("key_alias", &self.key_alias)
            .field("cert_alias", &self.cert_alias)
            .field("min_tls_version", &self.min_tls_version)
            .field("trust_system_roots", &self.trust_system_roots)
            .field("pem_export_dir", &self.pem_export_dir)
            .finish()
    }
}
