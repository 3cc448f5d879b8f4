//! Mutual-TLS bootstrap for mocknifi
//!
//! Turns a JKS keystore and truststore into a rustls server configuration:
//! - Private key and chain recovered from the keystore
//! - Presented certificate taken from the truststore
//! - Client certificates required and verified against the truststore
//! - TLS 1.2 and TLS 1.3, ring provider
//! - Optional export of the encoded PEM files

pub mod acceptor;
pub mod config;
pub mod credentials;
pub mod export;
pub mod loader;

pub use acceptor::TlsAcceptor;
pub use config::TlsSettings;
pub use credentials::ServerCredentials;
pub use export::{write_pem_files, PemFiles};
pub use loader::{parse_certificates, parse_private_key};
