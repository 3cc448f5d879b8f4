//! TLS acceptor requiring client certificates

use crate::config::TlsSettings;
use crate::credentials::ServerCredentials;
use crate::export::write_pem_files;
use mocknifi_core::{Error, Result};
use rustls::crypto::ring;
use rustls::server::{ServerConfig, WebPkiClientVerifier};
use rustls::{RootCertStore, SupportedProtocolVersion};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsAcceptor as RustlsAcceptor;
use tracing::{info, warn};

/// TLS connection acceptor
#[derive(Clone)]
pub struct TlsAcceptor {
    inner: RustlsAcceptor,
    config: Arc<ServerConfig>,
}

impl TlsAcceptor {
    /// Create a new TLS acceptor from settings
    pub fn new(settings: &TlsSettings) -> Result<Self> {
        settings.validate()?;

        let credentials = ServerCredentials::load(settings)?;

        if let Some(dir) = &settings.pem_export_dir {
            write_pem_files(dir, &credentials)?;
        }

        let acceptor = Self::from_credentials(
            &credentials,
            settings.protocol_versions(),
            settings.trust_system_roots,
        )?;

        info!(
            keystore = %settings.keystore_path.display(),
            truststore = %settings.truststore_path.display(),
            min_tls = %settings.min_tls_version,
            "TLS acceptor initialized"
        );

        Ok(acceptor)
    }

    /// Build an acceptor from already loaded credentials
    pub fn from_credentials(
        credentials: &ServerCredentials,
        versions: &[&'static SupportedProtocolVersion],
        trust_system_roots: bool,
    ) -> Result<Self> {
        let provider = Arc::new(ring::default_provider());

        let roots = client_root_store(credentials, trust_system_roots)?;
        let verifier =
            WebPkiClientVerifier::builder_with_provider(Arc::new(roots), Arc::clone(&provider))
                .build()
                .map_err(|e| Error::TlsConfig(format!("Failed to build client verifier: {}", e)))?;

        let mut server_config = ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(versions)
            .map_err(|e| Error::TlsConfig(format!("Unsupported protocol versions: {}", e)))?
            .with_client_cert_verifier(verifier)
            .with_single_cert(credentials.certificate_chain()?, credentials.private_key()?)
            .map_err(|e| Error::TlsConfig(format!("Failed to build TLS config: {}", e)))?;

        server_config.alpn_protocols = vec![b"http/1.1".to_vec()];

        let config = Arc::new(server_config);
        Ok(Self {
            inner: RustlsAcceptor::from(Arc::clone(&config)),
            config,
        })
    }

    /// The assembled server configuration
    pub fn server_config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.config)
    }

    /// Accept a TLS connection
    pub async fn accept<IO>(&self, stream: IO) -> Result<tokio_rustls::server::TlsStream<IO>>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        self.inner
            .accept(stream)
            .await
            .map_err(|e| Error::Handshake(e.to_string()))
    }
}

impl std::fmt::Debug for TlsAcceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsAcceptor")
            .field("alpn_protocols", &self.config.alpn_protocols)
            .finish_non_exhaustive()
    }
}

fn client_root_store(
    credentials: &ServerCredentials,
    trust_system_roots: bool,
) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();

    let (added, ignored) = roots.add_parsable_certificates(credentials.client_roots().to_vec());
    if ignored > 0 {
        warn!(ignored, "Skipped truststore certificates that are not valid trust anchors");
    }

    if trust_system_roots {
        let native = rustls_native_certs::load_native_certs();
        for e in &native.errors {
            warn!(error = %e, "Failed to load a platform certificate");
        }
        let (native_added, _) = roots.add_parsable_certificates(native.certs);
        info!(count = native_added, "Platform trust roots added");
    }

    if roots.is_empty() {
        return Err(Error::TlsConfig(
            "No trusted certificates available to verify clients".to_string(),
        ));
    }

    info!(truststore_roots = added, total = roots.len(), "Client trust roots ready");
    Ok(roots)
}
