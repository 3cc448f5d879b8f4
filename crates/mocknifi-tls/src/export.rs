//! Writing the encoded PEM material to disk

use crate::credentials::ServerCredentials;
use mocknifi_core::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the exported key and chain
pub const KEY_FILE_NAME: &str = "tls.key";
/// File name of the exported certificate
pub const CERT_FILE_NAME: &str = "tls.crt";

/// Paths of the files written by [`write_pem_files`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemFiles {
    /// Key followed by its chain
    pub key_file: PathBuf,
    /// Trusted certificate, when the truststore had one
    pub cert_file: Option<PathBuf>,
}

/// Write `tls.key` and `tls.crt` into `dir`, creating it if needed
///
/// The key file is readable by the owner only on unix.
pub fn write_pem_files(dir: &Path, credentials: &ServerCredentials) -> Result<PemFiles> {
    fs::create_dir_all(dir).map_err(|e| {
        Error::Config(format!(
            "Failed to create PEM export directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let key_file = dir.join(KEY_FILE_NAME);
    write_private(&key_file, credentials.key_pem().as_bytes())?;

    let cert_file = match credentials.cert_pem() {
        Some(cert_pem) => {
            let path = dir.join(CERT_FILE_NAME);
            fs::write(&path, cert_pem)?;
            Some(path)
        }
        None => None,
    };

    info!(
        dir = %dir.display(),
        cert_written = cert_file.is_some(),
        "PEM files exported"
    );

    Ok(PemFiles {
        key_file,
        cert_file,
    })
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; an existing file keeps its bits
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsSettings;
    use crate::loader::{parse_certificates, parse_private_key};
    use tempfile::TempDir;

    fn fixture_credentials(cert_alias: &str) -> ServerCredentials {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures");
        let settings = TlsSettings {
            keystore_path: fixtures.join("keystore.jks"),
            keystore_password: "changeit".to_string(),
            truststore_path: fixtures.join("truststore.jks"),
            truststore_password: "trustpass".to_string(),
            cert_alias: cert_alias.to_string(),
            ..TlsSettings::default()
        };
        ServerCredentials::load(&settings).unwrap()
    }

    #[test]
    fn test_write_pem_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("pem");
        let credentials = fixture_credentials("cid");

        let files = write_pem_files(&out, &credentials).unwrap();
        assert_eq!(files.key_file, out.join("tls.key"));
        assert_eq!(files.cert_file, Some(out.join("tls.crt")));

        let key = fs::read(&files.key_file).unwrap();
        assert_eq!(key, credentials.key_pem().as_bytes());
        assert!(parse_private_key(&key).is_ok());

        let cert = fs::read(files.cert_file.unwrap()).unwrap();
        assert_eq!(parse_certificates(&cert).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_cert_is_not_written() {
        let dir = TempDir::new().unwrap();
        let files = write_pem_files(dir.path(), &fixture_credentials("absent")).unwrap();

        assert!(files.cert_file.is_none());
        assert!(!dir.path().join(CERT_FILE_NAME).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let files = write_pem_files(dir.path(), &fixture_credentials("cid")).unwrap();
        let mode = fs::metadata(files.key_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_key_file_is_restricted() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let key_file = dir.path().join(KEY_FILE_NAME);
        fs::write(&key_file, "stale").unwrap();
        fs::set_permissions(&key_file, fs::Permissions::from_mode(0o644)).unwrap();

        let credentials = fixture_credentials("cid");
        write_pem_files(dir.path(), &credentials).unwrap();

        let mode = fs::metadata(&key_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(fs::read(&key_file).unwrap(), credentials.key_pem().as_bytes());
    }
}
