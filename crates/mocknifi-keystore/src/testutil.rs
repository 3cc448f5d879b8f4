//! Test helpers: a JKS writer and access to the shared fixtures

use crate::keystore::{integrity_digest, JKS_MAGIC, TAG_PRIVATE_KEY, TAG_TRUSTED_CERT};
use crate::protector::protect;

/// DER of a PEM certificate under `tests/fixtures`
pub(crate) fn fixture_cert(name: &str) -> Vec<u8> {
    let path = format!("{}/../../tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read(&path).unwrap();
    pem::parse(text).unwrap().into_contents()
}

/// Builds JKS bytes entry by entry
pub(crate) struct JksBuilder {
    version: u32,
    count: Option<u32>,
    entries: Vec<Vec<u8>>,
    trailing: Vec<u8>,
}

impl JksBuilder {
    pub(crate) fn new() -> Self {
        Self {
            version: 2,
            count: None,
            entries: Vec::new(),
            trailing: Vec::new(),
        }
    }

    pub(crate) fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Override the entry count written in the header
    pub(crate) fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub(crate) fn trailing(mut self, bytes: &[u8]) -> Self {
        self.trailing.extend_from_slice(bytes);
        self
    }

    /// Entry header only: tag, alias and timestamp
    pub(crate) fn raw_entry(mut self, tag: u32, alias: &str, millis: u64) -> Self {
        self.entries.push(entry_header(tag, alias, millis));
        self
    }

    pub(crate) fn trusted_cert(mut self, alias: &str, millis: u64, der: &[u8]) -> Self {
        let mut entry = entry_header(TAG_TRUSTED_CERT, alias, millis);
        self.write_cert(&mut entry, der);
        self.entries.push(entry);
        self
    }

    pub(crate) fn private_key(
        mut self,
        alias: &str,
        millis: u64,
        pkcs8: &[u8],
        key_password: &str,
        chain: &[&[u8]],
    ) -> Self {
        let mut entry = entry_header(TAG_PRIVATE_KEY, alias, millis);
        let protected = protect(pkcs8, key_password, [0x5a; 20]);
        put_bytes(&mut entry, &protected);
        entry.extend_from_slice(&(chain.len() as u32).to_be_bytes());
        for cert in chain {
            self.write_cert(&mut entry, cert);
        }
        self.entries.push(entry);
        self
    }

    fn write_cert(&self, out: &mut Vec<u8>, der: &[u8]) {
        if self.version == 2 {
            put_utf(out, "X.509");
        }
        put_bytes(out, der);
    }

    pub(crate) fn build(self, password: &str) -> Vec<u8> {
        let count = self.count.unwrap_or(self.entries.len() as u32);

        let mut out = Vec::new();
        out.extend_from_slice(&JKS_MAGIC.to_be_bytes());
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        for entry in &self.entries {
            out.extend_from_slice(entry);
        }
        out.extend_from_slice(&self.trailing);

        let digest = integrity_digest(password, &out);
        out.extend_from_slice(&digest);
        out
    }
}

fn entry_header(tag: u32, alias: &str, millis: u64) -> Vec<u8> {
    let mut out = tag.to_be_bytes().to_vec();
    put_utf(&mut out, alias);
    out.extend_from_slice(&millis.to_be_bytes());
    out
}

fn put_utf(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value.as_bytes());
}

fn put_bytes(out: &mut Vec<u8>, value: &[u8]) {
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out.extend_from_slice(value);
}
