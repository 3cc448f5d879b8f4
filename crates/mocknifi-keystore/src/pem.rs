//! PEM encoding of keystore entries
//!
//! Blocks are framed with CRLF line endings and the base64 body is wrapped
//! at 64 characters. A private key is followed by its certificate chain in
//! chain order, so one buffer carries the whole server identity.

use crate::entry::{KeyAlgorithm, PrivateKeyEntry, TrustedCertificateEntry};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

/// Label for PKCS#1 RSA keys
pub const RSA_PRIVATE_KEY: &str = "RSA PRIVATE KEY";
/// Label for PKCS#8 keys
pub const PRIVATE_KEY: &str = "PRIVATE KEY";
/// Label for X.509 certificates
pub const CERTIFICATE: &str = "CERTIFICATE";

/// Maximum base64 characters per line
pub const LINE_WIDTH: usize = 64;

const CRLF: &str = "\r\n";

/// Encode `der` as a single PEM block
pub fn encode(label: &str, der: &[u8]) -> String {
    let mut out = String::new();
    encode_into(&mut out, label, der);
    out
}

fn encode_into(out: &mut String, label: &str, der: &[u8]) {
    let body = Zeroizing::new(STANDARD.encode(der));

    out.push_str("-----BEGIN ");
    out.push_str(label);
    out.push_str("-----");
    out.push_str(CRLF);

    // base64 output is ASCII, so byte chunks are char boundaries
    for line in body.as_bytes().chunks(LINE_WIDTH) {
        out.extend(line.iter().map(|&b| char::from(b)));
        out.push_str(CRLF);
    }

    out.push_str("-----END ");
    out.push_str(label);
    out.push_str("-----");
    out.push_str(CRLF);
}

/// Encode a private key followed by its certificate chain
///
/// Returns `None` when no key is configured.
pub fn encode_private_key(entry: Option<&PrivateKeyEntry>) -> Option<Zeroizing<String>> {
    let entry = entry?;

    let mut out = Zeroizing::new(String::new());
    match entry.algorithm() {
        KeyAlgorithm::Rsa => encode_into(&mut out, RSA_PRIVATE_KEY, entry.key_der()),
        KeyAlgorithm::Other(_) => encode_into(&mut out, PRIVATE_KEY, entry.pkcs8_der()),
    }

    for cert in entry.cert_chain() {
        encode_into(&mut out, CERTIFICATE, cert.der());
    }

    tracing::debug!(
        alias = entry.alias(),
        algorithm = %entry.algorithm(),
        chain = entry.cert_chain().len(),
        "Encoded private key"
    );

    Some(out)
}

/// Encode a trusted certificate
///
/// Returns `None` when no certificate is configured.
pub fn encode_certificate(entry: Option<&TrustedCertificateEntry>) -> Option<String> {
    entry.map(|entry| encode(CERTIFICATE, entry.certificate().der()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Certificate;
    use chrono::Utc;
    use proptest::prelude::*;

    fn lines(pem: &str) -> Vec<&str> {
        let mut lines: Vec<&str> = pem.split(CRLF).collect();
        assert_eq!(lines.pop(), Some(""), "output must end with CRLF");
        lines
    }

    #[test]
    fn test_encode_known_vector() {
        let pem = encode("TEST", b"hello");
        assert_eq!(pem, "-----BEGIN TEST-----\r\naGVsbG8=\r\n-----END TEST-----\r\n");
    }

    #[test]
    fn test_encode_empty_payload() {
        assert_eq!(
            encode(CERTIFICATE, &[]),
            "-----BEGIN CERTIFICATE-----\r\n-----END CERTIFICATE-----\r\n"
        );
    }

    #[test]
    fn test_exact_line_multiple() {
        // 48 bytes encode to exactly 64 characters
        let pem = encode("X", &[0xab; 96]);
        let lines = lines(&pem);
        assert_eq!(lines.len(), 4);
        assert!(lines[1..3].iter().all(|l| l.len() == LINE_WIDTH));
    }

    #[test]
    fn test_absent_inputs_produce_nothing() {
        assert!(encode_private_key(None).is_none());
        assert!(encode_certificate(None).is_none());
    }

    #[test]
    fn test_encode_certificate_single_block() {
        let entry = TrustedCertificateEntry::new(
            "cid",
            Utc::now(),
            Certificate::new("X.509", vec![1, 2, 3, 4]),
        );
        let out = encode_certificate(Some(&entry)).unwrap();

        let blocks = pem::parse_many(out.as_bytes()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].tag(), CERTIFICATE);
        assert_eq!(blocks[0].contents(), &[1, 2, 3, 4]);
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            label in "[A-Z]{1,12}( [A-Z]{1,12}){0,2}",
            payload in proptest::collection::vec(any::<u8>(), 1..2048),
        ) {
            let out = encode(&label, &payload);
            let block = pem::parse(out.as_bytes()).unwrap();
            prop_assert_eq!(block.tag(), label.as_str());
            prop_assert_eq!(block.contents(), payload.as_slice());
        }

        #[test]
        fn prop_framing(payload in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let out = encode("DATA", &payload);
            prop_assert!(!out.replace(CRLF, "").contains('\n'));

            let lines = lines(&out);
            prop_assert_eq!(lines[0], "-----BEGIN DATA-----");
            prop_assert_eq!(lines[lines.len() - 1], "-----END DATA-----");

            let body = &lines[1..lines.len() - 1];
            if let Some((last, full)) = body.split_last() {
                prop_assert!(full.iter().all(|l| l.len() == LINE_WIDTH));
                prop_assert!(!last.is_empty() && last.len() <= LINE_WIDTH);
            }

            let decoded = STANDARD.decode(body.concat()).unwrap();
            prop_assert_eq!(decoded, payload);
        }
    }
}
