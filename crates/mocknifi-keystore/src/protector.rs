//! JDK proprietary key protection
//!
//! Private keys in a JKS store are wrapped in an `EncryptedPrivateKeyInfo`
//! whose algorithm is `1.3.6.1.4.1.42.2.17.1.1`. The encrypted data is
//! `salt || ciphertext || check`: the ciphertext is XOR'd with a SHA-1 chain
//! seeded by the salt, and `check` is SHA-1 over the password and plaintext.

use der::asn1::{ObjectIdentifier, OctetStringRef};
use der::{Decode, Sequence};
use mocknifi_core::{Error, Result};
use sha1::{Digest, Sha1};
use spki::AlgorithmIdentifierRef;
use zeroize::Zeroizing;

/// OID of the JDK key protector
pub(crate) const KEY_PROTECTOR_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.42.2.17.1.1");

const SALT_LEN: usize = 20;
const DIGEST_LEN: usize = 20;

#[derive(Sequence)]
struct EncryptedKeyInfo<'a> {
    algorithm: AlgorithmIdentifierRef<'a>,
    encrypted_data: OctetStringRef<'a>,
}

/// Java `char[]` passwords are hashed as UTF-16BE
pub(crate) fn password_bytes(password: &str) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(
        password
            .encode_utf16()
            .flat_map(u16::to_be_bytes)
            .collect(),
    )
}

/// Recover the PKCS#8 document protected under `password`
pub(crate) fn recover(alias: &str, protected: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
    let info = EncryptedKeyInfo::from_der(protected).map_err(|e| {
        Error::MalformedKeystore(format!("key entry '{alias}' is not EncryptedPrivateKeyInfo: {e}"))
    })?;

    if info.algorithm.oid != KEY_PROTECTOR_OID {
        return Err(Error::UnsupportedAlgorithm(format!(
            "key entry '{alias}' is protected with {}",
            info.algorithm.oid
        )));
    }

    let data = info.encrypted_data.as_bytes();
    if data.len() < SALT_LEN + DIGEST_LEN {
        return Err(Error::MalformedKeystore(format!(
            "key entry '{alias}' is too short ({} bytes)",
            data.len()
        )));
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (ciphertext, check) = rest.split_at(rest.len() - DIGEST_LEN);

    let password = password_bytes(password);
    let mut plaintext = Zeroizing::new(ciphertext.to_vec());
    apply_keystream(&password, salt, &mut plaintext);

    let digest = Sha1::new()
        .chain_update(&password[..])
        .chain_update(&plaintext[..])
        .finalize();
    if digest.as_slice() != check {
        return Err(Error::KeyDecrypt {
            alias: alias.to_string(),
        });
    }

    Ok(plaintext)
}

fn apply_keystream(password: &[u8], salt: &[u8], data: &mut [u8]) {
    let mut previous = [0u8; DIGEST_LEN];
    previous.copy_from_slice(salt);

    for chunk in data.chunks_mut(DIGEST_LEN) {
        let block = Sha1::new()
            .chain_update(password)
            .chain_update(previous)
            .finalize();
        for (byte, key) in chunk.iter_mut().zip(block.iter()) {
            *byte ^= key;
        }
        previous.copy_from_slice(&block);
    }
}

/// Inverse of [`recover`], for building fixtures
#[cfg(test)]
pub(crate) fn protect(pkcs8: &[u8], password: &str, salt: [u8; SALT_LEN]) -> Vec<u8> {
    use der::asn1::AnyRef;
    use der::Encode;

    let password = password_bytes(password);
    let mut ciphertext = pkcs8.to_vec();
    apply_keystream(&password, &salt, &mut ciphertext);
    let check = Sha1::new()
        .chain_update(&password[..])
        .chain_update(pkcs8)
        .finalize();

    let mut data = salt.to_vec();
    data.extend_from_slice(&ciphertext);
    data.extend_from_slice(&check);

    EncryptedKeyInfo {
        algorithm: AlgorithmIdentifierRef {
            oid: KEY_PROTECTOR_OID,
            parameters: Some(AnyRef::NULL),
        },
        encrypted_data: OctetStringRef::new(&data).unwrap(),
    }
    .to_der()
    .unwrap()
}
