//! Key localization and HMAC authentication (RFC 3414 Section 6, RFC 7860).

use std::ops::Range;

use digest::Digest;
use digest::core_api::BlockSizeUser;
use hmac::{Mac, SimpleHmac};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AuthProtocol;
use crate::error::{AuthErrorKind, Error, Result};

/// Bytes of repeated password hashed into the master key (RFC 3414 A.2.1).
const EXPANSION_SIZE: usize = 1_048_576;

/// Run `$body` with `$d` bound to the digest type for `$protocol`.
macro_rules! with_digest {
    ($protocol:expr, $d:ident => $body:expr) => {
        match $protocol {
            AuthProtocol::Md5 => {
                type $d = md5::Md5;
                $body
            }
            AuthProtocol::Sha1 => {
                type $d = sha1::Sha1;
                $body
            }
            AuthProtocol::Sha224 => {
                type $d = sha2::Sha224;
                $body
            }
            AuthProtocol::Sha256 => {
                type $d = sha2::Sha256;
                $body
            }
            AuthProtocol::Sha384 => {
                type $d = sha2::Sha384;
                $body
            }
            AuthProtocol::Sha512 => {
                type $d = sha2::Sha512;
                $body
            }
        }
    };
}

/// Hash the concatenation of `parts`.
pub(crate) fn digest(protocol: AuthProtocol, parts: &[&[u8]]) -> Vec<u8> {
    with_digest!(protocol, D => {
        let mut hasher = D::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().to_vec()
    })
}

/// Password to master key (Ku): hash of the password repeated to 1 MiB.
///
/// An empty password yields an all-zero key of digest length.
pub fn password_to_key(protocol: AuthProtocol, password: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return vec![0u8; protocol.digest_len()];
    }
    with_digest!(protocol, D => expand_and_hash::<D>(password))
}

fn expand_and_hash<D: Digest>(password: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    let mut chunk = [0u8; 64];
    let mut index = 0;
    for _ in 0..EXPANSION_SIZE / chunk.len() {
        for byte in chunk.iter_mut() {
            *byte = password[index];
            index = (index + 1) % password.len();
        }
        hasher.update(chunk);
    }
    chunk.zeroize();
    hasher.finalize().to_vec()
}

/// Bind a master key to an engine: `H(Ku || engineID || Ku)`.
pub fn localize_key(protocol: AuthProtocol, master_key: &[u8], engine_id: &[u8]) -> Vec<u8> {
    digest(protocol, &[master_key, engine_id, master_key])
}

fn truncated_hmac<D: Digest + BlockSizeUser>(key: &[u8], data: &[u8], len: usize) -> Vec<u8> {
    let mut mac = <SimpleHmac<D> as Mac>::new_from_slice(key)
        .expect("HMAC accepts keys of any length");
    mac.update(data);
    let full = mac.finalize().into_bytes();
    full[..len].to_vec()
}

/// Localized authentication key for one user at one engine.
///
/// Key material is zeroed when the key is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LocalizedKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: AuthProtocol,
}

impl LocalizedKey {
    /// Derive from a password (RFC 3414 A.2).
    pub fn from_password(protocol: AuthProtocol, password: &[u8], engine_id: &[u8]) -> Self {
        let mut master = password_to_key(protocol, password);
        let key = localize_key(protocol, &master, engine_id);
        master.zeroize();
        Self { key, protocol }
    }

    /// Wrap already-localized key bytes.
    pub fn from_bytes(protocol: AuthProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    pub fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn mac_len(&self) -> usize {
        self.protocol.mac_len()
    }

    /// Truncated HMAC of `data`.
    pub fn mac(&self, data: &[u8]) -> Vec<u8> {
        let len = self.mac_len();
        with_digest!(self.protocol, D => truncated_hmac::<D>(&self.key, data, len))
    }

    /// Fill the zeroed authentication parameters at `range` with the MAC of
    /// the whole message.
    pub fn sign(&self, message: &mut [u8], range: Range<usize>) -> Result<()> {
        if range.len() != self.mac_len() || range.end > message.len() {
            return Err(Error::auth(
                None,
                AuthErrorKind::WrongMacLength {
                    expected: self.mac_len(),
                    actual: range.len(),
                },
            ));
        }
        message[range.clone()].fill(0);
        let mac = self.mac(message);
        message[range].copy_from_slice(&mac);
        Ok(())
    }

    /// Check the MAC found at `range` against the rest of the message.
    pub fn verify(&self, message: &[u8], range: Range<usize>) -> Result<()> {
        if range.len() != self.mac_len() || range.end > message.len() {
            return Err(Error::auth(
                None,
                AuthErrorKind::WrongMacLength {
                    expected: self.mac_len(),
                    actual: range.len(),
                },
            ));
        }
        let mut zeroed = message.to_vec();
        zeroed[range.clone()].fill(0);
        let expected = self.mac(&zeroed);
        if bool::from(expected.ct_eq(&message[range])) {
            Ok(())
        } else {
            Err(Error::auth(None, AuthErrorKind::HmacMismatch))
        }
    }
}

impl std::fmt::Debug for LocalizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizedKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
