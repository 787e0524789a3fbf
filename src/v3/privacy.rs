//! Privacy (encryption) for scoped PDUs (RFC 3414 Section 8, RFC 3826).
//!
//! | Protocol | Mode | privParameters           | IV                              |
//! |----------|------|--------------------------|---------------------------------|
//! | DES      | CBC  | boots(4) \|\| counter(4) | preIV XOR privParameters        |
//! | 3DES     | CBC  | boots(4) \|\| counter(4) | preIV XOR privParameters        |
//! | AES-*    | CFB  | counter(8)               | boots(4) \|\| time(4) \|\| salt |
//!
//! CBC plaintext is zero-padded to the block size. Decrypted CBC output keeps
//! the padding; the scoped PDU decoder ignores bytes after its SEQUENCE.

use std::sync::atomic::{AtomicU64, Ordering};

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{
    AsyncStreamCipher, BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::auth::{digest, localize_key, password_to_key};
use super::{AuthProtocol, KeyExtension, PrivProtocol};
use crate::error::{CryptoErrorKind, Error, Result};

const SALT_LEN: usize = 8;
const DES_BLOCK: usize = 8;

/// `Error::encrypt` or `Error::decrypt`, depending on direction.
type CryptoError = fn(Option<std::net::SocketAddr>, CryptoErrorKind) -> Error;

/// Monotonic salt source shared by every encryption in a session.
///
/// Seeded from the OS random source so that restarted sessions do not
/// reuse IVs under the same key.
#[derive(Debug)]
pub struct SaltCounter(AtomicU64);

impl SaltCounter {
    pub fn new() -> Result<Self> {
        let mut seed = [0u8; 8];
        getrandom::fill(&mut seed)
            .map_err(|_| Error::encrypt(None, CryptoErrorKind::RandomSource))?;
        Ok(Self(AtomicU64::new(u64::from_be_bytes(seed))))
    }

    /// Counter starting at a fixed value.
    pub fn from_value(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Localized privacy key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    protocol: PrivProtocol,
}

impl PrivKey {
    /// Derive from a password, localized with the user's auth digest and
    /// extended when the digest is shorter than the cipher needs.
    pub fn from_password(
        auth: AuthProtocol,
        protocol: PrivProtocol,
        password: &[u8],
        engine_id: &[u8],
    ) -> Self {
        let mut master = password_to_key(auth, password);
        let mut key = localize_key(auth, &master, engine_id);
        master.zeroize();

        let needed = protocol.key_len();
        match protocol.key_extension_for(auth) {
            KeyExtension::None => {}
            KeyExtension::Blumenthal => {
                while key.len() < needed {
                    let more = digest(auth, &[&key]);
                    key.extend_from_slice(&more);
                }
            }
            KeyExtension::Reeder => {
                let mut previous = key.clone();
                while key.len() < needed {
                    let mut ku = password_to_key(auth, &previous);
                    let next = localize_key(auth, &ku, engine_id);
                    ku.zeroize();
                    key.extend_from_slice(&next);
                    previous.zeroize();
                    previous = next;
                }
                previous.zeroize();
            }
        }
        key.truncate(needed);
        Self { key, protocol }
    }

    /// Wrap already-localized key bytes.
    pub fn from_bytes(protocol: PrivProtocol, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            protocol,
        }
    }

    pub fn protocol(&self) -> PrivProtocol {
        self.protocol
    }

    /// Encrypt a serialized scoped PDU. Returns the ciphertext and the
    /// privParameters to carry alongside it.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        salt: &SaltCounter,
    ) -> Result<(Vec<u8>, [u8; SALT_LEN])> {
        let counter = salt.next();
        match self.protocol {
            PrivProtocol::Des | PrivProtocol::Des3 => {
                let mut params = [0u8; SALT_LEN];
                params[..4].copy_from_slice(&engine_boots.to_be_bytes());
                params[4..].copy_from_slice(&(counter as u32).to_be_bytes());
                let (key, iv) = self.cbc_key_and_iv(&params, Error::encrypt)?;

                let mut buf = plaintext.to_vec();
                let padded = buf.len().div_ceil(DES_BLOCK) * DES_BLOCK;
                buf.resize(padded, 0);
                if self.protocol == PrivProtocol::Des {
                    cbc_encrypt::<des::Des>(key, &iv, &mut buf)?;
                } else {
                    cbc_encrypt::<des::TdesEde3>(key, &iv, &mut buf)?;
                }
                Ok((buf, params))
            }
            PrivProtocol::Aes128 | PrivProtocol::Aes192 | PrivProtocol::Aes256 => {
                let params = counter.to_be_bytes();
                let iv = aes_iv(engine_boots, engine_time, &params);
                let key = self.cipher_key(Error::encrypt)?;
                let mut buf = plaintext.to_vec();
                match self.protocol {
                    PrivProtocol::Aes128 => cfb_encrypt::<aes::Aes128>(key, &iv, &mut buf)?,
                    PrivProtocol::Aes192 => cfb_encrypt::<aes::Aes192>(key, &iv, &mut buf)?,
                    _ => cfb_encrypt::<aes::Aes256>(key, &iv, &mut buf)?,
                }
                Ok((buf, params))
            }
        }
    }

    /// Decrypt an encryptedPDU using the privParameters that came with it.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        engine_boots: u32,
        engine_time: u32,
        priv_params: &[u8],
    ) -> Result<Vec<u8>> {
        let params: [u8; SALT_LEN] = priv_params.try_into().map_err(|_| {
            Error::decrypt(
                None,
                CryptoErrorKind::InvalidPrivParamsLength {
                    expected: SALT_LEN,
                    actual: priv_params.len(),
                },
            )
        })?;

        let mut buf = ciphertext.to_vec();
        match self.protocol {
            PrivProtocol::Des | PrivProtocol::Des3 => {
                if buf.len() % DES_BLOCK != 0 {
                    return Err(Error::decrypt(
                        None,
                        CryptoErrorKind::InvalidCiphertextLength {
                            length: buf.len(),
                            block_size: DES_BLOCK,
                        },
                    ));
                }
                let (key, iv) = self.cbc_key_and_iv(&params, Error::decrypt)?;
                if self.protocol == PrivProtocol::Des {
                    cbc_decrypt::<des::Des>(key, &iv, &mut buf)?;
                } else {
                    cbc_decrypt::<des::TdesEde3>(key, &iv, &mut buf)?;
                }
            }
            PrivProtocol::Aes128 | PrivProtocol::Aes192 | PrivProtocol::Aes256 => {
                let iv = aes_iv(engine_boots, engine_time, &params);
                let key = self.cipher_key(Error::decrypt)?;
                match self.protocol {
                    PrivProtocol::Aes128 => cfb_decrypt::<aes::Aes128>(key, &iv, &mut buf)?,
                    PrivProtocol::Aes192 => cfb_decrypt::<aes::Aes192>(key, &iv, &mut buf)?,
                    _ => cfb_decrypt::<aes::Aes256>(key, &iv, &mut buf)?,
                }
            }
        }
        Ok(buf)
    }

    /// Key bytes the cipher itself consumes (without the DES pre-IV).
    fn cipher_key(&self, err: CryptoError) -> Result<&[u8]> {
        let len = match self.protocol {
            PrivProtocol::Des => 8,
            PrivProtocol::Des3 => 24,
            other => other.key_len(),
        };
        self.key
            .get(..len)
            .ok_or_else(|| err(None, CryptoErrorKind::InvalidKeyLength))
    }

    fn cbc_key_and_iv(
        &self,
        params: &[u8; SALT_LEN],
        err: CryptoError,
    ) -> Result<(&[u8], [u8; DES_BLOCK])> {
        let key = self.cipher_key(err)?;
        let pre_iv = self
            .key
            .get(key.len()..key.len() + DES_BLOCK)
            .ok_or_else(|| err(None, CryptoErrorKind::InvalidKeyLength))?;
        let mut iv = [0u8; DES_BLOCK];
        for (i, byte) in iv.iter_mut().enumerate() {
            *byte = pre_iv[i] ^ params[i];
        }
        Ok((key, iv))
    }
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivKey")
            .field("protocol", &self.protocol)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn aes_iv(engine_boots: u32, engine_time: u32, salt: &[u8; SALT_LEN]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..4].copy_from_slice(&engine_boots.to_be_bytes());
    iv[4..8].copy_from_slice(&engine_time.to_be_bytes());
    iv[8..].copy_from_slice(salt);
    iv
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let cipher = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| Error::encrypt(None, CryptoErrorKind::InvalidKeyLength))?;
    let len = buf.len();
    cipher
        .encrypt_padded_mut::<NoPadding>(buf, len)
        .map_err(|_| Error::encrypt(None, CryptoErrorKind::CipherError))?;
    Ok(())
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    let cipher = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| Error::decrypt(None, CryptoErrorKind::InvalidKeyLength))?;
    cipher
        .decrypt_padded_mut::<NoPadding>(buf)
        .map_err(|_| Error::decrypt(None, CryptoErrorKind::CipherError))?;
    Ok(())
}

fn cfb_encrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let cipher = cfb_mode::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| Error::encrypt(None, CryptoErrorKind::InvalidKeyLength))?;
    cipher.encrypt(buf);
    Ok(())
}

fn cfb_decrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let cipher = cfb_mode::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| Error::decrypt(None, CryptoErrorKind::InvalidKeyLength))?;
    cipher.decrypt(buf);
    Ok(())
}
