//! # AES-256-GCM Balance Cache
//!
//! Every account carries a `decryptable_available_balance`: the plaintext of
//! its available balance sealed under a key only the owner can derive.
//! Decrypting an ElGamal balance means a discrete-log search; opening this
//! cache is one AES call. The chain stores it verbatim and never checks it.
//! A corrupted cache hurts the owner's wallet, nothing else.
//!
//! ## Wire format
//!
//! [`encrypt`] returns `nonce || ciphertext` as a single `Vec<u8>`. The
//! first 12 bytes are the nonce, the rest is the ciphertext + auth tag.
//! [`encrypt_balance`] stores that buffer hex-encoded, because the account
//! field is a string.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH};

/// Errors that can occur during encryption/decryption.
///
/// Kept vague on purpose. "Wrong key" and "corrupted ciphertext" are the
/// same failure to a caller.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    DecryptFailed,

    #[error("ciphertext too short: must be at least {AES_NONCE_LENGTH} bytes")]
    CiphertextTooShort,

    #[error("balance cache is not valid hex")]
    InvalidEncoding(#[from] hex::FromHexError),

    #[error("balance cache does not hold an 8-byte amount")]
    InvalidPlaintext,
}

/// Owner-only AES key for one denomination.
#[derive(Clone)]
pub struct AesKey([u8; AES_KEY_LENGTH]);

impl AesKey {
    pub fn from_bytes(bytes: [u8; AES_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derive the key from an owner seed and the denom, mirroring
    /// [`crate::crypto::elgamal::ElGamalKeypair::from_seed`].
    pub fn from_seed(seed: &[u8], denom: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"shield/aes-key");
        hasher.update((seed.len() as u64).to_le_bytes());
        hasher.update(seed);
        hasher.update(denom.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesKey(..)")
    }
}

/// Encrypt plaintext with AES-256-GCM using a random nonce.
///
/// Returns `nonce || ciphertext`, the ciphertext including the 16-byte tag.
pub fn encrypt(key: &[u8; AES_KEY_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::EncryptFailed)?;

    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EncryptionError::EncryptFailed)?;

    let mut out = Vec::with_capacity(AES_NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt data previously encrypted with [`encrypt`].
pub fn decrypt(key: &[u8; AES_KEY_LENGTH], data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    if data.len() < AES_NONCE_LENGTH {
        return Err(EncryptionError::CiphertextTooShort);
    }

    let (nonce_bytes, ciphertext) = data.split_at(AES_NONCE_LENGTH);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::DecryptFailed)?;
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| EncryptionError::DecryptFailed)
}

/// Seal an available-balance amount into the hex string stored on the
/// account.
pub fn encrypt_balance(key: &AesKey, amount: u64) -> Result<String, EncryptionError> {
    let sealed = encrypt(&key.0, &amount.to_le_bytes())?;
    Ok(hex::encode(sealed))
}

/// Open a cached balance produced by [`encrypt_balance`].
pub fn decrypt_balance(key: &AesKey, cached: &str) -> Result<u64, EncryptionError> {
    let sealed = hex::decode(cached)?;
    let plaintext = decrypt(&key.0, &sealed)?;
    let bytes: [u8; 8] = plaintext
        .as_slice()
        .try_into()
        .map_err(|_| EncryptionError::InvalidPlaintext)?;
    Ok(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AES_TAG_LENGTH;

    fn test_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let plaintext = b"the quick brown fox jumps over the lazy dog";

        let sealed = encrypt(&key, plaintext).unwrap();
        let recovered = decrypt(&key, &sealed).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let key = test_key();
        let sealed = encrypt(&key, b"secret").unwrap();

        let mut wrong_key = test_key();
        wrong_key[0] ^= 0xFF;

        assert!(decrypt(&wrong_key, &sealed).is_err());
    }

    #[test]
    fn test_modified_ciphertext_fails_decryption() {
        let key = test_key();
        let mut sealed = encrypt(&key, b"secret").unwrap();
        sealed[AES_NONCE_LENGTH] ^= 0xFF;

        assert!(decrypt(&key, &sealed).is_err());
    }

    #[test]
    fn test_unique_nonces() {
        let key = test_key();
        let sealed1 = encrypt(&key, b"message").unwrap();
        let sealed2 = encrypt(&key, b"message").unwrap();
        assert_ne!(&sealed1[..AES_NONCE_LENGTH], &sealed2[..AES_NONCE_LENGTH]);
    }

    #[test]
    fn test_decrypt_too_short() {
        let key = test_key();
        assert!(matches!(
            decrypt(&key, &[0u8; 4]),
            Err(EncryptionError::CiphertextTooShort)
        ));
    }

    #[test]
    fn test_balance_roundtrip() {
        let key = AesKey::from_seed(b"owner-seed", "uatom");
        let cached = encrypt_balance(&key, 26_500).unwrap();
        // hex of nonce + 8-byte amount + tag
        assert_eq!(cached.len(), 2 * (AES_NONCE_LENGTH + 8 + AES_TAG_LENGTH));
        assert_eq!(decrypt_balance(&key, &cached).unwrap(), 26_500);
    }

    #[test]
    fn test_balance_key_is_per_denom() {
        let key = AesKey::from_seed(b"owner-seed", "uatom");
        let other = AesKey::from_seed(b"owner-seed", "usei");
        let cached = encrypt_balance(&key, 1).unwrap();
        assert!(decrypt_balance(&other, &cached).is_err());
    }

    #[test]
    fn test_balance_rejects_garbage() {
        let key = AesKey::from_seed(b"owner-seed", "uatom");
        assert!(matches!(
            decrypt_balance(&key, "zz"),
            Err(EncryptionError::InvalidEncoding(_))
        ));
        let wrong_len = hex::encode(encrypt(key.as_bytes(), b"abc").unwrap());
        assert!(matches!(
            decrypt_balance(&key, &wrong_len),
            Err(EncryptionError::InvalidPlaintext)
        ));
    }
}
