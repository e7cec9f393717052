//! # Cryptographic Primitives
//!
//! Two schemes, two jobs:
//!
//! - **Twisted ElGamal over Ristretto** ([`elgamal`]) for every balance the
//!   chain stores and adds up. Additively homomorphic, so the state machine
//!   can credit and debit without ever decrypting.
//! - **AES-256-GCM** ([`encryption`]) for the owner's cached copy of their
//!   available balance. Fast to open, never verified.
//!
//! Neither is home-grown at the curve or cipher level. Field and group
//! arithmetic comes from `curve25519-dalek`, the cipher from `aes-gcm`.

pub mod elgamal;
pub mod encryption;

pub use elgamal::{
    add_ciphertext, add_scalar, add_with_lo_hi, commit, commit_with, decrypt, encrypt, encrypt_with,
    encrypt_with_rng, sub_ciphertext, sub_scalar, sub_with_lo_hi, Ciphertext, ElGamalError,
    ElGamalKeypair, ElGamalPubkey, ElGamalSecretKey, Opening, PedersenCommitment,
};
pub use encryption::{decrypt_balance, encrypt_balance, AesKey, EncryptionError};
