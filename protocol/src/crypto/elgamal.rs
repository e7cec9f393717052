//! # Twisted ElGamal over Ristretto
//!
//! The additively homomorphic encryption every confidential balance is
//! stored under. A ciphertext of `v` under public key `P` with randomness
//! `r` is the pair
//!
//! ```text
//! C = v * G + r * H      (Pedersen commitment, independent of the key)
//! D = r * P              (decryption handle)
//! ```
//!
//! where `G` is the Ristretto basepoint, `H` is a nothing-up-my-sleeve
//! generator and `P = s^-1 * H` for secret `s`. The owner recovers
//! `v * G = C - s * D` and then solves a small discrete log, which is why
//! every amount the chain stores is kept to 16 or 32 bits (see
//! [`crate::codec`]).
//!
//! Splitting the ciphertext this way means `C` is a plain Pedersen
//! commitment. Range proofs are therefore written against `C` directly,
//! and the sigma proofs in [`crate::zkp`] only ever touch the handle to
//! link a commitment to a key.
//!
//! ## Immutability
//!
//! [`Ciphertext`] is a value type. Every homomorphic operation in this
//! module returns a fresh ciphertext and leaves its inputs untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT, ristretto::RistrettoPoint, scalar::Scalar,
    traits::Identity,
};
use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use thiserror::Error;

use crate::config::{LO_BITS, MAX_DECRYPT_BITS};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElGamalError {
    /// `max_bits` was zero or wider than [`MAX_DECRYPT_BITS`].
    #[error("decryption width must be within 1..={MAX_DECRYPT_BITS} bits, got {0}")]
    InvalidBitWidth(u32),

    /// The plaintext is not within the searched range (or the key is wrong).
    #[error("ciphertext does not decrypt to a value below 2^{0}")]
    DecryptionFailed(u32),

    /// A derived secret scalar was zero and has no inverse.
    #[error("derived secret key is zero")]
    ZeroSecret,
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Value generator `G`.
pub fn g() -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT
}

/// Blinding generator `H = hash_to_point(SHA-512(G))`. Nobody knows
/// `log_G(H)`.
pub fn h() -> RistrettoPoint {
    static H: OnceLock<RistrettoPoint> = OnceLock::new();
    *H.get_or_init(|| {
        let digest = Sha512::digest(RISTRETTO_BASEPOINT_POINT.compress().as_bytes());
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&digest);
        RistrettoPoint::from_uniform_bytes(&wide)
    })
}

/// Uniformly random scalar from 64 bytes of CSPRNG output.
pub(crate) fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// `2^16`, the weight of a `hi` part.
fn hi_weight() -> Scalar {
    Scalar::from(1u64 << LO_BITS)
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Secret decryption key `s`.
#[derive(Clone)]
pub struct ElGamalSecretKey(Scalar);

impl ElGamalSecretKey {
    pub(crate) fn as_scalar(&self) -> &Scalar {
        &self.0
    }

    /// Decrypt `ciphertext`, searching plaintexts below `2^max_bits`.
    pub fn decrypt(&self, ciphertext: &Ciphertext, max_bits: u32) -> Result<u64, ElGamalError> {
        decrypt(self, ciphertext, max_bits)
    }
}

impl fmt::Debug for ElGamalSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ElGamalSecretKey(..)")
    }
}

/// Public encryption key `P = s^-1 * H`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElGamalPubkey(RistrettoPoint);

impl ElGamalPubkey {
    pub fn point(&self) -> &RistrettoPoint {
        &self.0
    }

    pub fn from_point(point: RistrettoPoint) -> Self {
        Self(point)
    }

    /// Compressed 32-byte encoding.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }
}

/// A secret key together with its public key.
#[derive(Clone, Debug)]
pub struct ElGamalKeypair {
    public: ElGamalPubkey,
    secret: ElGamalSecretKey,
}

impl ElGamalKeypair {
    /// Fresh random keypair.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            if let Ok(keypair) = Self::from_scalar(random_scalar(rng)) {
                return keypair;
            }
        }
    }

    /// Deterministic keypair for one denomination, derived from an owner
    /// seed (typically a signature over the denom by the account key).
    pub fn from_seed(seed: &[u8], denom: &str) -> Result<Self, ElGamalError> {
        let mut hasher = Sha512::new();
        hasher.update(b"shield/elgamal-key");
        hasher.update((seed.len() as u64).to_le_bytes());
        hasher.update(seed);
        hasher.update(denom.as_bytes());
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&hasher.finalize());
        Self::from_scalar(Scalar::from_bytes_mod_order_wide(&wide))
    }

    fn from_scalar(s: Scalar) -> Result<Self, ElGamalError> {
        if s == Scalar::ZERO {
            return Err(ElGamalError::ZeroSecret);
        }
        let public = ElGamalPubkey(s.invert() * h());
        Ok(Self {
            public,
            secret: ElGamalSecretKey(s),
        })
    }

    pub fn public(&self) -> &ElGamalPubkey {
        &self.public
    }

    pub fn secret(&self) -> &ElGamalSecretKey {
        &self.secret
    }
}

// ---------------------------------------------------------------------------
// Openings & Commitments
// ---------------------------------------------------------------------------

/// Encryption or commitment randomness `r`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opening(Scalar);

impl Opening {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(random_scalar(rng))
    }

    pub fn zero() -> Self {
        Self(Scalar::ZERO)
    }

    pub(crate) fn from_scalar(s: Scalar) -> Self {
        Self(s)
    }

    pub(crate) fn as_scalar(&self) -> &Scalar {
        &self.0
    }
}

/// Pedersen commitment `C = v * G + r * H`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedersenCommitment(RistrettoPoint);

impl PedersenCommitment {
    pub fn point(&self) -> &RistrettoPoint {
        &self.0
    }

    pub fn from_point(point: RistrettoPoint) -> Self {
        Self(point)
    }
}

/// Commit to `amount` under the given opening.
pub fn commit_with(amount: u64, opening: &Opening) -> PedersenCommitment {
    PedersenCommitment(Scalar::from(amount) * g() + opening.0 * h())
}

/// Commit to `amount` under fresh randomness.
pub fn commit<R: RngCore + CryptoRng>(amount: u64, rng: &mut R) -> (PedersenCommitment, Opening) {
    let opening = Opening::random(rng);
    (commit_with(amount, &opening), opening)
}

// ---------------------------------------------------------------------------
// Ciphertext
// ---------------------------------------------------------------------------

/// Twisted ElGamal ciphertext `(C, D)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    pub commitment: RistrettoPoint,
    pub handle: RistrettoPoint,
}

impl Ciphertext {
    /// The canonical encryption of zero, `(O, O)`. Decrypts to 0 under
    /// every key.
    pub fn zero() -> Self {
        Self {
            commitment: RistrettoPoint::identity(),
            handle: RistrettoPoint::identity(),
        }
    }

    /// The commitment half, usable wherever a Pedersen commitment is.
    pub fn pedersen(&self) -> PedersenCommitment {
        PedersenCommitment(self.commitment)
    }

    fn scale(&self, k: &Scalar) -> Self {
        Self {
            commitment: k * self.commitment,
            handle: k * self.handle,
        }
    }
}

impl Default for Ciphertext {
    fn default() -> Self {
        Self::zero()
    }
}

// ---------------------------------------------------------------------------
// Encryption / Decryption
// ---------------------------------------------------------------------------

/// Encrypt `amount` under `pubkey` with a caller-chosen opening.
pub fn encrypt_with(pubkey: &ElGamalPubkey, amount: u64, opening: &Opening) -> Ciphertext {
    Ciphertext {
        commitment: commit_with(amount, opening).0,
        handle: opening.0 * pubkey.0,
    }
}

/// Encrypt `amount` under `pubkey` with randomness drawn from `rng`.
pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
    pubkey: &ElGamalPubkey,
    amount: u64,
    rng: &mut R,
) -> (Ciphertext, Opening) {
    let opening = Opening::random(rng);
    (encrypt_with(pubkey, amount, &opening), opening)
}

/// Encrypt `amount` under `pubkey` with OS randomness.
pub fn encrypt(pubkey: &ElGamalPubkey, amount: u64) -> (Ciphertext, Opening) {
    encrypt_with_rng(pubkey, amount, &mut OsRng)
}

/// Decrypt a ciphertext whose plaintext is known to be below `2^max_bits`.
///
/// Baby-step giant-step over `v * G` with `2^ceil(max_bits / 2)` table
/// entries. Deterministic, but only meant for clients: validators never
/// decrypt.
pub fn decrypt(
    secret: &ElGamalSecretKey,
    ciphertext: &Ciphertext,
    max_bits: u32,
) -> Result<u64, ElGamalError> {
    if max_bits == 0 || max_bits > MAX_DECRYPT_BITS {
        return Err(ElGamalError::InvalidBitWidth(max_bits));
    }
    let target = ciphertext.commitment - secret.0 * ciphertext.handle;

    let m: u64 = 1 << max_bits.div_ceil(2);
    let mut baby_steps = HashMap::with_capacity(m as usize);
    let mut point = RistrettoPoint::identity();
    for j in 0..m {
        baby_steps.insert(point.compress().to_bytes(), j);
        point += RISTRETTO_BASEPOINT_POINT;
    }

    let giant_step = Scalar::from(m) * RISTRETTO_BASEPOINT_POINT;
    let mut current = target;
    for i in 0..m {
        if let Some(j) = baby_steps.get(&current.compress().to_bytes()) {
            let value = i * m + j;
            if value < (1u64 << max_bits) {
                return Ok(value);
            }
        }
        current -= giant_step;
    }
    Err(ElGamalError::DecryptionFailed(max_bits))
}

// ---------------------------------------------------------------------------
// Homomorphic Operations
// ---------------------------------------------------------------------------

/// `Enc(a) + Enc(b) = Enc(a + b)`. Both must be under the same key.
pub fn add_ciphertext(a: &Ciphertext, b: &Ciphertext) -> Ciphertext {
    Ciphertext {
        commitment: a.commitment + b.commitment,
        handle: a.handle + b.handle,
    }
}

/// `Enc(a) - Enc(b) = Enc(a - b)`.
pub fn sub_ciphertext(a: &Ciphertext, b: &Ciphertext) -> Ciphertext {
    Ciphertext {
        commitment: a.commitment - b.commitment,
        handle: a.handle - b.handle,
    }
}

/// Add a public amount. The handle is unchanged.
pub fn add_scalar(ciphertext: &Ciphertext, amount: u64) -> Ciphertext {
    Ciphertext {
        commitment: ciphertext.commitment + Scalar::from(amount) * g(),
        handle: ciphertext.handle,
    }
}

/// Subtract a public amount. The handle is unchanged.
pub fn sub_scalar(ciphertext: &Ciphertext, amount: u64) -> Ciphertext {
    Ciphertext {
        commitment: ciphertext.commitment - Scalar::from(amount) * g(),
        handle: ciphertext.handle,
    }
}

/// `base + lo + hi * 2^16`.
pub fn add_with_lo_hi(base: &Ciphertext, lo: &Ciphertext, hi: &Ciphertext) -> Ciphertext {
    add_ciphertext(&add_ciphertext(base, lo), &hi.scale(&hi_weight()))
}

/// `base - lo - hi * 2^16`.
pub fn sub_with_lo_hi(base: &Ciphertext, lo: &Ciphertext, hi: &Ciphertext) -> Ciphertext {
    sub_ciphertext(&sub_ciphertext(base, lo), &hi.scale(&hi_weight()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn setup() -> (StdRng, ElGamalKeypair) {
        let mut rng = StdRng::seed_from_u64(7);
        let keypair = ElGamalKeypair::random(&mut rng);
        (rng, keypair)
    }

    #[test]
    fn encrypt_then_decrypt() {
        let (mut rng, kp) = setup();
        let (ct, _) = encrypt_with_rng(kp.public(), 4_242, &mut rng);
        assert_eq!(kp.secret().decrypt(&ct, 16).unwrap(), 4_242);
    }

    #[test]
    fn decrypt_odd_bit_width() {
        let (mut rng, kp) = setup();
        let (ct, _) = encrypt_with_rng(kp.public(), 100, &mut rng);
        assert_eq!(decrypt(kp.secret(), &ct, 7).unwrap(), 100);
        // 128 is out of range for 7 bits.
        let (ct, _) = encrypt_with_rng(kp.public(), 128, &mut rng);
        assert_eq!(
            decrypt(kp.secret(), &ct, 7),
            Err(ElGamalError::DecryptionFailed(7))
        );
    }

    #[test]
    fn decrypt_rejects_bad_width() {
        let (_, kp) = setup();
        let ct = Ciphertext::zero();
        assert_eq!(
            decrypt(kp.secret(), &ct, 0),
            Err(ElGamalError::InvalidBitWidth(0))
        );
        assert_eq!(
            decrypt(kp.secret(), &ct, 49),
            Err(ElGamalError::InvalidBitWidth(49))
        );
    }

    #[test]
    fn wrong_key_does_not_decrypt() {
        let (mut rng, kp) = setup();
        let other = ElGamalKeypair::random(&mut rng);
        let (ct, _) = encrypt_with_rng(kp.public(), 55, &mut rng);
        assert!(other.secret().decrypt(&ct, 12).is_err());
    }

    #[test]
    fn zero_ciphertext_decrypts_to_zero() {
        let (_, kp) = setup();
        assert_eq!(kp.secret().decrypt(&Ciphertext::zero(), 8).unwrap(), 0);
    }

    #[test]
    fn homomorphic_add_and_sub() {
        let (mut rng, kp) = setup();
        let (a, _) = encrypt_with_rng(kp.public(), 900, &mut rng);
        let (b, _) = encrypt_with_rng(kp.public(), 100, &mut rng);

        let sum = add_ciphertext(&a, &b);
        let diff = sub_ciphertext(&a, &b);
        assert_eq!(kp.secret().decrypt(&sum, 16).unwrap(), 1_000);
        assert_eq!(kp.secret().decrypt(&diff, 16).unwrap(), 800);

        // Inputs are untouched.
        assert_eq!(kp.secret().decrypt(&a, 16).unwrap(), 900);
    }

    #[test]
    fn scalar_ops_keep_handle() {
        let (mut rng, kp) = setup();
        let (ct, _) = encrypt_with_rng(kp.public(), 10, &mut rng);
        let up = add_scalar(&ct, 5);
        let down = sub_scalar(&up, 12);
        assert_eq!(up.handle, ct.handle);
        assert_eq!(kp.secret().decrypt(&down, 8).unwrap(), 3);
    }

    #[test]
    fn lo_hi_combination() {
        let (mut rng, kp) = setup();
        let base = add_scalar(&Ciphertext::zero(), 1 << 20);
        let (lo, _) = encrypt_with_rng(kp.public(), 7, &mut rng);
        let (hi, _) = encrypt_with_rng(kp.public(), 3, &mut rng);

        let up = add_with_lo_hi(&base, &lo, &hi);
        assert_eq!(kp.secret().decrypt(&up, 24).unwrap(), (1 << 20) + 7 + 3 * 65_536);

        let back = sub_with_lo_hi(&up, &lo, &hi);
        assert_eq!(back, base);
    }

    #[test]
    fn seeded_keys_are_per_denom() {
        let a = ElGamalKeypair::from_seed(b"owner", "uatom").unwrap();
        let b = ElGamalKeypair::from_seed(b"owner", "uatom").unwrap();
        let c = ElGamalKeypair::from_seed(b"owner", "usei").unwrap();
        assert_eq!(a.public(), b.public());
        assert_ne!(a.public(), c.public());
    }

    #[test]
    fn commitment_half_is_pedersen() {
        let (mut rng, kp) = setup();
        let (ct, opening) = encrypt_with_rng(kp.public(), 31, &mut rng);
        assert_eq!(ct.pedersen(), commit_with(31, &opening));
    }

    #[test]
    fn ciphertext_serde_roundtrip() {
        let (mut rng, kp) = setup();
        let (ct, _) = encrypt_with_rng(kp.public(), 1, &mut rng);
        let bytes = bincode::serialize(&ct).unwrap();
        let restored: Ciphertext = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored, ct);
    }
}
