//! Ciphertext validity: `(C, D)` is `(v*G + r*H, r*P)` for some `v, r`
//! known to the prover.
//!
//! A transfer ciphertext that is not well formed would decrypt to garbage
//! (or not at all) for the recipient, so every transfer ciphertext carries
//! one of these.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::{check, ensure_not_identity, ProofError, ProofKind, Transcript};
use crate::crypto::elgamal::{g, h, random_scalar, Ciphertext, ElGamalPubkey, Opening};

const DOMAIN: &[u8] = b"shield/ciphertext-validity";
const KIND: ProofKind = ProofKind::CiphertextValidity;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextValidityProof {
    y_c: RistrettoPoint,
    y_d: RistrettoPoint,
    z_v: Scalar,
    z_r: Scalar,
}

fn challenge(
    pubkey: &ElGamalPubkey,
    ciphertext: &Ciphertext,
    y_c: &RistrettoPoint,
    y_d: &RistrettoPoint,
) -> Scalar {
    let mut t = Transcript::new(DOMAIN);
    t.append_point(b"P", pubkey.point());
    t.append_point(b"C", &ciphertext.commitment);
    t.append_point(b"D", &ciphertext.handle);
    t.append_point(b"Y_C", y_c);
    t.append_point(b"Y_D", y_d);
    t.challenge_scalar(b"c")
}

impl CiphertextValidityProof {
    /// `ciphertext` must be `encrypt_with(pubkey, amount, opening)`.
    pub fn new<R: RngCore + CryptoRng>(
        pubkey: &ElGamalPubkey,
        ciphertext: &Ciphertext,
        amount: u64,
        opening: &Opening,
        rng: &mut R,
    ) -> Self {
        let v = Scalar::from(amount);
        let r = opening.as_scalar();
        let y_v = random_scalar(rng);
        let y_r = random_scalar(rng);
        let y_c = y_v * g() + y_r * h();
        let y_d = y_r * pubkey.point();

        let c = challenge(pubkey, ciphertext, &y_c, &y_d);
        Self {
            y_c,
            y_d,
            z_v: c * v + y_v,
            z_r: c * r + y_r,
        }
    }

    pub fn verify(&self, pubkey: &ElGamalPubkey, ciphertext: &Ciphertext) -> Result<(), ProofError> {
        ensure_not_identity(KIND, pubkey.point())?;
        let c = challenge(pubkey, ciphertext, &self.y_c, &self.y_d);
        check(
            KIND,
            "z_v*G + z_r*H == c*C + Y_C",
            self.z_v * g() + self.z_r * h() == c * ciphertext.commitment + self.y_c,
        )?;
        check(
            KIND,
            "z_r*P == c*D + Y_D",
            self.z_r * pubkey.point() == c * ciphertext.handle + self.y_d,
        )
    }
}
