//! Public-key validity: the prover knows `s` with `s * P = H`.
//!
//! Without it a client could register an arbitrary point as its key, and
//! a zero-balance proof under that key would mean nothing.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::{check, ensure_not_identity, ProofError, ProofKind, Transcript};
use crate::crypto::elgamal::{h, random_scalar, ElGamalKeypair, ElGamalPubkey};

const DOMAIN: &[u8] = b"shield/pubkey-validity";
const KIND: ProofKind = ProofKind::PubkeyValidity;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubkeyValidityProof {
    y: RistrettoPoint,
    z: Scalar,
}

fn transcript(pubkey: &ElGamalPubkey, y: &RistrettoPoint) -> Transcript {
    let mut t = Transcript::new(DOMAIN);
    t.append_point(b"P", pubkey.point());
    t.append_point(b"Y", y);
    t
}

impl PubkeyValidityProof {
    pub fn new<R: RngCore + CryptoRng>(keypair: &ElGamalKeypair, rng: &mut R) -> Self {
        let s = keypair.secret().as_scalar();
        let nonce = random_scalar(rng);
        let y = nonce * keypair.public().point();

        let c = transcript(keypair.public(), &y).challenge_scalar(b"c");
        Self { y, z: c * s + nonce }
    }

    pub fn verify(&self, pubkey: &ElGamalPubkey) -> Result<(), ProofError> {
        ensure_not_identity(KIND, pubkey.point())?;
        let c = transcript(pubkey, &self.y).challenge_scalar(b"c");
        check(
            KIND,
            "z*P == c*H + Y",
            self.z * pubkey.point() == c * h() + self.y,
        )
    }
}
