//! Zero-balance proof: `(C, D)` encrypts 0 under `P`.
//!
//! For an encryption of zero `C = r * H = s * D`, so it suffices to show
//! the same `s` links `P` to `H` and `D` to `C`:
//!
//! ```text
//! z * P == c * H + Y_P
//! z * D == c * C + Y_D
//! ```

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::{check, ensure_not_identity, ProofError, ProofKind, Transcript};
use crate::crypto::elgamal::{h, random_scalar, Ciphertext, ElGamalKeypair, ElGamalPubkey};

const DOMAIN: &[u8] = b"shield/zero-balance";
const KIND: ProofKind = ProofKind::ZeroBalance;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZeroBalanceProof {
    y_p: RistrettoPoint,
    y_d: RistrettoPoint,
    z: Scalar,
}

fn challenge(
    pubkey: &ElGamalPubkey,
    ciphertext: &Ciphertext,
    y_p: &RistrettoPoint,
    y_d: &RistrettoPoint,
) -> Scalar {
    let mut t = Transcript::new(DOMAIN);
    t.append_point(b"P", pubkey.point());
    t.append_point(b"C", &ciphertext.commitment);
    t.append_point(b"D", &ciphertext.handle);
    t.append_point(b"Y_P", y_p);
    t.append_point(b"Y_D", y_d);
    t.challenge_scalar(b"c")
}

impl ZeroBalanceProof {
    /// Prove `ciphertext` encrypts zero. The proof will fail to verify if
    /// it does not.
    pub fn new<R: RngCore + CryptoRng>(
        keypair: &ElGamalKeypair,
        ciphertext: &Ciphertext,
        rng: &mut R,
    ) -> Self {
        let s = keypair.secret().as_scalar();
        let nonce = random_scalar(rng);
        let y_p = nonce * keypair.public().point();
        let y_d = nonce * ciphertext.handle;

        let c = challenge(keypair.public(), ciphertext, &y_p, &y_d);
        Self {
            y_p,
            y_d,
            z: c * s + nonce,
        }
    }

    pub fn verify(&self, pubkey: &ElGamalPubkey, ciphertext: &Ciphertext) -> Result<(), ProofError> {
        ensure_not_identity(KIND, pubkey.point())?;
        let c = challenge(pubkey, ciphertext, &self.y_p, &self.y_d);
        check(
            KIND,
            "z*P == c*H + Y_P",
            self.z * pubkey.point() == c * h() + self.y_p,
        )?;
        check(
            KIND,
            "z*D == c*C + Y_D",
            self.z * ciphertext.handle == c * ciphertext.commitment + self.y_d,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::elgamal::{add_scalar, encrypt_with_rng, sub_scalar};
    use rand::{rngs::StdRng, SeedableRng};

    fn setup() -> (StdRng, ElGamalKeypair) {
        let mut rng = StdRng::seed_from_u64(2);
        let kp = ElGamalKeypair::random(&mut rng);
        (rng, kp)
    }

    #[test]
    fn fresh_zero_encryption_verifies() {
        let (mut rng, kp) = setup();
        let (ct, _) = encrypt_with_rng(kp.public(), 0, &mut rng);
        let proof = ZeroBalanceProof::new(&kp, &ct, &mut rng);
        assert!(proof.verify(kp.public(), &ct).is_ok());
    }

    #[test]
    fn canonical_zero_verifies() {
        let (mut rng, kp) = setup();
        let ct = Ciphertext::zero();
        let proof = ZeroBalanceProof::new(&kp, &ct, &mut rng);
        assert!(proof.verify(kp.public(), &ct).is_ok());
    }

    #[test]
    fn homomorphically_derived_zero_verifies() {
        let (mut rng, kp) = setup();
        let (ct, _) = encrypt_with_rng(kp.public(), 40, &mut rng);
        let drained = sub_scalar(&ct, 40);
        let proof = ZeroBalanceProof::new(&kp, &drained, &mut rng);
        assert!(proof.verify(kp.public(), &drained).is_ok());
    }

    #[test]
    fn nonzero_rejected() {
        let (mut rng, kp) = setup();
        let (ct, _) = encrypt_with_rng(kp.public(), 1, &mut rng);
        let proof = ZeroBalanceProof::new(&kp, &ct, &mut rng);
        assert_eq!(
            proof.verify(kp.public(), &ct),
            Err(ProofError::EquationFailed {
                kind: ProofKind::ZeroBalance,
                equation: "z*D == c*C + Y_D",
            })
        );
    }

    #[test]
    fn proof_bound_to_ciphertext() {
        let (mut rng, kp) = setup();
        let ct = Ciphertext::zero();
        let proof = ZeroBalanceProof::new(&kp, &ct, &mut rng);
        let (other, _) = encrypt_with_rng(kp.public(), 0, &mut rng);
        assert!(proof.verify(kp.public(), &other).is_err());
        assert!(proof.verify(kp.public(), &add_scalar(&ct, 1)).is_err());
    }
}
