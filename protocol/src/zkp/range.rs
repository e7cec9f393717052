//! Range proof: a Pedersen commitment `C = v*G + r*H` opens to some
//! `v` in `[0, 2^n)`, for `n` up to 64.
//!
//! The prover commits to each bit, `C_i = b_i*G + r_i*H`, choosing the
//! blindings so that `sum(2^i * C_i) == C`. For every bit it then gives a
//! Cramer-Damgard-Schoenmakers OR proof that it knows `log_H` of either
//! `C_i` (bit 0) or `C_i - G` (bit 1).
//!
//! Proof size and verification cost are linear in `n`. That is fine for
//! the 16/32/64-bit widths the module uses and keeps the construction
//! small enough to audit.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::{check, ProofError, ProofKind, Transcript};
use crate::crypto::elgamal::{commit_with, g, h, random_scalar, Opening, PedersenCommitment};

const DOMAIN: &[u8] = b"shield/range-proof";
const KIND: ProofKind = ProofKind::Range;
const MAX_BITS: usize = 64;

/// One bit commitment plus its OR proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct BitProof {
    commitment: RistrettoPoint,
    c0: Scalar,
    c1: Scalar,
    z0: Scalar,
    z1: Scalar,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeProof {
    bits: Vec<BitProof>,
}

fn check_width(bits: usize) -> Result<(), ProofError> {
    if bits == 0 || bits > MAX_BITS {
        return Err(ProofError::UnsupportedBitLength(bits));
    }
    Ok(())
}

fn start_transcript(bits: usize, commitment: &PedersenCommitment) -> Transcript {
    let mut t = Transcript::new(DOMAIN);
    t.append_u64(b"n", bits as u64);
    t.append_point(b"C", commitment.point());
    t
}

impl RangeProof {
    /// Prove that `commit_with(amount, opening)` lies in `[0, 2^bits)`.
    pub fn new<R: RngCore + CryptoRng>(
        amount: u64,
        opening: &Opening,
        bits: usize,
        rng: &mut R,
    ) -> Result<Self, ProofError> {
        check_width(bits)?;
        if bits < MAX_BITS && amount >> bits != 0 {
            return Err(ProofError::AmountOutOfRange { amount, bits });
        }

        // Blindings with sum(2^i * r_i) == r.
        let mut blindings = Vec::with_capacity(bits);
        let mut weighted = Scalar::ZERO;
        let mut weight = Scalar::ONE;
        for _ in 0..bits - 1 {
            let r_i = random_scalar(rng);
            weighted += weight * r_i;
            blindings.push(r_i);
            weight += weight;
        }
        blindings.push((opening.as_scalar() - weighted) * weight.invert());

        let commitment = commit_with(amount, opening);
        let mut transcript = start_transcript(bits, &commitment);
        let (g, h) = (g(), h());

        let mut proofs = Vec::with_capacity(bits);
        for (i, r_i) in blindings.iter().enumerate() {
            let bit = (amount >> i) & 1 == 1;
            let c_i = if bit { g + r_i * h } else { r_i * h };
            let x = [c_i, c_i - g];

            let k = random_scalar(rng);
            let c_sim = random_scalar(rng);
            let z_sim = random_scalar(rng);
            let (real, sim) = if bit { (1, 0) } else { (0, 1) };
            let mut a = [RistrettoPoint::default(); 2];
            a[real] = k * h;
            a[sim] = z_sim * h - c_sim * x[sim];

            transcript.append_point(b"C_i", &c_i);
            transcript.append_point(b"A0", &a[0]);
            transcript.append_point(b"A1", &a[1]);
            let challenge = transcript.challenge_scalar(b"bit");

            let c_real = challenge - c_sim;
            let z_real = k + c_real * r_i;
            let (c0, c1, z0, z1) = if bit {
                (c_sim, c_real, z_sim, z_real)
            } else {
                (c_real, c_sim, z_real, z_sim)
            };
            proofs.push(BitProof {
                commitment: c_i,
                c0,
                c1,
                z0,
                z1,
            });
        }

        Ok(Self { bits: proofs })
    }

    /// Number of bits the proof covers.
    pub fn bit_length(&self) -> usize {
        self.bits.len()
    }

    /// Verify that `commitment` opens to a value below `2^bits`.
    pub fn verify(&self, commitment: &PedersenCommitment, bits: usize) -> Result<(), ProofError> {
        check_width(bits)?;
        if self.bits.len() != bits {
            return Err(ProofError::BitLengthMismatch {
                expected: bits,
                actual: self.bits.len(),
            });
        }

        let mut sum = RistrettoPoint::default();
        let mut weight = Scalar::ONE;
        for bit in &self.bits {
            sum += weight * bit.commitment;
            weight += weight;
        }
        check(KIND, "sum(2^i * C_i) == C", sum == *commitment.point())?;

        let mut transcript = start_transcript(bits, commitment);
        let (g, h) = (g(), h());
        for bit in &self.bits {
            let a0 = bit.z0 * h - bit.c0 * bit.commitment;
            let a1 = bit.z1 * h - bit.c1 * (bit.commitment - g);
            transcript.append_point(b"C_i", &bit.commitment);
            transcript.append_point(b"A0", &a0);
            transcript.append_point(b"A1", &a1);
            let challenge = transcript.challenge_scalar(b"bit");
            check(KIND, "c0 + c1 == c", bit.c0 + bit.c1 == challenge)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::elgamal::{commit, encrypt_with_rng, ElGamalKeypair};
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(6)
    }

    #[test]
    fn proves_values_in_range() {
        let mut rng = rng();
        for (amount, bits) in [(0u64, 16usize), (1_500, 16), (65_535, 16), (1 << 31, 32)] {
            let (commitment, opening) = commit(amount, &mut rng);
            let proof = RangeProof::new(amount, &opening, bits, &mut rng).unwrap();
            assert_eq!(proof.bit_length(), bits);
            assert!(proof.verify(&commitment, bits).is_ok(), "{amount} in {bits} bits");
        }
    }

    #[test]
    fn full_width_proof() {
        let mut rng = rng();
        let (commitment, opening) = commit(u64::MAX, &mut rng);
        let proof = RangeProof::new(u64::MAX, &opening, 64, &mut rng).unwrap();
        assert!(proof.verify(&commitment, 64).is_ok());
    }

    #[test]
    fn prover_refuses_out_of_range() {
        let mut rng = rng();
        let opening = Opening::random(&mut rng);
        assert_eq!(
            RangeProof::new(65_536, &opening, 16, &mut rng),
            Err(ProofError::AmountOutOfRange {
                amount: 65_536,
                bits: 16
            })
        );
        assert_eq!(
            RangeProof::new(1, &opening, 0, &mut rng),
            Err(ProofError::UnsupportedBitLength(0))
        );
        assert_eq!(
            RangeProof::new(1, &opening, 65, &mut rng),
            Err(ProofError::UnsupportedBitLength(65))
        );
    }

    #[test]
    fn negative_balance_cannot_be_proven() {
        // 1000 - 1500 wraps to a huge scalar; its 64-bit decomposition
        // cannot reproduce the commitment.
        let mut rng = rng();
        let opening = Opening::random(&mut rng);
        let commitment = PedersenCommitment::from_point(
            commit_with(1_000, &opening).point() - commit_with(1_500, &Opening::zero()).point(),
        );
        let forged = RangeProof::new(1_000u64.wrapping_sub(1_500), &opening, 64, &mut rng).unwrap();
        assert_eq!(
            forged.verify(&commitment, 64),
            Err(ProofError::EquationFailed {
                kind: ProofKind::Range,
                equation: "sum(2^i * C_i) == C",
            })
        );
    }

    #[test]
    fn width_mismatch_rejected() {
        let mut rng = rng();
        let (commitment, opening) = commit(10, &mut rng);
        let proof = RangeProof::new(10, &opening, 16, &mut rng).unwrap();
        assert_eq!(
            proof.verify(&commitment, 32),
            Err(ProofError::BitLengthMismatch {
                expected: 32,
                actual: 16
            })
        );
    }

    #[test]
    fn wrong_commitment_rejected() {
        let mut rng = rng();
        let (_, opening) = commit(10, &mut rng);
        let proof = RangeProof::new(10, &opening, 16, &mut rng).unwrap();
        let (other, _) = commit(10, &mut rng);
        assert!(proof.verify(&other, 16).is_err());
    }

    #[test]
    fn tampered_bit_rejected() {
        let mut rng = rng();
        let (commitment, opening) = commit(6, &mut rng);
        let mut proof = RangeProof::new(6, &opening, 8, &mut rng).unwrap();
        proof.bits[3].c0 += Scalar::ONE;
        assert_eq!(
            proof.verify(&commitment, 8),
            Err(ProofError::EquationFailed {
                kind: ProofKind::Range,
                equation: "c0 + c1 == c",
            })
        );
    }

    #[test]
    fn ciphertext_commitment_half_is_range_provable() {
        let mut rng = rng();
        let kp = ElGamalKeypair::random(&mut rng);
        let (ct, opening) = encrypt_with_rng(kp.public(), 40_000, &mut rng);
        let proof = RangeProof::new(40_000, &opening, 16, &mut rng).unwrap();
        assert!(proof.verify(&ct.pedersen(), 16).is_ok());
    }
}
