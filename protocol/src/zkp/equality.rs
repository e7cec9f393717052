//! Equality proofs.
//!
//! Both proofs show that a ciphertext under the prover's own key encrypts
//! the same `x` as something else. The prover does not know the
//! randomness of its own ciphertext (it is usually the result of
//! homomorphic arithmetic on chain), so the ciphertext side is opened with
//! the secret key instead: `C1 = x*G + s*D1`.
//!
//! - [`CiphertextCommitmentEqualityProof`]: `(C1, D1)` under `P` and a
//!   Pedersen commitment `C2 = x*G + r*H`.
//! - [`CiphertextCiphertextEqualityProof`]: `(C1, D1)` under `P1` and a
//!   fresh ciphertext `(C2, D2) = (x*G + r*H, r*P2)` under `P2`.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::{check, ensure_not_identity, ProofError, ProofKind, Transcript};
use crate::crypto::elgamal::{
    g, h, random_scalar, Ciphertext, ElGamalKeypair, ElGamalPubkey, Opening, PedersenCommitment,
};

// ---------------------------------------------------------------------------
// Ciphertext / Commitment
// ---------------------------------------------------------------------------

const CT_COMM_DOMAIN: &[u8] = b"shield/ciphertext-commitment-equality";
const CT_COMM_KIND: ProofKind = ProofKind::CiphertextCommitmentEquality;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextCommitmentEqualityProof {
    y0: RistrettoPoint,
    y1: RistrettoPoint,
    y2: RistrettoPoint,
    z_s: Scalar,
    z_x: Scalar,
    z_r: Scalar,
}

fn ct_comm_challenge(
    pubkey: &ElGamalPubkey,
    ciphertext: &Ciphertext,
    commitment: &PedersenCommitment,
    y0: &RistrettoPoint,
    y1: &RistrettoPoint,
    y2: &RistrettoPoint,
) -> Scalar {
    let mut t = Transcript::new(CT_COMM_DOMAIN);
    t.append_point(b"P", pubkey.point());
    t.append_point(b"C1", &ciphertext.commitment);
    t.append_point(b"D1", &ciphertext.handle);
    t.append_point(b"C2", commitment.point());
    t.append_point(b"Y0", y0);
    t.append_point(b"Y1", y1);
    t.append_point(b"Y2", y2);
    t.challenge_scalar(b"c")
}

impl CiphertextCommitmentEqualityProof {
    /// `ciphertext` encrypts `amount` under `keypair`, and `commitment` is
    /// `commit_with(amount, opening)`.
    pub fn new<R: RngCore + CryptoRng>(
        keypair: &ElGamalKeypair,
        ciphertext: &Ciphertext,
        commitment: &PedersenCommitment,
        amount: u64,
        opening: &Opening,
        rng: &mut R,
    ) -> Self {
        let s = keypair.secret().as_scalar();
        let x = Scalar::from(amount);
        let r = opening.as_scalar();

        let y_s = random_scalar(rng);
        let y_x = random_scalar(rng);
        let y_r = random_scalar(rng);
        let y0 = y_s * keypair.public().point();
        let y1 = y_x * g() + y_s * ciphertext.handle;
        let y2 = y_x * g() + y_r * h();

        let c = ct_comm_challenge(keypair.public(), ciphertext, commitment, &y0, &y1, &y2);
        Self {
            y0,
            y1,
            y2,
            z_s: c * s + y_s,
            z_x: c * x + y_x,
            z_r: c * r + y_r,
        }
    }

    pub fn verify(
        &self,
        pubkey: &ElGamalPubkey,
        ciphertext: &Ciphertext,
        commitment: &PedersenCommitment,
    ) -> Result<(), ProofError> {
        ensure_not_identity(CT_COMM_KIND, pubkey.point())?;
        let c = ct_comm_challenge(
            pubkey, ciphertext, commitment, &self.y0, &self.y1, &self.y2,
        );
        check(
            CT_COMM_KIND,
            "z_s*P == c*H + Y0",
            self.z_s * pubkey.point() == c * h() + self.y0,
        )?;
        check(
            CT_COMM_KIND,
            "z_x*G + z_s*D1 == c*C1 + Y1",
            self.z_x * g() + self.z_s * ciphertext.handle == c * ciphertext.commitment + self.y1,
        )?;
        check(
            CT_COMM_KIND,
            "z_x*G + z_r*H == c*C2 + Y2",
            self.z_x * g() + self.z_r * h() == c * commitment.point() + self.y2,
        )
    }
}

// ---------------------------------------------------------------------------
// Ciphertext / Ciphertext
// ---------------------------------------------------------------------------

const CT_CT_DOMAIN: &[u8] = b"shield/ciphertext-ciphertext-equality";
const CT_CT_KIND: ProofKind = ProofKind::CiphertextCiphertextEquality;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextCiphertextEqualityProof {
    y0: RistrettoPoint,
    y1: RistrettoPoint,
    y2: RistrettoPoint,
    y3: RistrettoPoint,
    z_s: Scalar,
    z_x: Scalar,
    z_r: Scalar,
}

struct CtCtInputs<'a> {
    source_pubkey: &'a ElGamalPubkey,
    destination_pubkey: &'a ElGamalPubkey,
    source: &'a Ciphertext,
    destination: &'a Ciphertext,
}

impl CtCtInputs<'_> {
    fn challenge(&self, proof_commitments: [&RistrettoPoint; 4]) -> Scalar {
        let mut t = Transcript::new(CT_CT_DOMAIN);
        t.append_point(b"P1", self.source_pubkey.point());
        t.append_point(b"P2", self.destination_pubkey.point());
        t.append_point(b"C1", &self.source.commitment);
        t.append_point(b"D1", &self.source.handle);
        t.append_point(b"C2", &self.destination.commitment);
        t.append_point(b"D2", &self.destination.handle);
        let [y0, y1, y2, y3] = proof_commitments;
        t.append_point(b"Y0", y0);
        t.append_point(b"Y1", y1);
        t.append_point(b"Y2", y2);
        t.append_point(b"Y3", y3);
        t.challenge_scalar(b"c")
    }
}

impl CiphertextCiphertextEqualityProof {
    /// `source` encrypts `amount` under `source_keypair`; `destination` is
    /// `encrypt_with(destination_pubkey, amount, destination_opening)`.
    pub fn new<R: RngCore + CryptoRng>(
        source_keypair: &ElGamalKeypair,
        destination_pubkey: &ElGamalPubkey,
        source: &Ciphertext,
        destination: &Ciphertext,
        amount: u64,
        destination_opening: &Opening,
        rng: &mut R,
    ) -> Self {
        let s = source_keypair.secret().as_scalar();
        let x = Scalar::from(amount);
        let r = destination_opening.as_scalar();

        let y_s = random_scalar(rng);
        let y_x = random_scalar(rng);
        let y_r = random_scalar(rng);
        let y0 = y_s * source_keypair.public().point();
        let y1 = y_x * g() + y_s * source.handle;
        let y2 = y_x * g() + y_r * h();
        let y3 = y_r * destination_pubkey.point();

        let inputs = CtCtInputs {
            source_pubkey: source_keypair.public(),
            destination_pubkey,
            source,
            destination,
        };
        let c = inputs.challenge([&y0, &y1, &y2, &y3]);
        Self {
            y0,
            y1,
            y2,
            y3,
            z_s: c * s + y_s,
            z_x: c * x + y_x,
            z_r: c * r + y_r,
        }
    }

    pub fn verify(
        &self,
        source_pubkey: &ElGamalPubkey,
        destination_pubkey: &ElGamalPubkey,
        source: &Ciphertext,
        destination: &Ciphertext,
    ) -> Result<(), ProofError> {
        ensure_not_identity(CT_CT_KIND, source_pubkey.point())?;
        ensure_not_identity(CT_CT_KIND, destination_pubkey.point())?;
        let inputs = CtCtInputs {
            source_pubkey,
            destination_pubkey,
            source,
            destination,
        };
        let c = inputs.challenge([&self.y0, &self.y1, &self.y2, &self.y3]);

        check(
            CT_CT_KIND,
            "z_s*P1 == c*H + Y0",
            self.z_s * source_pubkey.point() == c * h() + self.y0,
        )?;
        check(
            CT_CT_KIND,
            "z_x*G + z_s*D1 == c*C1 + Y1",
            self.z_x * g() + self.z_s * source.handle == c * source.commitment + self.y1,
        )?;
        check(
            CT_CT_KIND,
            "z_x*G + z_r*H == c*C2 + Y2",
            self.z_x * g() + self.z_r * h() == c * destination.commitment + self.y2,
        )?;
        check(
            CT_CT_KIND,
            "z_r*P2 == c*D2 + Y3",
            self.z_r * destination_pubkey.point() == c * destination.handle + self.y3,
        )
    }
}
