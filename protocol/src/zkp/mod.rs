//! # Zero-Knowledge Proofs
//!
//! The six proofs that let the chain enforce conservation over balances it
//! cannot read. All of them are non-interactive sigma protocols made
//! non-interactive with a SHA-512 Fiat-Shamir [`Transcript`]; the range
//! proof is a bit decomposition with one OR proof per bit.
//!
//! ```text
//! pubkey.rs - knowledge of s with P = s^-1 H
//! zero_balance.rs - (C, D) encrypts 0 under P
//! validity.rs - (C, D) is a well-formed encryption under P
//! equality.rs - ciphertext = commitment, ciphertext = ciphertext
//! range.rs - committed value lies in [0, 2^n)
//! ```
//!
//! Provers are randomised and run on the client. Verifiers take only
//! public data, never unwind, and are pure functions of their inputs.
//! Every public input is absorbed into the transcript before the
//! challenge, which is what binds a proof to the exact ciphertext stored
//! on chain.

use std::fmt;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::traits::IsIdentity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod equality;
pub mod pubkey;
pub mod range;
pub mod transcript;
pub mod validity;
pub mod zero_balance;

pub use equality::{CiphertextCiphertextEqualityProof, CiphertextCommitmentEqualityProof};
pub use pubkey::PubkeyValidityProof;
pub use range::RangeProof;
pub use transcript::Transcript;
pub use validity::CiphertextValidityProof;
pub use zero_balance::ZeroBalanceProof;

/// The six proof kinds the module verifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofKind {
    PubkeyValidity,
    ZeroBalance,
    CiphertextValidity,
    Range,
    CiphertextCommitmentEquality,
    CiphertextCiphertextEquality,
}

impl ProofKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofKind::PubkeyValidity => "pubkey_validity",
            ProofKind::ZeroBalance => "zero_balance",
            ProofKind::CiphertextValidity => "ciphertext_validity",
            ProofKind::Range => "range",
            ProofKind::CiphertextCommitmentEquality => "ciphertext_commitment_equality",
            ProofKind::CiphertextCiphertextEquality => "ciphertext_ciphertext_equality",
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from proof generation or verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofError {
    /// A verification equation does not hold.
    #[error("{kind} proof rejected: {equation} does not hold")]
    EquationFailed {
        kind: ProofKind,
        equation: &'static str,
    },

    /// A public key or ciphertext component is the identity point.
    #[error("{0} proof rejected: degenerate public input")]
    DegenerateInput(ProofKind),

    /// The range proof covers a different width than the verifier expects.
    #[error("range proof covers {actual} bits, expected {expected}")]
    BitLengthMismatch { expected: usize, actual: usize },

    /// Range proofs support 1..=64 bits.
    #[error("unsupported range proof width: {0} bits")]
    UnsupportedBitLength(usize),

    /// Prover side: the witness is outside the range it should prove.
    #[error("amount {amount} does not fit in {bits} bits")]
    AmountOutOfRange { amount: u64, bits: usize },
}

/// Reject the identity point as a public input.
pub(crate) fn ensure_not_identity(
    kind: ProofKind,
    point: &RistrettoPoint,
) -> Result<(), ProofError> {
    if point.is_identity() {
        return Err(ProofError::DegenerateInput(kind));
    }
    Ok(())
}

/// Map a failed equation to a [`ProofError`].
pub(crate) fn check(
    kind: ProofKind,
    equation: &'static str,
    holds: bool,
) -> Result<(), ProofError> {
    if holds {
        Ok(())
    } else {
        Err(ProofError::EquationFailed { kind, equation })
    }
}
