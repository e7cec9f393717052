//! Proof verification inside a message.
//!
//! Every verification charges gas first, then runs the deterministic
//! verifier from `shield_protocol::zkp` on public data only, then records
//! the outcome. A failure carries the handler's reason string, e.g.
//! `"pending balance lo must be 0"`, in front of the verifier's own error.

use shield_protocol::crypto::{Ciphertext, ElGamalPubkey, PedersenCommitment};
use shield_protocol::storage::AccountStore;
use shield_protocol::zkp::{
    CiphertextCiphertextEqualityProof, CiphertextCommitmentEqualityProof, CiphertextValidityProof,
    ProofError, ProofKind, PubkeyValidityProof, RangeProof, ZeroBalanceProof,
};
use tracing::debug;

use crate::bank::BankKeeper;
use crate::context::TxContext;
use crate::error::ConfidentialError;

impl<'a, S: AccountStore, B: BankKeeper> TxContext<'a, S, B> {
    fn verify_with(
        &mut self,
        kind: ProofKind,
        reason: &'static str,
        verify: impl FnOnce() -> Result<(), ProofError>,
    ) -> Result<(), ConfidentialError> {
        let cost = match kind {
            ProofKind::Range => self.params().range_proof_gas_cost,
            _ => self.params().proof_verification_gas_cost,
        };
        self.consume_gas(cost, kind.as_str())?;

        let result = verify();
        self.metrics().record_proof(kind.as_str(), result.is_ok());
        if let Err(e) = &result {
            debug!(%kind, reason, error = %e, "proof rejected");
        }
        result.map_err(ConfidentialError::invalid_proof(reason))
    }

    pub fn verify_pubkey_validity(
        &mut self,
        proof: &PubkeyValidityProof,
        pubkey: &ElGamalPubkey,
        reason: &'static str,
    ) -> Result<(), ConfidentialError> {
        self.verify_with(ProofKind::PubkeyValidity, reason, || proof.verify(pubkey))
    }

    pub fn verify_zero_balance(
        &mut self,
        proof: &ZeroBalanceProof,
        pubkey: &ElGamalPubkey,
        ciphertext: &Ciphertext,
        reason: &'static str,
    ) -> Result<(), ConfidentialError> {
        self.verify_with(ProofKind::ZeroBalance, reason, || {
            proof.verify(pubkey, ciphertext)
        })
    }

    pub fn verify_ciphertext_validity(
        &mut self,
        proof: &CiphertextValidityProof,
        pubkey: &ElGamalPubkey,
        ciphertext: &Ciphertext,
        reason: &'static str,
    ) -> Result<(), ConfidentialError> {
        self.verify_with(ProofKind::CiphertextValidity, reason, || {
            proof.verify(pubkey, ciphertext)
        })
    }

    /// `commitment` opens to a value in `[0, 2^bits)`.
    pub fn verify_range(
        &mut self,
        proof: &RangeProof,
        commitment: &PedersenCommitment,
        bits: usize,
        reason: &'static str,
    ) -> Result<(), ConfidentialError> {
        self.verify_with(ProofKind::Range, reason, || proof.verify(commitment, bits))
    }

    pub fn verify_ciphertext_commitment_equality(
        &mut self,
        proof: &CiphertextCommitmentEqualityProof,
        pubkey: &ElGamalPubkey,
        ciphertext: &Ciphertext,
        commitment: &PedersenCommitment,
        reason: &'static str,
    ) -> Result<(), ConfidentialError> {
        self.verify_with(ProofKind::CiphertextCommitmentEquality, reason, || {
            proof.verify(pubkey, ciphertext, commitment)
        })
    }

    pub fn verify_ciphertext_ciphertext_equality(
        &mut self,
        proof: &CiphertextCiphertextEqualityProof,
        source_pubkey: &ElGamalPubkey,
        destination_pubkey: &ElGamalPubkey,
        source: &Ciphertext,
        destination: &Ciphertext,
        reason: &'static str,
    ) -> Result<(), ConfidentialError> {
        self.verify_with(ProofKind::CiphertextCiphertextEquality, reason, || {
            proof.verify(source_pubkey, destination_pubkey, source, destination)
        })
    }
}
