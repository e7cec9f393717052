//! # Protocol Configuration & Constants
//!
//! Every magic number of the confidential transfer module lives here, next
//! to the governance-tunable [`ModuleParams`].
//!
//! The bit widths below are consensus-critical: they decide which amounts
//! the codec accepts and which ranges the proofs attest to. Changing them
//! after launch would orphan every ciphertext already on chain.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Amount Encoding
// ---------------------------------------------------------------------------

/// Width of the low part of a split amount.
pub const LO_BITS: u32 = 16;

/// Width of the high part of a split amount.
pub const HI_BITS: u32 = 32;

/// Largest amount a single deposit, withdrawal or transfer may move:
/// `2^48 - 1`. Anything above does not fit the lo/hi split.
pub const MAX_TRANSFER_AMOUNT: u64 = (1 << (LO_BITS + HI_BITS)) - 1;

/// Upper bound for `pending_balance_credit_counter`. Once an account has
/// this many unapplied credits it must apply them before receiving more.
pub const MAX_PENDING_CREDITS: u16 = u16::MAX;

/// Width of the range proof on a post-operation available balance.
pub const RANGE_PROOF_BITS: usize = 64;

/// Widest value [`crate::crypto::elgamal::decrypt`] will search for. The
/// baby-step table grows with `2^(bits/2)`, so anything larger is a DoS on
/// the caller rather than a decryption.
pub const MAX_DECRYPT_BITS: u32 = 48;

// ---------------------------------------------------------------------------
// Addresses & Accounts
// ---------------------------------------------------------------------------

/// Bech32 human-readable prefix for account addresses.
pub const ACCOUNT_HRP: &str = "shield";

/// Name of the module escrow account on the plaintext ledger. All tokens
/// that currently exist in confidential form are held here.
pub const MODULE_NAME: &str = "confidentialtransfers";

/// Hard cap on auditors per transfer. Each one costs four extra proofs.
pub const MAX_AUDITORS: usize = 5;

/// Denominations are 3..=128 characters.
pub const MIN_DENOM_LENGTH: usize = 3;
pub const MAX_DENOM_LENGTH: usize = 128;

// ---------------------------------------------------------------------------
// Symmetric Encryption
// ---------------------------------------------------------------------------

/// AES-256-GCM key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes. Twelve. Not 16.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// Module Parameters
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating [`ModuleParams`].
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("malformed params: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("max_auditors {0} exceeds the protocol cap of {MAX_AUDITORS}")]
    TooManyAuditors(usize),
}

/// Governance-controlled parameters of the confidential transfer module.
///
/// Gas costs are charged by the handlers against the caller's gas meter.
/// They are deliberately separate knobs: a range proof is one to two orders
/// of magnitude more expensive to verify than a sigma proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleParams {
    /// Kill switch. When `false`, every message is rejected.
    pub enabled: bool,
    /// Gas charged per range proof verification.
    pub range_proof_gas_cost: u64,
    /// Gas charged per homomorphic ciphertext operation.
    pub ciphertext_gas_cost: u64,
    /// Gas charged per sigma proof verification.
    pub proof_verification_gas_cost: u64,
    /// Maximum auditors accepted on a single transfer.
    pub max_auditors: usize,
}

impl Default for ModuleParams {
    fn default() -> Self {
        Self {
            enabled: true,
            range_proof_gas_cost: 1_000_000,
            ciphertext_gas_cost: 5_000,
            proof_verification_gas_cost: 50_000,
            max_auditors: MAX_AUDITORS,
        }
    }
}

impl ModuleParams {
    /// Parse params from JSON. Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Reject parameter sets the module cannot honour.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.max_auditors > MAX_AUDITORS {
            return Err(ParamsError::TooManyAuditors(self.max_auditors));
        }
        Ok(())
    }
}
