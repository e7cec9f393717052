//! Errors returned by the confidential transfer module.
//!
//! Every failure is local to the offending message: nothing is retried and
//! nothing is partially applied. [`ErrorKind`] groups variants for callers
//! that only care about the class of failure (metrics labels, RPC codes).

use shield_protocol::codec::CodecError;
use shield_protocol::config::ParamsError;
use shield_protocol::storage::{AccountKey, StoreError};
use shield_protocol::zkp::ProofError;
use thiserror::Error;

use crate::bank::BankError;
use crate::gas::GasError;

/// Failure classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed message: bad address, bad denom, amount out of bounds.
    Validation,
    /// A proof did not verify.
    ProofVerification,
    /// The account already exists.
    Conflict,
    /// An account the message needs does not exist.
    NotFound,
    /// Pending credit counter at its limit, or out of gas.
    ResourceExhaustion,
    /// The plaintext ledger refused a send from the caller.
    InsufficientFunds,
    /// The signer is not the message owner, or the module is switched off.
    Unauthorized,
    /// Storage, escrow or rollback fault. Not the caller's doing.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ProofVerification => "proof_verification",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ResourceExhaustion => "resource_exhaustion",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfidentialError {
    // -- Validation ----------------------------------------------------------
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("invalid denom {0:?}")]
    InvalidDenom(String),

    #[error("denom does not exist: {0}")]
    DenomNotFound(String),

    #[error("positive amount is required")]
    ZeroAmount,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("sender and recipient must differ")]
    SelfTransfer,

    /// An owner-only AES balance field was left empty.
    #[error("{0} is required")]
    MissingDecryptableBalance(&'static str),

    #[error("too many auditors: {count}, at most {max} allowed")]
    TooManyAuditors { count: usize, max: usize },

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    // -- Proofs --------------------------------------------------------------
    /// `reason` names the check, e.g. "pending balance lo must be 0".
    #[error("{reason}: {source}")]
    InvalidProof {
        reason: &'static str,
        #[source]
        source: ProofError,
    },

    // -- Account state -------------------------------------------------------
    #[error("account already exists: {0}")]
    AlreadyExists(AccountKey),

    #[error("account not found: {0}")]
    AccountNotFound(AccountKey),

    #[error("no pending balances to apply for {0}")]
    NoPendingBalance(AccountKey),

    #[error("too many pending transactions for {0}, apply pending balance first")]
    TooManyPendingTransactions(AccountKey),

    // -- Resources -----------------------------------------------------------
    #[error(transparent)]
    OutOfGas(#[from] GasError),

    #[error("confidential transfers are disabled")]
    ModuleDisabled,

    #[error("signer {signer} cannot act for {owner}")]
    Unauthorized { signer: String, owner: String },

    // -- Plaintext ledger ----------------------------------------------------
    #[error(transparent)]
    InsufficientFunds(BankError),

    /// The module escrow could not cover a withdrawal it owes. Means the
    /// escrow and the confidential balances have drifted apart.
    #[error("insufficient escrow funds: {0}")]
    InsufficientEscrowFunds(BankError),

    // -- Internal ------------------------------------------------------------
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid module params: {0}")]
    Params(#[from] ParamsError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl ConfidentialError {
    pub fn kind(&self) -> ErrorKind {
        use ConfidentialError::*;
        match self {
            InvalidAddress { .. }
            | InvalidDenom(_)
            | DenomNotFound(_)
            | ZeroAmount
            | SelfTransfer
            | TooManyAuditors { .. }
            | MissingDecryptableBalance(_)
            | InvalidMessage(_)
            | Codec(CodecError::AmountTooLarge(_)) => ErrorKind::Validation,
            InvalidProof { .. } => ErrorKind::ProofVerification,
            AlreadyExists(_) => ErrorKind::Conflict,
            AccountNotFound(_) | NoPendingBalance(_) => ErrorKind::NotFound,
            TooManyPendingTransactions(_) | OutOfGas(_) => ErrorKind::ResourceExhaustion,
            Unauthorized { .. } | ModuleDisabled => ErrorKind::Unauthorized,
            InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            Codec(CodecError::Overflow)
            | InsufficientEscrowFunds(_)
            | Store(_)
            | Params(_)
            | Metrics(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn invalid_proof(reason: &'static str) -> impl FnOnce(ProofError) -> Self {
        move |source| ConfidentialError::InvalidProof { reason, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shield_protocol::zkp::ProofKind;

    #[test]
    fn proof_failure_message_leads_with_reason() {
        let err = ConfidentialError::invalid_proof("pending balance lo must be 0")(
            ProofError::DegenerateInput(ProofKind::ZeroBalance),
        );
        assert!(err.to_string().starts_with("pending balance lo must be 0"));
        assert_eq!(err.kind(), ErrorKind::ProofVerification);
    }

    #[test]
    fn amount_too_large_is_validation() {
        let err = ConfidentialError::from(CodecError::AmountTooLarge(1 << 48));
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = ConfidentialError::from(CodecError::Overflow);
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn kind_labels() {
        let key = AccountKey::new("shield1x", "uatom");
        assert_eq!(
            ConfidentialError::TooManyPendingTransactions(key.clone()).kind(),
            ErrorKind::ResourceExhaustion
        );
        assert_eq!(
            ConfidentialError::AlreadyExists(key).kind().as_str(),
            "conflict"
        );
    }
}
