//! # Messages
//!
//! The six operations a client can submit, each with the proof bundle the
//! handler verifies. Messages carry only public data: ciphertexts, public
//! keys, commitments and proofs. Openings and secret keys stay with the
//! client (see [`crate::client`]).
//!
//! `validate_basic` performs the stateless checks (address and denom
//! syntax, positive amounts, auditor count, non-empty AES balance fields)
//! before any state is read.

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};

use shield_protocol::config::{ACCOUNT_HRP, MAX_AUDITORS, MAX_DENOM_LENGTH, MIN_DENOM_LENGTH};
use shield_protocol::crypto::{Ciphertext, ElGamalPubkey, PedersenCommitment};
use shield_protocol::zkp::{
    CiphertextCiphertextEqualityProof, CiphertextCommitmentEqualityProof, CiphertextValidityProof,
    PubkeyValidityProof, RangeProof, ZeroBalanceProof,
};

use crate::error::ConfidentialError;

// ---------------------------------------------------------------------------
// Addresses & denoms
// ---------------------------------------------------------------------------

/// Check that `address` is a bech32 string under [`ACCOUNT_HRP`] with a
/// non-empty payload.
pub fn validate_address(address: &str) -> Result<(), ConfidentialError> {
    let invalid = |reason: String| ConfidentialError::InvalidAddress {
        address: address.to_string(),
        reason,
    };
    let (hrp, data) = bech32::decode(address).map_err(|e| invalid(e.to_string()))?;
    let expected = Hrp::parse(ACCOUNT_HRP).map_err(|e| invalid(e.to_string()))?;
    if hrp != expected {
        return Err(invalid(format!("expected prefix {ACCOUNT_HRP}, got {hrp}")));
    }
    if data.is_empty() {
        return Err(invalid("empty payload".to_string()));
    }
    Ok(())
}

/// Encode raw address bytes as a bech32 account address.
pub fn encode_address(bytes: &[u8]) -> Result<String, ConfidentialError> {
    let invalid = |reason: String| ConfidentialError::InvalidAddress {
        address: hex_preview(bytes),
        reason,
    };
    let hrp = Hrp::parse(ACCOUNT_HRP).map_err(|e| invalid(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, bytes).map_err(|e| invalid(e.to_string()))
}

fn hex_preview(bytes: &[u8]) -> String {
    bytes.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Denoms match `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`.
pub fn validate_denom(denom: &str) -> Result<(), ConfidentialError> {
    let bytes = denom.as_bytes();
    let well_formed = (MIN_DENOM_LENGTH..=MAX_DENOM_LENGTH).contains(&bytes.len())
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'));
    if well_formed {
        Ok(())
    } else {
        Err(ConfidentialError::InvalidDenom(denom.to_string()))
    }
}

fn validate_owner(address: &str, denom: &str) -> Result<(), ConfidentialError> {
    validate_address(address)?;
    validate_denom(denom)
}

/// The chain never decrypts the AES cache, but the owner's client reads it
/// back before building the next message.
fn require_decryptable(value: &str, field: &'static str) -> Result<(), ConfidentialError> {
    if value.is_empty() {
        return Err(ConfidentialError::MissingDecryptableBalance(field));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// InitializeAccount
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeAccountProofs {
    pub pubkey_validity: PubkeyValidityProof,
    pub zero_pending_balance_lo: ZeroBalanceProof,
    pub zero_pending_balance_hi: ZeroBalanceProof,
    pub zero_available_balance: ZeroBalanceProof,
}

/// Register an encryption key for `(from_address, denom)` with three
/// encryptions of zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgInitializeAccount {
    pub from_address: String,
    pub denom: String,
    pub public_key: ElGamalPubkey,
    pub pending_balance_lo: Ciphertext,
    pub pending_balance_hi: Ciphertext,
    pub available_balance: Ciphertext,
    pub decryptable_balance: String,
    pub proofs: InitializeAccountProofs,
}

impl MsgInitializeAccount {
    pub fn validate_basic(&self) -> Result<(), ConfidentialError> {
        validate_owner(&self.from_address, &self.denom)?;
        require_decryptable(&self.decryptable_balance, "decryptable balance")
    }
}

// ---------------------------------------------------------------------------
// Deposit
// ---------------------------------------------------------------------------

/// Move plaintext tokens into the pending balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDeposit {
    pub from_address: String,
    pub denom: String,
    pub amount: u64,
}

impl MsgDeposit {
    pub fn validate_basic(&self) -> Result<(), ConfidentialError> {
        validate_owner(&self.from_address, &self.denom)?;
        if self.amount == 0 {
            return Err(ConfidentialError::ZeroAmount);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Withdraw
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawProofs {
    /// `new_available_commitment` opens to a value in `[0, 2^64)`.
    pub range: RangeProof,
    /// `available_balance - amount` and `new_available_commitment` hold
    /// the same value.
    pub equality: CiphertextCommitmentEqualityProof,
}

/// Move `amount` out of the available balance back to plaintext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgWithdraw {
    pub from_address: String,
    pub denom: String,
    pub amount: u64,
    pub new_available_commitment: PedersenCommitment,
    pub new_decryptable_balance: String,
    pub proofs: WithdrawProofs,
}

impl MsgWithdraw {
    pub fn validate_basic(&self) -> Result<(), ConfidentialError> {
        validate_owner(&self.from_address, &self.denom)?;
        if self.amount == 0 {
            return Err(ConfidentialError::ZeroAmount);
        }
        require_decryptable(&self.new_decryptable_balance, "new decryptable balance")
    }
}

// ---------------------------------------------------------------------------
// ApplyPendingBalance
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgApplyPendingBalance {
    pub address: String,
    pub denom: String,
    /// AES cache of the merged balance. Trusted, never verified.
    pub new_decryptable_available_balance: String,
}

impl MsgApplyPendingBalance {
    pub fn validate_basic(&self) -> Result<(), ConfidentialError> {
        validate_owner(&self.address, &self.denom)?;
        require_decryptable(
            &self.new_decryptable_available_balance,
            "new decryptable available balance",
        )
    }
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProofs {
    pub sender_amount_lo_validity: CiphertextValidityProof,
    pub sender_amount_hi_validity: CiphertextValidityProof,
    pub recipient_amount_lo_validity: CiphertextValidityProof,
    pub recipient_amount_hi_validity: CiphertextValidityProof,
    /// The low half of the amount fits in 16 bits.
    pub amount_lo_range: RangeProof,
    /// The high half of the amount fits in 32 bits.
    pub amount_hi_range: RangeProof,
    pub remaining_balance_range: RangeProof,
    pub remaining_balance_equality: CiphertextCommitmentEqualityProof,
    pub amount_lo_equality: CiphertextCiphertextEqualityProof,
    pub amount_hi_equality: CiphertextCiphertextEqualityProof,
}

/// Disclosure copy of the transfer amount for one auditor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAuditor {
    pub address: String,
    pub amount_lo: Ciphertext,
    pub amount_hi: Ciphertext,
    pub amount_lo_validity: CiphertextValidityProof,
    pub amount_hi_validity: CiphertextValidityProof,
    /// Sender's `amount_lo` and this auditor's `amount_lo` match.
    pub amount_lo_equality: CiphertextCiphertextEqualityProof,
    pub amount_hi_equality: CiphertextCiphertextEqualityProof,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTransfer {
    pub from_address: String,
    pub to_address: String,
    pub denom: String,
    /// Amount halves under the sender's key.
    pub sender_amount_lo: Ciphertext,
    pub sender_amount_hi: Ciphertext,
    /// Amount halves under the recipient's key.
    pub recipient_amount_lo: Ciphertext,
    pub recipient_amount_hi: Ciphertext,
    pub remaining_balance_commitment: PedersenCommitment,
    pub decryptable_balance: String,
    pub proofs: TransferProofs,
    #[serde(default)]
    pub auditors: Vec<TransferAuditor>,
}

impl MsgTransfer {
    pub fn validate_basic(&self) -> Result<(), ConfidentialError> {
        validate_owner(&self.from_address, &self.denom)?;
        validate_address(&self.to_address)?;
        if self.from_address == self.to_address {
            return Err(ConfidentialError::SelfTransfer);
        }
        if self.auditors.len() > MAX_AUDITORS {
            return Err(ConfidentialError::TooManyAuditors {
                count: self.auditors.len(),
                max: MAX_AUDITORS,
            });
        }
        for auditor in &self.auditors {
            validate_address(&auditor.address)?;
        }
        require_decryptable(&self.decryptable_balance, "decryptable balance")
    }
}

// ---------------------------------------------------------------------------
// CloseAccount
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseAccountProofs {
    pub zero_available_balance: ZeroBalanceProof,
    pub zero_pending_balance_lo: ZeroBalanceProof,
    pub zero_pending_balance_hi: ZeroBalanceProof,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCloseAccount {
    pub address: String,
    pub denom: String,
    pub proofs: CloseAccountProofs,
}

impl MsgCloseAccount {
    pub fn validate_basic(&self) -> Result<(), ConfidentialError> {
        validate_owner(&self.address, &self.denom)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Any module message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Msg {
    InitializeAccount(MsgInitializeAccount),
    Deposit(MsgDeposit),
    Withdraw(MsgWithdraw),
    ApplyPendingBalance(MsgApplyPendingBalance),
    Transfer(MsgTransfer),
    CloseAccount(MsgCloseAccount),
}

impl Msg {
    /// Message type name, also used as the metrics label.
    pub fn name(&self) -> &'static str {
        match self {
            Msg::InitializeAccount(_) => "initialize_account",
            Msg::Deposit(_) => "deposit",
            Msg::Withdraw(_) => "withdraw",
            Msg::ApplyPendingBalance(_) => "apply_pending_balance",
            Msg::Transfer(_) => "transfer",
            Msg::CloseAccount(_) => "close_account",
        }
    }

    /// The address that must have signed the message.
    pub fn signer(&self) -> &str {
        match self {
            Msg::InitializeAccount(m) => &m.from_address,
            Msg::Deposit(m) => &m.from_address,
            Msg::Withdraw(m) => &m.from_address,
            Msg::ApplyPendingBalance(m) => &m.address,
            Msg::Transfer(m) => &m.from_address,
            Msg::CloseAccount(m) => &m.address,
        }
    }

    pub fn validate_basic(&self) -> Result<(), ConfidentialError> {
        match self {
            Msg::InitializeAccount(m) => m.validate_basic(),
            Msg::Deposit(m) => m.validate_basic(),
            Msg::Withdraw(m) => m.validate_basic(),
            Msg::ApplyPendingBalance(m) => m.validate_basic(),
            Msg::Transfer(m) => m.validate_basic(),
            Msg::CloseAccount(m) => m.validate_basic(),
        }
    }

    pub fn to_json(&self) -> Result<String, ConfidentialError> {
        serde_json::to_string(self).map_err(|e| ConfidentialError::InvalidMessage(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, ConfidentialError> {
        serde_json::from_str(json).map_err(|e| ConfidentialError::InvalidMessage(e.to_string()))
    }

    /// Compact binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfidentialError> {
        bincode::serialize(self).map_err(|e| ConfidentialError::InvalidMessage(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfidentialError> {
        bincode::deserialize(bytes).map_err(|e| ConfidentialError::InvalidMessage(e.to_string()))
    }
}

macro_rules! impl_from_msg {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(impl From<$ty> for Msg {
            fn from(msg: $ty) -> Self {
                Msg::$variant(msg)
            }
        })*
    };
}

impl_from_msg! {
    InitializeAccount => MsgInitializeAccount,
    Deposit => MsgDeposit,
    Withdraw => MsgWithdraw,
    ApplyPendingBalance => MsgApplyPendingBalance,
    Transfer => MsgTransfer,
    CloseAccount => MsgCloseAccount,
}
