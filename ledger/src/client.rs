//! # Client-Side Message Builders
//!
//! Everything the state machine refuses to do: hold secret keys, decrypt
//! balances, choose openings and build proofs. An [`AccountOwner`] wraps
//! the per-denom ElGamal keypair and AES key of one address and turns the
//! account it reads from chain into ready-to-submit messages.
//!
//! Proofs are always built against the account exactly as passed in. If the
//! on-chain account moves on before the message lands, the proofs no longer
//! bind and the message fails; fetch the account again and rebuild.

use rand_core::{CryptoRng, RngCore};
use thiserror::Error;

use shield_protocol::codec::{self, CodecError};
use shield_protocol::config::{HI_BITS, LO_BITS, RANGE_PROOF_BITS};
use shield_protocol::crypto::{
    commit, decrypt, decrypt_balance, encrypt_balance, encrypt_with_rng, sub_scalar,
    sub_with_lo_hi, AesKey, Ciphertext, ElGamalError, ElGamalKeypair, ElGamalPubkey,
    EncryptionError, Opening,
};
use shield_protocol::storage::Account;
use shield_protocol::zkp::{
    CiphertextCiphertextEqualityProof, CiphertextCommitmentEqualityProof, CiphertextValidityProof,
    ProofError, PubkeyValidityProof, RangeProof, ZeroBalanceProof,
};

use crate::messages::{
    CloseAccountProofs, InitializeAccountProofs, MsgApplyPendingBalance, MsgCloseAccount,
    MsgDeposit, MsgInitializeAccount, MsgTransfer, MsgWithdraw, TransferAuditor, TransferProofs,
    WithdrawProofs,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    ElGamal(#[from] ElGamalError),

    #[error("decryptable balance: {0}")]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("insufficient confidential balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u64, requested: u64 },

    /// The account on chain is registered under a different key.
    #[error("account {address}/{denom} is not encrypted under this owner's key")]
    ForeignAccount { address: String, denom: String },
}

/// One address's keys for one denom.
#[derive(Clone, Debug)]
pub struct AccountOwner {
    address: String,
    denom: String,
    keypair: ElGamalKeypair,
    aes_key: AesKey,
}

/// The halves of a transfer amount under one key, with their openings.
struct SplitEncryption {
    lo: Ciphertext,
    hi: Ciphertext,
    lo_opening: Opening,
    hi_opening: Opening,
}

impl AccountOwner {
    /// Derive both keys from an owner seed, typically a signature over the
    /// denom by the address's signing key.
    pub fn new(
        address: impl Into<String>,
        denom: impl Into<String>,
        seed: &[u8],
    ) -> Result<Self, ClientError> {
        let denom = denom.into();
        let keypair = ElGamalKeypair::from_seed(seed, &denom)?;
        let aes_key = AesKey::from_seed(seed, &denom);
        Ok(Self::from_keys(address, denom, keypair, aes_key))
    }

    pub fn from_keys(
        address: impl Into<String>,
        denom: impl Into<String>,
        keypair: ElGamalKeypair,
        aes_key: AesKey,
    ) -> Self {
        Self {
            address: address.into(),
            denom: denom.into(),
            keypair,
            aes_key,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn denom(&self) -> &str {
        &self.denom
    }

    pub fn public_key(&self) -> &ElGamalPubkey {
        self.keypair.public()
    }

    pub fn keypair(&self) -> &ElGamalKeypair {
        &self.keypair
    }

    pub fn aes_key(&self) -> &AesKey {
        &self.aes_key
    }

    // -- Reading balances ----------------------------------------------------

    /// Decrypt the available balance, searching below `2^max_bits`.
    pub fn decrypt_available(&self, account: &Account, max_bits: u32) -> Result<u64, ClientError> {
        self.ensure_owned(account)?;
        Ok(decrypt(
            self.keypair.secret(),
            &account.available_balance,
            max_bits,
        )?)
    }

    /// Decrypt both pending halves and recombine them.
    pub fn decrypt_pending(&self, account: &Account, max_bits: u32) -> Result<u64, ClientError> {
        self.ensure_owned(account)?;
        let lo = decrypt(self.keypair.secret(), &account.pending_balance_lo, max_bits)?;
        let hi = decrypt(self.keypair.secret(), &account.pending_balance_hi, max_bits)?;
        Ok(codec::combine_pending(lo, hi)?)
    }

    /// The available balance according to the owner's AES cache.
    pub fn cached_available(&self, account: &Account) -> Result<u64, ClientError> {
        Ok(decrypt_balance(
            &self.aes_key,
            &account.decryptable_available_balance,
        )?)
    }

    // -- Builders ------------------------------------------------------------

    pub fn initialize_account<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<MsgInitializeAccount, ClientError> {
        let pubkey = self.keypair.public();
        let (pending_balance_lo, _) = encrypt_with_rng(pubkey, 0, rng);
        let (pending_balance_hi, _) = encrypt_with_rng(pubkey, 0, rng);
        let (available_balance, _) = encrypt_with_rng(pubkey, 0, rng);

        let proofs = InitializeAccountProofs {
            pubkey_validity: PubkeyValidityProof::new(&self.keypair, rng),
            zero_pending_balance_lo: ZeroBalanceProof::new(&self.keypair, &pending_balance_lo, rng),
            zero_pending_balance_hi: ZeroBalanceProof::new(&self.keypair, &pending_balance_hi, rng),
            zero_available_balance: ZeroBalanceProof::new(&self.keypair, &available_balance, rng),
        };
        Ok(MsgInitializeAccount {
            from_address: self.address.clone(),
            denom: self.denom.clone(),
            public_key: *pubkey,
            pending_balance_lo,
            pending_balance_hi,
            available_balance,
            decryptable_balance: encrypt_balance(&self.aes_key, 0)?,
            proofs,
        })
    }

    pub fn deposit(&self, amount: u64) -> MsgDeposit {
        MsgDeposit {
            from_address: self.address.clone(),
            denom: self.denom.clone(),
            amount,
        }
    }

    pub fn withdraw<R: RngCore + CryptoRng>(
        &self,
        account: &Account,
        amount: u64,
        rng: &mut R,
    ) -> Result<MsgWithdraw, ClientError> {
        self.ensure_owned(account)?;
        let new_balance = self.remaining_after(account, amount)?;

        let (commitment, opening) = commit(new_balance, rng);
        let remaining = sub_scalar(&account.available_balance, amount);
        let proofs = WithdrawProofs {
            range: RangeProof::new(new_balance, &opening, RANGE_PROOF_BITS, rng)?,
            equality: CiphertextCommitmentEqualityProof::new(
                &self.keypair,
                &remaining,
                &commitment,
                new_balance,
                &opening,
                rng,
            ),
        };
        Ok(MsgWithdraw {
            from_address: self.address.clone(),
            denom: self.denom.clone(),
            amount,
            new_available_commitment: commitment,
            new_decryptable_balance: encrypt_balance(&self.aes_key, new_balance)?,
            proofs,
        })
    }

    /// Fold the pending balance into the AES cache. `max_bits` bounds the
    /// decryption search for each pending half.
    pub fn apply_pending_balance(
        &self,
        account: &Account,
        max_bits: u32,
    ) -> Result<MsgApplyPendingBalance, ClientError> {
        let available = self.cached_available(account)?;
        let pending = self.decrypt_pending(account, max_bits)?;
        let merged = available.checked_add(pending).ok_or(CodecError::Overflow)?;
        Ok(MsgApplyPendingBalance {
            address: self.address.clone(),
            denom: self.denom.clone(),
            new_decryptable_available_balance: encrypt_balance(&self.aes_key, merged)?,
        })
    }

    /// Send `amount` to `to_address`, whose account for this denom is
    /// registered under `recipient_pubkey`. Each auditor gets its own
    /// proof-bound copy of the amount.
    pub fn transfer<R: RngCore + CryptoRng>(
        &self,
        account: &Account,
        to_address: &str,
        recipient_pubkey: &ElGamalPubkey,
        amount: u64,
        auditors: &[(String, ElGamalPubkey)],
        rng: &mut R,
    ) -> Result<MsgTransfer, ClientError> {
        self.ensure_owned(account)?;
        let new_balance = self.remaining_after(account, amount)?;
        let (lo, hi) = codec::split(amount)?;
        let (lo, hi) = (u64::from(lo), u64::from(hi));

        let sender = split_encrypt(self.keypair.public(), lo, hi, rng);
        let recipient = split_encrypt(recipient_pubkey, lo, hi, rng);

        let (commitment, opening) = commit(new_balance, rng);
        let remaining = sub_with_lo_hi(&account.available_balance, &sender.lo, &sender.hi);

        let proofs = TransferProofs {
            sender_amount_lo_validity: CiphertextValidityProof::new(
                self.keypair.public(),
                &sender.lo,
                lo,
                &sender.lo_opening,
                rng,
            ),
            sender_amount_hi_validity: CiphertextValidityProof::new(
                self.keypair.public(),
                &sender.hi,
                hi,
                &sender.hi_opening,
                rng,
            ),
            recipient_amount_lo_validity: CiphertextValidityProof::new(
                recipient_pubkey,
                &recipient.lo,
                lo,
                &recipient.lo_opening,
                rng,
            ),
            recipient_amount_hi_validity: CiphertextValidityProof::new(
                recipient_pubkey,
                &recipient.hi,
                hi,
                &recipient.hi_opening,
                rng,
            ),
            amount_lo_range: RangeProof::new(lo, &sender.lo_opening, LO_BITS as usize, rng)?,
            amount_hi_range: RangeProof::new(hi, &sender.hi_opening, HI_BITS as usize, rng)?,
            remaining_balance_range: RangeProof::new(new_balance, &opening, RANGE_PROOF_BITS, rng)?,
            remaining_balance_equality: CiphertextCommitmentEqualityProof::new(
                &self.keypair,
                &remaining,
                &commitment,
                new_balance,
                &opening,
                rng,
            ),
            amount_lo_equality: CiphertextCiphertextEqualityProof::new(
                &self.keypair,
                recipient_pubkey,
                &sender.lo,
                &recipient.lo,
                lo,
                &recipient.lo_opening,
                rng,
            ),
            amount_hi_equality: CiphertextCiphertextEqualityProof::new(
                &self.keypair,
                recipient_pubkey,
                &sender.hi,
                &recipient.hi,
                hi,
                &recipient.hi_opening,
                rng,
            ),
        };

        let auditors = auditors
            .iter()
            .map(|(address, pubkey)| self.auditor_copy(address, pubkey, &sender, lo, hi, rng))
            .collect();

        Ok(MsgTransfer {
            from_address: self.address.clone(),
            to_address: to_address.to_string(),
            denom: self.denom.clone(),
            sender_amount_lo: sender.lo,
            sender_amount_hi: sender.hi,
            recipient_amount_lo: recipient.lo,
            recipient_amount_hi: recipient.hi,
            remaining_balance_commitment: commitment,
            decryptable_balance: encrypt_balance(&self.aes_key, new_balance)?,
            proofs,
            auditors,
        })
    }

    /// Prove every balance of `account` is zero. Fails on chain if one is
    /// not.
    pub fn close_account<R: RngCore + CryptoRng>(
        &self,
        account: &Account,
        rng: &mut R,
    ) -> Result<MsgCloseAccount, ClientError> {
        self.ensure_owned(account)?;
        let proofs = CloseAccountProofs {
            zero_available_balance: ZeroBalanceProof::new(
                &self.keypair,
                &account.available_balance,
                rng,
            ),
            zero_pending_balance_lo: ZeroBalanceProof::new(
                &self.keypair,
                &account.pending_balance_lo,
                rng,
            ),
            zero_pending_balance_hi: ZeroBalanceProof::new(
                &self.keypair,
                &account.pending_balance_hi,
                rng,
            ),
        };
        Ok(MsgCloseAccount {
            address: self.address.clone(),
            denom: self.denom.clone(),
            proofs,
        })
    }

    // -- Helpers -------------------------------------------------------------

    fn ensure_owned(&self, account: &Account) -> Result<(), ClientError> {
        if account.public_key != *self.keypair.public() {
            return Err(ClientError::ForeignAccount {
                address: self.address.clone(),
                denom: self.denom.clone(),
            });
        }
        Ok(())
    }

    fn remaining_after(&self, account: &Account, amount: u64) -> Result<u64, ClientError> {
        let available = self.cached_available(account)?;
        available
            .checked_sub(amount)
            .ok_or(ClientError::InsufficientBalance {
                available,
                requested: amount,
            })
    }

    fn auditor_copy<R: RngCore + CryptoRng>(
        &self,
        address: &str,
        pubkey: &ElGamalPubkey,
        sender: &SplitEncryption,
        lo: u64,
        hi: u64,
        rng: &mut R,
    ) -> TransferAuditor {
        let copy = split_encrypt(pubkey, lo, hi, rng);
        TransferAuditor {
            address: address.to_string(),
            amount_lo_validity: CiphertextValidityProof::new(pubkey, &copy.lo, lo, &copy.lo_opening, rng),
            amount_hi_validity: CiphertextValidityProof::new(pubkey, &copy.hi, hi, &copy.hi_opening, rng),
            amount_lo_equality: CiphertextCiphertextEqualityProof::new(
                &self.keypair,
                pubkey,
                &sender.lo,
                &copy.lo,
                lo,
                &copy.lo_opening,
                rng,
            ),
            amount_hi_equality: CiphertextCiphertextEqualityProof::new(
                &self.keypair,
                pubkey,
                &sender.hi,
                &copy.hi,
                hi,
                &copy.hi_opening,
                rng,
            ),
            amount_lo: copy.lo,
            amount_hi: copy.hi,
        }
    }
}

fn split_encrypt<R: RngCore + CryptoRng>(
    pubkey: &ElGamalPubkey,
    lo: u64,
    hi: u64,
    rng: &mut R,
) -> SplitEncryption {
    let (lo_ct, lo_opening) = encrypt_with_rng(pubkey, lo, rng);
    let (hi_ct, hi_opening) = encrypt_with_rng(pubkey, hi, rng);
    SplitEncryption {
        lo: lo_ct,
        hi: hi_ct,
        lo_opening,
        hi_opening,
    }
}
