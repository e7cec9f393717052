//! The confidential account record.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::elgamal::{Ciphertext, ElGamalPubkey};

/// Identifies one account: an address holding one denomination.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub address: String,
    pub denom: String,
}

impl AccountKey {
    pub fn new(address: impl Into<String>, denom: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            denom: denom.into(),
        }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.denom)
    }
}

/// Confidential balance state of one `(address, denom)` pair.
///
/// The three ciphertexts are all under `public_key`. Incoming value lands
/// in the pending parts; only the owner moves it into `available_balance`
/// (see `ApplyPendingBalance`), so a sender never races the owner's own
/// proofs against the available balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Encryption key for this denom. Opaque to the state machine beyond
    /// the validity proof it was registered with.
    pub public_key: ElGamalPubkey,
    /// Low 16 bits of unapplied incoming value (may grow past 16 bits as
    /// credits accumulate).
    pub pending_balance_lo: Ciphertext,
    /// Next 32 bits of unapplied incoming value.
    pub pending_balance_hi: Ciphertext,
    /// Unapplied incoming credits. Bounded by `MAX_PENDING_CREDITS`.
    pub pending_balance_credit_counter: u16,
    /// Spendable balance.
    pub available_balance: Ciphertext,
    /// Owner-only AES cache of `available_balance`. Never verified.
    pub decryptable_available_balance: String,
}

impl Account {
    /// A freshly registered account with no pending credits.
    pub fn new(
        public_key: ElGamalPubkey,
        pending_balance_lo: Ciphertext,
        pending_balance_hi: Ciphertext,
        available_balance: Ciphertext,
        decryptable_available_balance: String,
    ) -> Self {
        Self {
            public_key,
            pending_balance_lo,
            pending_balance_hi,
            pending_balance_credit_counter: 0,
            available_balance,
            decryptable_available_balance,
        }
    }

    pub fn has_pending_credits(&self) -> bool {
        self.pending_balance_credit_counter > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::elgamal::ElGamalKeypair;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn new_account_has_no_pending_credits() {
        let mut rng = StdRng::seed_from_u64(8);
        let kp = ElGamalKeypair::random(&mut rng);
        let account = Account::new(
            *kp.public(),
            Ciphertext::zero(),
            Ciphertext::zero(),
            Ciphertext::zero(),
            String::new(),
        );
        assert_eq!(account.pending_balance_credit_counter, 0);
        assert!(!account.has_pending_credits());
    }

    #[test]
    fn keys_order_by_address_then_denom() {
        let a = AccountKey::new("shield1aaa", "zeta");
        let b = AccountKey::new("shield1aab", "alpha");
        let c = AccountKey::new("shield1aaa", "beta");
        let mut keys = vec![a.clone(), b.clone(), c.clone()];
        keys.sort();
        assert_eq!(keys, vec![c, a, b]);
    }

    #[test]
    fn key_display() {
        assert_eq!(AccountKey::new("shield1x", "uatom").to_string(), "shield1x/uatom");
    }
}
