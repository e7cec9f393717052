//! # Plaintext Ledger
//!
//! The conventional token ledger the confidential module escrows into.
//! Deposits move real tokens from the caller into the module account;
//! withdrawals move them back out. At any time the module account holds
//! exactly the value that exists in confidential form.
//!
//! [`BankKeeper`] is the seam. [`MemoryBank`] is a complete in-memory
//! implementation with per-denom supply tracking, used by tests and by
//! hosts that do not bring their own ledger.

use std::collections::BTreeMap;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the plaintext ledger. A failed send never moves
/// anything.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    /// The sender holds less than it tries to send.
    #[error("insufficient funds: {holder} has {available}{denom}, needs {requested}{denom}")]
    InsufficientFunds {
        /// Address or module name of the sender.
        holder: String,
        denom: String,
        available: u64,
        requested: u64,
    },

    /// Crediting would overflow the receiver's balance or the supply.
    #[error("balance overflow crediting {holder} with {denom}")]
    Overflow { holder: String, denom: String },
}

// ---------------------------------------------------------------------------
// Seam
// ---------------------------------------------------------------------------

/// Plaintext token ledger as seen by the confidential module.
pub trait BankKeeper {
    /// Move `amount` from an account into a module account.
    fn send_coins_from_account_to_module(
        &mut self,
        from: &str,
        module: &str,
        denom: &str,
        amount: u64,
    ) -> Result<(), BankError>;

    /// Move `amount` from a module account to an account.
    fn send_coins_from_module_to_account(
        &mut self,
        module: &str,
        to: &str,
        denom: &str,
        amount: u64,
    ) -> Result<(), BankError>;

    fn get_balance(&self, address: &str, denom: &str) -> u64;

    fn get_module_balance(&self, module: &str, denom: &str) -> u64;

    /// Whether the denom exists (has been minted) on this ledger.
    fn has_supply(&self, denom: &str) -> bool;
}

// ---------------------------------------------------------------------------
// MemoryBank
// ---------------------------------------------------------------------------

/// Holder of a plaintext balance. Module accounts live in their own
/// namespace so a module name can never collide with an address.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Holder {
    Account(String),
    Module(String),
}

impl Holder {
    fn label(&self) -> String {
        match self {
            Holder::Account(address) => address.clone(),
            Holder::Module(name) => format!("module:{name}"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryBank {
    balances: BTreeMap<(Holder, String), u64>,
    supply: BTreeMap<String, u64>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new tokens in `address`.
    pub fn mint(&mut self, address: &str, denom: &str, amount: u64) -> Result<(), BankError> {
        let holder = Holder::Account(address.to_string());
        let supply = self.supply.get(denom).copied().unwrap_or(0);
        let new_supply = supply.checked_add(amount).ok_or_else(|| BankError::Overflow {
            holder: holder.label(),
            denom: denom.to_string(),
        })?;
        self.credit(&holder, denom, amount)?;
        self.supply.insert(denom.to_string(), new_supply);
        Ok(())
    }

    /// Total minted supply of `denom`.
    pub fn supply(&self, denom: &str) -> u64 {
        self.supply.get(denom).copied().unwrap_or(0)
    }

    fn balance_of(&self, holder: &Holder, denom: &str) -> u64 {
        self.balances
            .get(&(holder.clone(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn credit(&mut self, holder: &Holder, denom: &str, amount: u64) -> Result<(), BankError> {
        let balance = self.balance_of(holder, denom);
        let updated = balance.checked_add(amount).ok_or_else(|| BankError::Overflow {
            holder: holder.label(),
            denom: denom.to_string(),
        })?;
        self.balances
            .insert((holder.clone(), denom.to_string()), updated);
        Ok(())
    }

    /// Move `amount` between holders. Checks both sides before touching
    /// either.
    fn transfer(
        &mut self,
        from: Holder,
        to: Holder,
        denom: &str,
        amount: u64,
    ) -> Result<(), BankError> {
        let available = self.balance_of(&from, denom);
        if available < amount {
            return Err(BankError::InsufficientFunds {
                holder: from.label(),
                denom: denom.to_string(),
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        self.balance_of(&to, denom)
            .checked_add(amount)
            .ok_or_else(|| BankError::Overflow {
                holder: to.label(),
                denom: denom.to_string(),
            })?;

        self.balances
            .insert((from, denom.to_string()), available - amount);
        self.credit(&to, denom, amount)
    }
}

impl BankKeeper for MemoryBank {
    fn send_coins_from_account_to_module(
        &mut self,
        from: &str,
        module: &str,
        denom: &str,
        amount: u64,
    ) -> Result<(), BankError> {
        self.transfer(
            Holder::Account(from.to_string()),
            Holder::Module(module.to_string()),
            denom,
            amount,
        )
    }

    fn send_coins_from_module_to_account(
        &mut self,
        module: &str,
        to: &str,
        denom: &str,
        amount: u64,
    ) -> Result<(), BankError> {
        self.transfer(
            Holder::Module(module.to_string()),
            Holder::Account(to.to_string()),
            denom,
            amount,
        )
    }

    fn get_balance(&self, address: &str, denom: &str) -> u64 {
        self.balance_of(&Holder::Account(address.to_string()), denom)
    }

    fn get_module_balance(&self, module: &str, denom: &str) -> u64 {
        self.balance_of(&Holder::Module(module.to_string()), denom)
    }

    fn has_supply(&self, denom: &str) -> bool {
        self.supply.contains_key(denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = "confidentialtransfers";

    #[test]
    fn mint_tracks_supply() {
        let mut bank = MemoryBank::new();
        bank.mint("alice", "uatom", 100).unwrap();
        bank.mint("bob", "uatom", 50).unwrap();
        assert_eq!(bank.supply("uatom"), 150);
        assert!(bank.has_supply("uatom"));
        assert!(!bank.has_supply("usei"));
    }

    #[test]
    fn escrow_roundtrip() {
        let mut bank = MemoryBank::new();
        bank.mint("alice", "uatom", 100).unwrap();

        bank.send_coins_from_account_to_module("alice", MODULE, "uatom", 60)
            .unwrap();
        assert_eq!(bank.get_balance("alice", "uatom"), 40);
        assert_eq!(bank.get_module_balance(MODULE, "uatom"), 60);

        bank.send_coins_from_module_to_account(MODULE, "bob", "uatom", 25)
            .unwrap();
        assert_eq!(bank.get_balance("bob", "uatom"), 25);
        assert_eq!(bank.get_module_balance(MODULE, "uatom"), 35);
        assert_eq!(bank.supply("uatom"), 100);
    }

    #[test]
    fn insufficient_funds_moves_nothing() {
        let mut bank = MemoryBank::new();
        bank.mint("alice", "uatom", 10).unwrap();

        let err = bank
            .send_coins_from_account_to_module("alice", MODULE, "uatom", 11)
            .unwrap_err();
        assert_eq!(
            err,
            BankError::InsufficientFunds {
                holder: "alice".into(),
                denom: "uatom".into(),
                available: 10,
                requested: 11,
            }
        );
        assert_eq!(bank.get_balance("alice", "uatom"), 10);
        assert_eq!(bank.get_module_balance(MODULE, "uatom"), 0);
    }

    #[test]
    fn module_and_account_namespaces_are_separate() {
        let mut bank = MemoryBank::new();
        bank.mint(MODULE, "uatom", 10).unwrap();
        assert_eq!(bank.get_balance(MODULE, "uatom"), 10);
        assert_eq!(bank.get_module_balance(MODULE, "uatom"), 0);
        assert!(bank
            .send_coins_from_module_to_account(MODULE, "bob", "uatom", 1)
            .is_err());
    }

    #[test]
    fn mint_overflow_rejected() {
        let mut bank = MemoryBank::new();
        bank.mint("alice", "uatom", u64::MAX).unwrap();
        assert!(matches!(
            bank.mint("bob", "uatom", 1),
            Err(BankError::Overflow { .. })
        ));
        assert_eq!(bank.get_balance("bob", "uatom"), 0);
    }
}
