//! Per-message execution context.
//!
//! A [`TxContext`] lives for exactly one message. Account writes are
//! buffered in a [`WriteBatch`] and reads see the buffer first, so a handler
//! observes its own writes. Plaintext ledger sends happen immediately and
//! are journaled. The keeper either commits the batch or replays the
//! journal backwards; nothing in between is ever visible.

use shield_protocol::config::{ModuleParams, MODULE_NAME};
use shield_protocol::storage::{Account, AccountKey, AccountStore, WriteBatch};
use tracing::error;

use crate::bank::{BankError, BankKeeper};
use crate::error::ConfidentialError;
use crate::events::Event;
use crate::gas::{GasError, GasMeter};
use crate::metrics::ModuleMetrics;

/// A plaintext ledger movement already executed by the current message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum BankOp {
    ToEscrow {
        from: String,
        denom: String,
        amount: u64,
    },
    FromEscrow {
        to: String,
        denom: String,
        amount: u64,
    },
}

pub struct TxContext<'a, S, B> {
    store: &'a S,
    bank: &'a mut B,
    params: &'a ModuleParams,
    gas: &'a mut GasMeter,
    metrics: &'a ModuleMetrics,
    writes: WriteBatch,
    events: Vec<Event>,
    journal: Vec<BankOp>,
}

/// What a finished context leaves behind for the keeper.
pub(crate) struct TxEffects {
    pub writes: WriteBatch,
    pub events: Vec<Event>,
    pub journal: Vec<BankOp>,
}

impl<'a, S: AccountStore, B: BankKeeper> TxContext<'a, S, B> {
    pub(crate) fn new(
        store: &'a S,
        bank: &'a mut B,
        params: &'a ModuleParams,
        gas: &'a mut GasMeter,
        metrics: &'a ModuleMetrics,
    ) -> Self {
        Self {
            store,
            bank,
            params,
            gas,
            metrics,
            writes: WriteBatch::new(),
            events: Vec::new(),
            journal: Vec::new(),
        }
    }

    pub fn params(&self) -> &ModuleParams {
        self.params
    }

    pub(crate) fn metrics(&self) -> &ModuleMetrics {
        self.metrics
    }

    // -- Accounts ------------------------------------------------------------

    /// Read an account, preferring this message's own pending writes.
    pub fn get_account(&self, key: &AccountKey) -> Result<Option<Account>, ConfidentialError> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.cloned()),
            None => Ok(self.store.get(key)?),
        }
    }

    pub fn require_account(&self, key: &AccountKey) -> Result<Account, ConfidentialError> {
        self.get_account(key)?
            .ok_or_else(|| ConfidentialError::AccountNotFound(key.clone()))
    }

    pub fn set_account(&mut self, key: AccountKey, account: Account) {
        self.writes.set(key, account);
    }

    pub fn delete_account(&mut self, key: AccountKey) {
        self.writes.delete(key);
    }

    // -- Plaintext ledger ----------------------------------------------------

    pub fn has_supply(&self, denom: &str) -> bool {
        self.bank.has_supply(denom)
    }

    /// Escrow `amount` from `from` into the module account.
    pub fn send_to_escrow(&mut self, from: &str, denom: &str, amount: u64) -> Result<(), BankError> {
        self.bank
            .send_coins_from_account_to_module(from, MODULE_NAME, denom, amount)?;
        self.journal.push(BankOp::ToEscrow {
            from: from.to_string(),
            denom: denom.to_string(),
            amount,
        });
        Ok(())
    }

    /// Release `amount` from the module account to `to`.
    pub fn send_from_escrow(&mut self, to: &str, denom: &str, amount: u64) -> Result<(), BankError> {
        self.bank
            .send_coins_from_module_to_account(MODULE_NAME, to, denom, amount)?;
        self.journal.push(BankOp::FromEscrow {
            to: to.to_string(),
            denom: denom.to_string(),
            amount,
        });
        Ok(())
    }

    // -- Gas & events --------------------------------------------------------

    pub fn consume_gas(&mut self, amount: u64, descriptor: &'static str) -> Result<(), GasError> {
        self.gas.consume(amount, descriptor)
    }

    /// Charge `ops` homomorphic ciphertext operations.
    pub fn charge_ciphertext_ops(
        &mut self,
        ops: u64,
        descriptor: &'static str,
    ) -> Result<(), GasError> {
        let cost = self.params.ciphertext_gas_cost.saturating_mul(ops);
        self.gas.consume(cost, descriptor)
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn into_effects(self) -> TxEffects {
        TxEffects {
            writes: self.writes,
            events: self.events,
            journal: self.journal,
        }
    }
}

/// Undo journaled plaintext ledger sends, newest first.
///
/// Messages run one at a time, so the funds a send moved are still where
/// it put them. A failure here means the ledger changed under us; it is
/// logged and the remaining entries are still attempted.
pub(crate) fn revert_journal<B: BankKeeper>(bank: &mut B, journal: Vec<BankOp>) {
    for op in journal.into_iter().rev() {
        let result = match &op {
            BankOp::ToEscrow {
                from,
                denom,
                amount,
            } => bank.send_coins_from_module_to_account(MODULE_NAME, from, denom, *amount),
            BankOp::FromEscrow { to, denom, amount } => {
                bank.send_coins_from_account_to_module(to, MODULE_NAME, denom, *amount)
            }
        };
        if let Err(e) = result {
            error!(?op, error = %e, "failed to revert plaintext ledger send");
        }
    }
}
