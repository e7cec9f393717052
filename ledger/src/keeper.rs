//! # Keeper & Message Handlers
//!
//! [`Keeper`] owns the account store, the plaintext ledger handle, the
//! module params and the metrics. [`MsgServer`] is the message surface:
//! one handler per operation, each running inside a fresh
//! [`TxContext`](crate::context::TxContext).
//!
//! ## Handler contract
//!
//! 1. Module enabled, message well formed.
//! 2. Existence checks on the accounts involved.
//! 3. Homomorphic arithmetic and proof verification, each charged to gas.
//! 4. Buffered writes and events.
//!
//! Any error from any step discards the buffered writes and replays the
//! plaintext ledger journal backwards, so a message that fails at step 4
//! looks exactly like one that failed at step 1. The state machine never
//! decrypts. Confidential-side insufficiency shows up as a range proof the
//! client could not produce.

use shield_protocol::codec;
use shield_protocol::config::{
    ModuleParams, HI_BITS, LO_BITS, MAX_PENDING_CREDITS, RANGE_PROOF_BITS,
};
use shield_protocol::crypto::{
    add_ciphertext, add_scalar, add_with_lo_hi, sub_scalar, sub_with_lo_hi, Ciphertext,
};
use shield_protocol::storage::{Account, AccountKey, AccountStore};
use tracing::{debug, error, info, warn};

use crate::bank::BankKeeper;
use crate::context::{revert_journal, TxContext, TxEffects};
use crate::error::ConfidentialError;
use crate::events::{
    Event, EventKind, ATTR_ADDRESS, ATTR_AUDITOR, ATTR_DENOM, ATTR_RECIPIENT, ATTR_SENDER,
};
use crate::gas::GasMeter;
use crate::messages::{
    Msg, MsgApplyPendingBalance, MsgCloseAccount, MsgDeposit, MsgInitializeAccount, MsgTransfer,
    MsgWithdraw,
};
use crate::metrics::{ModuleMetrics, OUTCOME_OK};

const ADD_SCALAR: &str = "add scalar";
const SUB_SCALAR: &str = "subtract scalar";
const ADD_CIPHERTEXT: &str = "add ciphertext";
const ADD_WITH_LO_HI: &str = "add with lo hi";
const SUB_WITH_LO_HI: &str = "sub with lo hi";

/// Successful delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgResponse {
    pub events: Vec<Event>,
    /// Gas charged by this message alone.
    pub gas_used: u64,
}

/// The six operations of the confidential transfer module.
pub trait MsgServer {
    fn initialize_account(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgInitializeAccount,
    ) -> Result<MsgResponse, ConfidentialError>;

    fn deposit(&mut self, gas: &mut GasMeter, msg: &MsgDeposit)
        -> Result<MsgResponse, ConfidentialError>;

    fn withdraw(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgWithdraw,
    ) -> Result<MsgResponse, ConfidentialError>;

    fn apply_pending_balance(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgApplyPendingBalance,
    ) -> Result<MsgResponse, ConfidentialError>;

    fn transfer(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgTransfer,
    ) -> Result<MsgResponse, ConfidentialError>;

    fn close_account(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgCloseAccount,
    ) -> Result<MsgResponse, ConfidentialError>;

    /// Route an envelope to its handler.
    fn deliver(&mut self, gas: &mut GasMeter, msg: &Msg) -> Result<MsgResponse, ConfidentialError> {
        match msg {
            Msg::InitializeAccount(m) => self.initialize_account(gas, m),
            Msg::Deposit(m) => self.deposit(gas, m),
            Msg::Withdraw(m) => self.withdraw(gas, m),
            Msg::ApplyPendingBalance(m) => self.apply_pending_balance(gas, m),
            Msg::Transfer(m) => self.transfer(gas, m),
            Msg::CloseAccount(m) => self.close_account(gas, m),
        }
    }

    /// Like [`deliver`](MsgServer::deliver), for a message signed by
    /// `signer`. Only the owner of an account may act on it.
    fn deliver_tx(
        &mut self,
        signer: &str,
        gas: &mut GasMeter,
        msg: &Msg,
    ) -> Result<MsgResponse, ConfidentialError> {
        if msg.signer() != signer {
            return Err(ConfidentialError::Unauthorized {
                signer: signer.to_string(),
                owner: msg.signer().to_string(),
            });
        }
        self.deliver(gas, msg)
    }
}

// ---------------------------------------------------------------------------
// Keeper
// ---------------------------------------------------------------------------

pub struct Keeper<S, B> {
    store: S,
    bank: B,
    params: ModuleParams,
    metrics: ModuleMetrics,
}

impl<S: AccountStore, B: BankKeeper> Keeper<S, B> {
    pub fn new(store: S, bank: B, params: ModuleParams) -> Result<Self, ConfidentialError> {
        let metrics = ModuleMetrics::new()?;
        Self::with_metrics(store, bank, params, metrics)
    }

    /// Build a keeper that reports into existing metric handles.
    pub fn with_metrics(
        store: S,
        bank: B,
        params: ModuleParams,
        metrics: ModuleMetrics,
    ) -> Result<Self, ConfidentialError> {
        params.validate()?;
        Ok(Self {
            store,
            bank,
            params,
            metrics,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access, bypassing every handler check. For genesis
    /// import and tests.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub fn params(&self) -> &ModuleParams {
        &self.params
    }

    pub fn set_params(&mut self, params: ModuleParams) -> Result<(), ConfidentialError> {
        params.validate()?;
        info!(enabled = params.enabled, "module params updated");
        self.params = params;
        Ok(())
    }

    pub fn metrics(&self) -> &ModuleMetrics {
        &self.metrics
    }

    pub fn account(&self, address: &str, denom: &str) -> Result<Option<Account>, ConfidentialError> {
        Ok(self.store.get(&AccountKey::new(address, denom))?)
    }

    /// Every confidential account held by `address`, as `(denom, account)`.
    pub fn accounts(&self, address: &str) -> Result<Vec<(String, Account)>, ConfidentialError> {
        self.store
            .iter_address(address)
            .map(|entry| entry.map_err(ConfidentialError::from))
            .collect()
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bank)
    }

    fn run<F>(
        &mut self,
        name: &'static str,
        gas: &mut GasMeter,
        handler: F,
    ) -> Result<MsgResponse, ConfidentialError>
    where
        F: FnOnce(&mut TxContext<'_, S, B>) -> Result<(), ConfidentialError>,
    {
        let gas_before = gas.consumed();
        let result = self.execute(gas, handler);
        let gas_used = gas.consumed() - gas_before;

        match result {
            Ok(events) => {
                self.metrics.record_message(name, OUTCOME_OK);
                Ok(MsgResponse { events, gas_used })
            }
            Err(e) => {
                let kind = e.kind().as_str();
                self.metrics.record_message(name, kind);
                warn!(msg = name, kind, gas_used, error = %e, "message rejected");
                Err(e)
            }
        }
    }

    fn execute<F>(&mut self, gas: &mut GasMeter, handler: F) -> Result<Vec<Event>, ConfidentialError>
    where
        F: FnOnce(&mut TxContext<'_, S, B>) -> Result<(), ConfidentialError>,
    {
        if !self.params.enabled {
            return Err(ConfidentialError::ModuleDisabled);
        }

        let mut ctx = TxContext::new(&self.store, &mut self.bank, &self.params, gas, &self.metrics);
        let outcome = handler(&mut ctx);
        let TxEffects {
            writes,
            events,
            journal,
        } = ctx.into_effects();

        if let Err(e) = outcome {
            revert_journal(&mut self.bank, journal);
            return Err(e);
        }
        if let Err(e) = self.store.apply_batch(writes) {
            error!(error = %e, "failed to commit account writes, reverting");
            revert_journal(&mut self.bank, journal);
            return Err(e.into());
        }
        Ok(events)
    }
}

impl<S: AccountStore, B: BankKeeper> MsgServer for Keeper<S, B> {
    fn initialize_account(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgInitializeAccount,
    ) -> Result<MsgResponse, ConfidentialError> {
        self.run("initialize_account", gas, |ctx| {
            msg.validate_basic()?;
            initialize_account(ctx, msg)
        })
    }

    fn deposit(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgDeposit,
    ) -> Result<MsgResponse, ConfidentialError> {
        self.run("deposit", gas, |ctx| {
            msg.validate_basic()?;
            deposit(ctx, msg)
        })
    }

    fn withdraw(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgWithdraw,
    ) -> Result<MsgResponse, ConfidentialError> {
        self.run("withdraw", gas, |ctx| {
            msg.validate_basic()?;
            withdraw(ctx, msg)
        })
    }

    fn apply_pending_balance(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgApplyPendingBalance,
    ) -> Result<MsgResponse, ConfidentialError> {
        self.run("apply_pending_balance", gas, |ctx| {
            msg.validate_basic()?;
            apply_pending_balance(ctx, msg)
        })
    }

    fn transfer(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgTransfer,
    ) -> Result<MsgResponse, ConfidentialError> {
        self.run("transfer", gas, |ctx| {
            msg.validate_basic()?;
            transfer(ctx, msg)
        })
    }

    fn close_account(
        &mut self,
        gas: &mut GasMeter,
        msg: &MsgCloseAccount,
    ) -> Result<MsgResponse, ConfidentialError> {
        self.run("close_account", gas, |ctx| {
            msg.validate_basic()?;
            close_account(ctx, msg)
        })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn initialize_account<S: AccountStore, B: BankKeeper>(
    ctx: &mut TxContext<'_, S, B>,
    msg: &MsgInitializeAccount,
) -> Result<(), ConfidentialError> {
    debug!(address = %msg.from_address, denom = %msg.denom, "initialize account");
    let key = AccountKey::new(&msg.from_address, &msg.denom);

    if ctx.get_account(&key)?.is_some() {
        return Err(ConfidentialError::AlreadyExists(key));
    }
    if !ctx.has_supply(&msg.denom) {
        return Err(ConfidentialError::DenomNotFound(msg.denom.clone()));
    }

    let pubkey = &msg.public_key;
    let proofs = &msg.proofs;
    ctx.verify_pubkey_validity(&proofs.pubkey_validity, pubkey, "invalid public key")?;
    ctx.verify_zero_balance(
        &proofs.zero_pending_balance_lo,
        pubkey,
        &msg.pending_balance_lo,
        "invalid pending balance lo",
    )?;
    ctx.verify_zero_balance(
        &proofs.zero_pending_balance_hi,
        pubkey,
        &msg.pending_balance_hi,
        "invalid pending balance hi",
    )?;
    ctx.verify_zero_balance(
        &proofs.zero_available_balance,
        pubkey,
        &msg.available_balance,
        "invalid available balance",
    )?;

    let account = Account::new(
        *pubkey,
        msg.pending_balance_lo,
        msg.pending_balance_hi,
        msg.available_balance,
        msg.decryptable_balance.clone(),
    );
    ctx.set_account(key, account);
    ctx.emit(
        Event::new(EventKind::InitializeAccount)
            .with(ATTR_ADDRESS, &msg.from_address)
            .with(ATTR_DENOM, &msg.denom),
    );
    info!(address = %msg.from_address, denom = %msg.denom, "account initialized");
    Ok(())
}

fn deposit<S: AccountStore, B: BankKeeper>(
    ctx: &mut TxContext<'_, S, B>,
    msg: &MsgDeposit,
) -> Result<(), ConfidentialError> {
    debug!(address = %msg.from_address, denom = %msg.denom, "deposit");
    let key = AccountKey::new(&msg.from_address, &msg.denom);
    let mut account = ctx.require_account(&key)?;

    let (lo, hi) = codec::split(msg.amount)?;
    if account.pending_balance_credit_counter == MAX_PENDING_CREDITS {
        return Err(ConfidentialError::TooManyPendingTransactions(key));
    }

    ctx.send_to_escrow(&msg.from_address, &msg.denom, msg.amount)
        .map_err(ConfidentialError::InsufficientFunds)?;

    ctx.charge_ciphertext_ops(1, ADD_SCALAR)?;
    account.pending_balance_lo = add_scalar(&account.pending_balance_lo, u64::from(lo));
    ctx.charge_ciphertext_ops(1, ADD_SCALAR)?;
    account.pending_balance_hi = add_scalar(&account.pending_balance_hi, u64::from(hi));
    account.pending_balance_credit_counter += 1;

    ctx.set_account(key, account);
    ctx.emit(
        Event::new(EventKind::Deposit)
            .with(ATTR_ADDRESS, &msg.from_address)
            .with(ATTR_DENOM, &msg.denom),
    );
    info!(address = %msg.from_address, denom = %msg.denom, "deposit credited to pending balance");
    Ok(())
}

fn withdraw<S: AccountStore, B: BankKeeper>(
    ctx: &mut TxContext<'_, S, B>,
    msg: &MsgWithdraw,
) -> Result<(), ConfidentialError> {
    debug!(address = %msg.from_address, denom = %msg.denom, "withdraw");
    let key = AccountKey::new(&msg.from_address, &msg.denom);
    let mut account = ctx.require_account(&key)?;

    ctx.verify_range(
        &msg.proofs.range,
        &msg.new_available_commitment,
        RANGE_PROOF_BITS,
        "range proof verification failed",
    )?;

    ctx.charge_ciphertext_ops(1, SUB_SCALAR)?;
    let remaining = sub_scalar(&account.available_balance, msg.amount);
    ctx.verify_ciphertext_commitment_equality(
        &msg.proofs.equality,
        &account.public_key,
        &remaining,
        &msg.new_available_commitment,
        "ciphertext commitment equality verification failed",
    )?;

    account.available_balance = remaining;
    account.decryptable_available_balance = msg.new_decryptable_balance.clone();
    ctx.set_account(key, account);

    ctx.send_from_escrow(&msg.from_address, &msg.denom, msg.amount)
        .map_err(|e| {
            error!(denom = %msg.denom, error = %e, "escrow cannot cover a proven withdrawal");
            ConfidentialError::InsufficientEscrowFunds(e)
        })?;

    ctx.emit(
        Event::new(EventKind::Withdraw)
            .with(ATTR_ADDRESS, &msg.from_address)
            .with(ATTR_DENOM, &msg.denom),
    );
    info!(address = %msg.from_address, denom = %msg.denom, "withdrawal released from escrow");
    Ok(())
}

fn apply_pending_balance<S: AccountStore, B: BankKeeper>(
    ctx: &mut TxContext<'_, S, B>,
    msg: &MsgApplyPendingBalance,
) -> Result<(), ConfidentialError> {
    debug!(address = %msg.address, denom = %msg.denom, "apply pending balance");
    let key = AccountKey::new(&msg.address, &msg.denom);
    let mut account = ctx.require_account(&key)?;

    if !account.has_pending_credits() {
        return Err(ConfidentialError::NoPendingBalance(key));
    }

    // lo, hi shift, add
    ctx.charge_ciphertext_ops(3, ADD_WITH_LO_HI)?;
    account.available_balance = add_with_lo_hi(
        &account.available_balance,
        &account.pending_balance_lo,
        &account.pending_balance_hi,
    );
    account.pending_balance_lo = Ciphertext::zero();
    account.pending_balance_hi = Ciphertext::zero();
    account.pending_balance_credit_counter = 0;
    account.decryptable_available_balance = msg.new_decryptable_available_balance.clone();

    ctx.set_account(key, account);
    ctx.emit(
        Event::new(EventKind::ApplyPendingBalance)
            .with(ATTR_ADDRESS, &msg.address)
            .with(ATTR_DENOM, &msg.denom),
    );
    info!(address = %msg.address, denom = %msg.denom, "pending balance applied");
    Ok(())
}

fn transfer<S: AccountStore, B: BankKeeper>(
    ctx: &mut TxContext<'_, S, B>,
    msg: &MsgTransfer,
) -> Result<(), ConfidentialError> {
    debug!(
        sender = %msg.from_address,
        recipient = %msg.to_address,
        denom = %msg.denom,
        auditors = msg.auditors.len(),
        "transfer"
    );
    let max_auditors = ctx.params().max_auditors;
    if msg.auditors.len() > max_auditors {
        return Err(ConfidentialError::TooManyAuditors {
            count: msg.auditors.len(),
            max: max_auditors,
        });
    }

    let sender_key = AccountKey::new(&msg.from_address, &msg.denom);
    let recipient_key = AccountKey::new(&msg.to_address, &msg.denom);
    let mut sender = ctx.require_account(&sender_key)?;
    let mut recipient = ctx.require_account(&recipient_key)?;
    let proofs = &msg.proofs;

    // Each amount ciphertext is well formed under its declared key.
    ctx.verify_ciphertext_validity(
        &proofs.sender_amount_lo_validity,
        &sender.public_key,
        &msg.sender_amount_lo,
        "invalid sender amount lo",
    )?;
    ctx.verify_ciphertext_validity(
        &proofs.sender_amount_hi_validity,
        &sender.public_key,
        &msg.sender_amount_hi,
        "invalid sender amount hi",
    )?;
    ctx.verify_ciphertext_validity(
        &proofs.recipient_amount_lo_validity,
        &recipient.public_key,
        &msg.recipient_amount_lo,
        "invalid recipient amount lo",
    )?;
    ctx.verify_ciphertext_validity(
        &proofs.recipient_amount_hi_validity,
        &recipient.public_key,
        &msg.recipient_amount_hi,
        "invalid recipient amount hi",
    )?;

    // The amount itself is non-negative and within 48 bits.
    ctx.verify_range(
        &proofs.amount_lo_range,
        &msg.sender_amount_lo.pedersen(),
        LO_BITS as usize,
        "transfer amount lo out of range",
    )?;
    ctx.verify_range(
        &proofs.amount_hi_range,
        &msg.sender_amount_hi.pedersen(),
        HI_BITS as usize,
        "transfer amount hi out of range",
    )?;

    // Both sides hold the same amount.
    ctx.verify_ciphertext_ciphertext_equality(
        &proofs.amount_lo_equality,
        &sender.public_key,
        &recipient.public_key,
        &msg.sender_amount_lo,
        &msg.recipient_amount_lo,
        "sender and recipient amount lo differ",
    )?;
    ctx.verify_ciphertext_ciphertext_equality(
        &proofs.amount_hi_equality,
        &sender.public_key,
        &recipient.public_key,
        &msg.sender_amount_hi,
        &msg.recipient_amount_hi,
        "sender and recipient amount hi differ",
    )?;

    // The sender can afford it.
    ctx.charge_ciphertext_ops(3, SUB_WITH_LO_HI)?;
    let remaining = sub_with_lo_hi(
        &sender.available_balance,
        &msg.sender_amount_lo,
        &msg.sender_amount_hi,
    );
    ctx.verify_range(
        &proofs.remaining_balance_range,
        &msg.remaining_balance_commitment,
        RANGE_PROOF_BITS,
        "remaining balance range proof verification failed",
    )?;
    ctx.verify_ciphertext_commitment_equality(
        &proofs.remaining_balance_equality,
        &sender.public_key,
        &remaining,
        &msg.remaining_balance_commitment,
        "remaining balance equality verification failed",
    )?;

    for auditor in &msg.auditors {
        let auditor_key = AccountKey::new(&auditor.address, &msg.denom);
        let auditor_pubkey = ctx.require_account(&auditor_key)?.public_key;
        ctx.verify_ciphertext_validity(
            &auditor.amount_lo_validity,
            &auditor_pubkey,
            &auditor.amount_lo,
            "invalid auditor amount lo",
        )?;
        ctx.verify_ciphertext_validity(
            &auditor.amount_hi_validity,
            &auditor_pubkey,
            &auditor.amount_hi,
            "invalid auditor amount hi",
        )?;
        ctx.verify_ciphertext_ciphertext_equality(
            &auditor.amount_lo_equality,
            &sender.public_key,
            &auditor_pubkey,
            &msg.sender_amount_lo,
            &auditor.amount_lo,
            "auditor amount lo differs from transfer amount",
        )?;
        ctx.verify_ciphertext_ciphertext_equality(
            &auditor.amount_hi_equality,
            &sender.public_key,
            &auditor_pubkey,
            &msg.sender_amount_hi,
            &auditor.amount_hi,
            "auditor amount hi differs from transfer amount",
        )?;
    }

    sender.available_balance = remaining;
    sender.decryptable_available_balance = msg.decryptable_balance.clone();
    ctx.set_account(sender_key, sender);

    if recipient.pending_balance_credit_counter == MAX_PENDING_CREDITS {
        return Err(ConfidentialError::TooManyPendingTransactions(recipient_key));
    }
    ctx.charge_ciphertext_ops(1, ADD_CIPHERTEXT)?;
    recipient.pending_balance_lo =
        add_ciphertext(&recipient.pending_balance_lo, &msg.recipient_amount_lo);
    ctx.charge_ciphertext_ops(1, ADD_CIPHERTEXT)?;
    recipient.pending_balance_hi =
        add_ciphertext(&recipient.pending_balance_hi, &msg.recipient_amount_hi);
    recipient.pending_balance_credit_counter += 1;
    ctx.set_account(recipient_key, recipient);

    let mut event = Event::new(EventKind::Transfer)
        .with(ATTR_SENDER, &msg.from_address)
        .with(ATTR_RECIPIENT, &msg.to_address)
        .with(ATTR_DENOM, &msg.denom);
    for auditor in &msg.auditors {
        event = event.with(ATTR_AUDITOR, &auditor.address);
    }
    ctx.emit(event);
    info!(
        sender = %msg.from_address,
        recipient = %msg.to_address,
        denom = %msg.denom,
        "transfer credited to recipient pending balance"
    );
    Ok(())
}

fn close_account<S: AccountStore, B: BankKeeper>(
    ctx: &mut TxContext<'_, S, B>,
    msg: &MsgCloseAccount,
) -> Result<(), ConfidentialError> {
    debug!(address = %msg.address, denom = %msg.denom, "close account");
    let key = AccountKey::new(&msg.address, &msg.denom);
    let account = ctx.require_account(&key)?;
    let proofs = &msg.proofs;

    ctx.verify_zero_balance(
        &proofs.zero_pending_balance_lo,
        &account.public_key,
        &account.pending_balance_lo,
        "pending balance lo must be 0",
    )?;
    ctx.verify_zero_balance(
        &proofs.zero_pending_balance_hi,
        &account.public_key,
        &account.pending_balance_hi,
        "pending balance hi must be 0",
    )?;
    ctx.verify_zero_balance(
        &proofs.zero_available_balance,
        &account.public_key,
        &account.available_balance,
        "available balance must be 0",
    )?;

    ctx.delete_account(key);
    ctx.emit(
        Event::new(EventKind::CloseAccount)
            .with(ATTR_ADDRESS, &msg.address)
            .with(ATTR_DENOM, &msg.denom),
    );
    info!(address = %msg.address, denom = %msg.denom, "account closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::MemoryBank;
    use crate::client::AccountOwner;
    use crate::error::ErrorKind;
    use crate::messages::encode_address;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shield_protocol::config::MODULE_NAME;
    use shield_protocol::storage::MemoryAccountStore;

    const DENOM: &str = "uatom";

    fn setup() -> (Keeper<MemoryAccountStore, MemoryBank>, AccountOwner, StdRng) {
        let address = encode_address(&[1u8; 20]).unwrap();
        let mut bank = MemoryBank::new();
        bank.mint(&address, DENOM, 10_000).unwrap();
        let keeper =
            Keeper::new(MemoryAccountStore::new(), bank, ModuleParams::default()).unwrap();
        let owner = AccountOwner::new(address, DENOM, b"seed-1").unwrap();
        (keeper, owner, StdRng::seed_from_u64(42))
    }

    #[test]
    fn initialize_then_duplicate_conflicts() {
        let (mut keeper, owner, mut rng) = setup();
        let msg = owner.initialize_account(&mut rng).unwrap();
        let response = keeper
            .initialize_account(&mut GasMeter::infinite(), &msg)
            .unwrap();
        assert_eq!(response.events[0].kind, EventKind::InitializeAccount);
        assert_eq!(
            response.gas_used,
            4 * keeper.params().proof_verification_gas_cost
        );

        let err = keeper
            .initialize_account(&mut GasMeter::infinite(), &msg)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn unknown_denom_rejected() {
        let (mut keeper, _, mut rng) = setup();
        let owner = AccountOwner::new(encode_address(&[1u8; 20]).unwrap(), "uosmo", b"seed-1")
            .unwrap();
        let msg = owner.initialize_account(&mut rng).unwrap();
        let err = keeper
            .initialize_account(&mut GasMeter::infinite(), &msg)
            .unwrap_err();
        assert!(matches!(err, ConfidentialError::DenomNotFound(_)));
    }

    #[test]
    fn deposit_moves_plaintext_into_escrow() {
        let (mut keeper, owner, mut rng) = setup();
        let init = owner.initialize_account(&mut rng).unwrap();
        keeper
            .initialize_account(&mut GasMeter::infinite(), &init)
            .unwrap();

        keeper
            .deposit(&mut GasMeter::infinite(), &owner.deposit(700))
            .unwrap();
        assert_eq!(keeper.bank().get_balance(owner.address(), DENOM), 9_300);
        assert_eq!(keeper.bank().get_module_balance(MODULE_NAME, DENOM), 700);

        let account = keeper.account(owner.address(), DENOM).unwrap().unwrap();
        assert_eq!(account.pending_balance_credit_counter, 1);
        assert_eq!(owner.decrypt_pending(&account, 16).unwrap(), 700);
        assert_eq!(owner.decrypt_available(&account, 16).unwrap(), 0);
    }

    #[test]
    fn deposit_without_account_not_found() {
        let (mut keeper, owner, _) = setup();
        let err = keeper
            .deposit(&mut GasMeter::infinite(), &owner.deposit(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(keeper.bank().get_balance(owner.address(), DENOM), 10_000);
    }

    #[test]
    fn apply_without_pending_rejected() {
        let (mut keeper, owner, mut rng) = setup();
        let init = owner.initialize_account(&mut rng).unwrap();
        keeper
            .initialize_account(&mut GasMeter::infinite(), &init)
            .unwrap();
        let account = keeper.account(owner.address(), DENOM).unwrap().unwrap();
        let msg = owner.apply_pending_balance(&account, 16).unwrap();
        let err = keeper
            .apply_pending_balance(&mut GasMeter::infinite(), &msg)
            .unwrap_err();
        assert!(matches!(err, ConfidentialError::NoPendingBalance(_)));
    }

    #[test]
    fn disabled_module_rejects_everything() {
        let (mut keeper, owner, mut rng) = setup();
        keeper
            .set_params(ModuleParams {
                enabled: false,
                ..ModuleParams::default()
            })
            .unwrap();
        let msg: Msg = owner.initialize_account(&mut rng).unwrap().into();
        let err = keeper.deliver(&mut GasMeter::infinite(), &msg).unwrap_err();
        assert!(matches!(err, ConfidentialError::ModuleDisabled));
        assert_eq!(
            keeper
                .metrics()
                .message_count("initialize_account", "unauthorized"),
            1
        );
    }

    fn funded(
        keeper: &mut Keeper<MemoryAccountStore, MemoryBank>,
        owner: &AccountOwner,
        rng: &mut StdRng,
        amount: u64,
    ) -> Account {
        let init = owner.initialize_account(rng).unwrap();
        keeper
            .initialize_account(&mut GasMeter::infinite(), &init)
            .unwrap();
        keeper
            .deposit(&mut GasMeter::infinite(), &owner.deposit(amount))
            .unwrap();
        let account = keeper.account(owner.address(), DENOM).unwrap().unwrap();
        let apply = owner.apply_pending_balance(&account, 16).unwrap();
        keeper
            .apply_pending_balance(&mut GasMeter::infinite(), &apply)
            .unwrap();
        keeper.account(owner.address(), DENOM).unwrap().unwrap()
    }

    fn assert_missing_cache(err: ConfidentialError, field: &str) {
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(
            matches!(err, ConfidentialError::MissingDecryptableBalance(f) if f == field),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn initialize_without_decryptable_balance_rejected() {
        let (mut keeper, owner, mut rng) = setup();
        let mut msg = owner.initialize_account(&mut rng).unwrap();
        msg.decryptable_balance.clear();
        let err = keeper
            .initialize_account(&mut GasMeter::infinite(), &msg)
            .unwrap_err();
        assert_missing_cache(err, "decryptable balance");
        assert!(keeper.account(owner.address(), DENOM).unwrap().is_none());
    }

    #[test]
    fn withdraw_without_decryptable_balance_rejected() {
        let (mut keeper, owner, mut rng) = setup();
        let before = funded(&mut keeper, &owner, &mut rng, 500);
        let mut msg = owner.withdraw(&before, 200, &mut rng).unwrap();
        msg.new_decryptable_balance.clear();
        let err = keeper
            .withdraw(&mut GasMeter::infinite(), &msg)
            .unwrap_err();
        assert_missing_cache(err, "new decryptable balance");
        assert_eq!(
            keeper.account(owner.address(), DENOM).unwrap().unwrap(),
            before
        );
        assert_eq!(keeper.bank().get_balance(owner.address(), DENOM), 9_500);
    }

    #[test]
    fn apply_without_decryptable_balance_keeps_client_usable() {
        let (mut keeper, owner, mut rng) = setup();
        let init = owner.initialize_account(&mut rng).unwrap();
        keeper
            .initialize_account(&mut GasMeter::infinite(), &init)
            .unwrap();
        keeper
            .deposit(&mut GasMeter::infinite(), &owner.deposit(300))
            .unwrap();
        let account = keeper.account(owner.address(), DENOM).unwrap().unwrap();
        let mut msg = owner.apply_pending_balance(&account, 16).unwrap();
        msg.new_decryptable_available_balance.clear();
        let err = keeper
            .apply_pending_balance(&mut GasMeter::infinite(), &msg)
            .unwrap_err();
        assert_missing_cache(err, "new decryptable available balance");

        // The stored cache is still readable, so the owner can retry.
        let account = keeper.account(owner.address(), DENOM).unwrap().unwrap();
        assert_eq!(owner.cached_available(&account).unwrap(), 0);
        let retry = owner.apply_pending_balance(&account, 16).unwrap();
        keeper
            .apply_pending_balance(&mut GasMeter::infinite(), &retry)
            .unwrap();
        let account = keeper.account(owner.address(), DENOM).unwrap().unwrap();
        assert_eq!(owner.cached_available(&account).unwrap(), 300);
    }

    #[test]
    fn transfer_without_decryptable_balance_rejected() {
        let (mut keeper, owner, mut rng) = setup();
        let recipient =
            AccountOwner::new(encode_address(&[2u8; 20]).unwrap(), DENOM, b"seed-2").unwrap();
        let init = recipient.initialize_account(&mut rng).unwrap();
        keeper
            .initialize_account(&mut GasMeter::infinite(), &init)
            .unwrap();
        let before = funded(&mut keeper, &owner, &mut rng, 800);

        let mut msg = owner
            .transfer(
                &before,
                recipient.address(),
                recipient.public_key(),
                250,
                &[],
                &mut rng,
            )
            .unwrap();
        msg.decryptable_balance.clear();
        let err = keeper
            .transfer(&mut GasMeter::infinite(), &msg)
            .unwrap_err();
        assert_missing_cache(err, "decryptable balance");
        assert_eq!(
            keeper.account(owner.address(), DENOM).unwrap().unwrap(),
            before
        );
        let to = keeper
            .account(recipient.address(), DENOM)
            .unwrap()
            .unwrap();
        assert_eq!(to.pending_balance_credit_counter, 0);
    }

    #[test]
    fn foreign_signer_unauthorized() {
        let (mut keeper, owner, _) = setup();
        let msg: Msg = owner.deposit(5).into();
        let other = encode_address(&[2u8; 20]).unwrap();
        let err = keeper
            .deliver_tx(&other, &mut GasMeter::infinite(), &msg)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}
