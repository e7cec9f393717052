//! The keeper over a sled-backed store: commits land on disk, rejected
//! messages leave nothing behind, and accounts survive a reopen.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

use shield_ledger::bank::MemoryBank;
use shield_ledger::client::AccountOwner;
use shield_ledger::gas::GasMeter;
use shield_ledger::keeper::{Keeper, MsgServer};
use shield_ledger::messages::{encode_address, Msg};
use shield_protocol::config::ModuleParams;
use shield_protocol::storage::{AccountKey, AccountStore, SledAccountStore};

const DENOM: &str = "usei";

fn deliver(
    keeper: &mut Keeper<SledAccountStore, MemoryBank>,
    msg: impl Into<Msg>,
) -> Result<()> {
    keeper.deliver(&mut GasMeter::infinite(), &msg.into())?;
    Ok(())
}

#[test]
fn accounts_persist_across_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("accounts");
    let mut rng = StdRng::seed_from_u64(7);

    let alice = AccountOwner::new(encode_address(&[1u8; 20])?, DENOM, b"alice")?;
    let bob = AccountOwner::new(encode_address(&[2u8; 20])?, DENOM, b"bob")?;

    let mut bank = MemoryBank::new();
    bank.mint(alice.address(), DENOM, 2_000)?;
    let store = SledAccountStore::open(&path)?;
    let mut keeper = Keeper::new(store, bank, ModuleParams::default())?;

    deliver(&mut keeper, alice.initialize_account(&mut rng)?)?;
    deliver(&mut keeper, bob.initialize_account(&mut rng)?)?;
    deliver(&mut keeper, alice.deposit(1_500))?;
    let account = keeper.account(alice.address(), DENOM)?.expect("alice");
    deliver(&mut keeper, alice.apply_pending_balance(&account, 16)?)?;

    let account = keeper.account(alice.address(), DENOM)?.expect("alice");
    let bob_pk = keeper.account(bob.address(), DENOM)?.expect("bob").public_key;
    let transfer = alice.transfer(&account, bob.address(), &bob_pk, 600, &[], &mut rng)?;
    deliver(&mut keeper, transfer.clone())?;

    // A replay is rejected and must not reach the disk.
    assert!(deliver(&mut keeper, transfer).is_err());

    let (store, _bank) = keeper.into_parts();
    assert_eq!(store.len(), 2);
    drop(store);

    let store = SledAccountStore::open(&path)?;
    let alice_account = store.require(&AccountKey::new(alice.address(), DENOM))?;
    let bob_account = store.require(&AccountKey::new(bob.address(), DENOM))?;
    assert_eq!(alice.decrypt_available(&alice_account, 16)?, 900);
    assert_eq!(bob.decrypt_pending(&bob_account, 16)?, 600);
    assert_eq!(bob_account.pending_balance_credit_counter, 1);
    Ok(())
}

#[test]
fn closed_account_is_deleted_on_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let mut rng = StdRng::seed_from_u64(8);
    let alice = AccountOwner::new(encode_address(&[1u8; 20])?, DENOM, b"alice")?;

    let mut bank = MemoryBank::new();
    bank.mint(alice.address(), DENOM, 1)?;
    let store = SledAccountStore::open(dir.path().join("accounts"))?;
    let mut keeper = Keeper::new(store, bank, ModuleParams::default())?;

    deliver(&mut keeper, alice.initialize_account(&mut rng)?)?;
    assert_eq!(keeper.accounts(alice.address())?.len(), 1);

    let account = keeper.account(alice.address(), DENOM)?.expect("alice");
    deliver(&mut keeper, alice.close_account(&account, &mut rng)?)?;
    assert!(keeper.accounts(alice.address())?.is_empty());
    assert!(keeper.store().is_empty());
    Ok(())
}
