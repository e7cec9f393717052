//! # SledAccountStore: Persistent Account Storage
//!
//! Accounts live in a single sled tree. Keys are length-prefixed so that
//! all accounts of one address form a contiguous key range:
//!
//! | Tree                    | Key                                        | Value              |
//! |-------------------------|--------------------------------------------|--------------------|
//! | `confidential_accounts` | `len(address)` (2B BE) `‖ address ‖ denom` | `bincode(Account)` |
//!
//! Without the length prefix, the prefix scan for `shield1abc` would also
//! return the accounts of `shield1abcd`.
//!
//! ## Atomicity
//!
//! [`AccountStore::apply_batch`] turns a [`WriteBatch`] into one sled
//! `Batch` and flushes it. Either every account write of a message lands
//! on disk or none does.

use sled::{Batch, Db, Tree};
use std::path::Path;
use tracing::debug;

use super::account::{Account, AccountKey};
use super::store::{AccountIter, AccountStore, StoreError, StoreResult, WriteBatch};

const ACCOUNTS_TREE: &str = "confidential_accounts";

// ---------------------------------------------------------------------------
// Key Encoding
// ---------------------------------------------------------------------------

fn address_prefix(address: &str) -> StoreResult<Vec<u8>> {
    let len = u16::try_from(address.len())
        .map_err(|_| StoreError::CorruptKey(format!("address too long: {} bytes", address.len())))?;
    let mut out = Vec::with_capacity(2 + address.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(address.as_bytes());
    Ok(out)
}

fn encode_key(key: &AccountKey) -> StoreResult<Vec<u8>> {
    let mut out = address_prefix(&key.address)?;
    out.extend_from_slice(key.denom.as_bytes());
    Ok(out)
}

fn decode_key(bytes: &[u8]) -> StoreResult<AccountKey> {
    let corrupt = || StoreError::CorruptKey(hex::encode(bytes));
    if bytes.len() < 2 {
        return Err(corrupt());
    }
    let len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    let rest = &bytes[2..];
    if rest.len() < len {
        return Err(corrupt());
    }
    let (address, denom) = rest.split_at(len);
    let address = std::str::from_utf8(address).map_err(|_| corrupt())?;
    let denom = std::str::from_utf8(denom).map_err(|_| corrupt())?;
    Ok(AccountKey::new(address, denom))
}

fn encode_account(account: &Account) -> StoreResult<Vec<u8>> {
    bincode::serialize(account).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_account(bytes: &[u8]) -> StoreResult<Account> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// SledAccountStore
// ---------------------------------------------------------------------------

/// sled-backed [`AccountStore`].
///
/// Cloning is cheap and clones share the same underlying database.
#[derive(Debug, Clone)]
pub struct SledAccountStore {
    db: Db,
    accounts: Tree,
}

impl SledAccountStore {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening account store");
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary store that is removed when dropped.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let accounts = db.open_tree(ACCOUNTS_TREE)?;
        Ok(Self { db, accounts })
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl AccountStore for SledAccountStore {
    fn get(&self, key: &AccountKey) -> StoreResult<Option<Account>> {
        match self.accounts.get(encode_key(key)?)? {
            Some(bytes) => Ok(Some(decode_account(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: AccountKey, account: Account) -> StoreResult<()> {
        self.accounts
            .insert(encode_key(&key)?, encode_account(&account)?)?;
        Ok(())
    }

    fn delete(&mut self, key: &AccountKey) -> StoreResult<()> {
        self.accounts.remove(encode_key(key)?)?;
        Ok(())
    }

    fn iter_address<'a>(&'a self, address: &str) -> AccountIter<'a> {
        let prefix = match address_prefix(address) {
            Ok(prefix) => prefix,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };
        Box::new(self.accounts.scan_prefix(prefix).map(|entry| -> StoreResult<(String, Account)> {
            let (key, value) = entry?;
            let key = decode_key(&key)?;
            Ok((key.denom, decode_account(&value)?))
        }))
    }

    fn apply_batch(&mut self, batch: WriteBatch) -> StoreResult<()> {
        let mut sled_batch = Batch::default();
        let writes = batch.len();
        for (key, write) in batch {
            let key = encode_key(&key)?;
            match write {
                Some(account) => sled_batch.insert(key, encode_account(&account)?),
                None => sled_batch.remove(key),
            }
        }
        self.accounts.apply_batch(sled_batch)?;
        self.db.flush()?;
        debug!(writes, "applied account batch");
        Ok(())
    }
}
