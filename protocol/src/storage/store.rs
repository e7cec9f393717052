//! The [`AccountStore`] seam and the write batch both stores apply.

use std::collections::BTreeMap;

use super::account::{Account, AccountKey};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt account key: {0}")]
    CorruptKey(String),

    #[error("account not found: {0}")]
    NotFound(AccountKey),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Lazy, restartable scan over one address's accounts as `(denom, account)`.
pub type AccountIter<'a> = Box<dyn Iterator<Item = StoreResult<(String, Account)>> + 'a>;

/// Buffered account writes applied as one unit. `None` deletes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: BTreeMap<AccountKey, Option<Account>>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: AccountKey, account: Account) {
        self.writes.insert(key, Some(account));
    }

    pub fn delete(&mut self, key: AccountKey) {
        self.writes.insert(key, None);
    }

    /// `Some(None)` means the key is deleted in this batch; `None` means the
    /// batch does not touch it.
    pub fn get(&self, key: &AccountKey) -> Option<Option<&Account>> {
        self.writes.get(key).map(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

impl IntoIterator for WriteBatch {
    type Item = (AccountKey, Option<Account>);
    type IntoIter = std::collections::btree_map::IntoIter<AccountKey, Option<Account>>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

/// Keyed persistence of one [`Account`] per `(address, denom)`.
///
/// Stores carry no transactional semantics beyond [`apply_batch`], which
/// must land every write or none of them.
///
/// [`apply_batch`]: AccountStore::apply_batch
pub trait AccountStore {
    fn get(&self, key: &AccountKey) -> StoreResult<Option<Account>>;

    fn set(&mut self, key: AccountKey, account: Account) -> StoreResult<()>;

    fn delete(&mut self, key: &AccountKey) -> StoreResult<()>;

    /// Every account held by `address`, ordered by denom.
    fn iter_address<'a>(&'a self, address: &str) -> AccountIter<'a>;

    /// Apply all writes atomically.
    fn apply_batch(&mut self, batch: WriteBatch) -> StoreResult<()>;

    /// Like [`get`](AccountStore::get), but a missing account is an error.
    fn require(&self, key: &AccountKey) -> StoreResult<Account> {
        self.get(key)?
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    fn contains(&self, key: &AccountKey) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
