//! In-memory [`AccountStore`] for tests and simulations.

use std::collections::BTreeMap;

use super::account::{Account, AccountKey};
use super::store::{AccountIter, AccountStore, StoreResult, WriteBatch};

#[derive(Clone, Debug, Default)]
pub struct MemoryAccountStore {
    accounts: BTreeMap<AccountKey, Account>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for MemoryAccountStore {
    fn get(&self, key: &AccountKey) -> StoreResult<Option<Account>> {
        Ok(self.accounts.get(key).cloned())
    }

    fn set(&mut self, key: AccountKey, account: Account) -> StoreResult<()> {
        self.accounts.insert(key, account);
        Ok(())
    }

    fn delete(&mut self, key: &AccountKey) -> StoreResult<()> {
        self.accounts.remove(key);
        Ok(())
    }

    fn iter_address<'a>(&'a self, address: &str) -> AccountIter<'a> {
        let owner = address.to_string();
        let start = AccountKey::new(address, "");
        Box::new(
            self.accounts
                .range(start..)
                .take_while(move |(key, _)| key.address == owner)
                .map(|(key, account)| Ok((key.denom.clone(), account.clone()))),
        )
    }

    fn apply_batch(&mut self, batch: WriteBatch) -> StoreResult<()> {
        for (key, write) in batch {
            match write {
                Some(account) => {
                    self.accounts.insert(key, account);
                }
                None => {
                    self.accounts.remove(&key);
                }
            }
        }
        Ok(())
    }
}
