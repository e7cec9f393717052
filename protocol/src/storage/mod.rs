//! # Account Storage
//!
//! One [`Account`] per `(address, denom)`, behind the [`AccountStore`]
//! trait so the state machine does not care where records live.
//!
//! ```text
//! account.rs - Account record and AccountKey
//! store.rs - AccountStore trait, WriteBatch, StoreError
//! memory.rs - BTreeMap-backed store (tests, simulation)
//! db.rs - sled-backed store with prefix-scannable keys
//! ```
//!
//! Values are bincode on disk. Stores do not provide transactions of their
//! own: the ledger buffers a message's writes and hands them over as a
//! single [`WriteBatch`].

pub mod account;
pub mod db;
pub mod memory;
pub mod store;

pub use account::{Account, AccountKey};
pub use db::SledAccountStore;
pub use memory::MemoryAccountStore;
pub use store::{AccountIter, AccountStore, StoreError, StoreResult, WriteBatch};
