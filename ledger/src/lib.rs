// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Shield Ledger: Confidential Transfer Module
//!
//! The state machine that moves encrypted balances. It never decrypts
//! anything: every state transition is gated on zero-knowledge proofs bound
//! to the ciphertexts currently stored on chain, and plaintext tokens only
//! appear at the deposit/withdraw boundary, where they are escrowed in the
//! module account on the plaintext ledger.
//!
//! ## Architecture
//!
//! - **messages**: The six messages and their proof bundles.
//! - **keeper**: `Keeper` and the `MsgServer` handlers.
//! - **context**: Per-message buffered writes and rollback journal.
//! - **proofs**: Proof verification glue: gas, metrics, typed errors.
//! - **bank**: Plaintext ledger seam and an in-memory implementation.
//! - **gas**: Per-message gas meter.
//! - **events**: Amount-free observability events.
//! - **metrics**: Prometheus counters.
//! - **client**: Wallet-side message builders.
//! - **error**: `ConfidentialError` and its taxonomy.
//!
//! ## Execution model
//!
//! Messages are applied one at a time. A message either commits all of its
//! account writes and token movements or leaves no trace.

pub mod bank;
pub mod client;
pub mod context;
pub mod error;
pub mod events;
pub mod gas;
pub mod keeper;
pub mod messages;
pub mod metrics;
pub mod proofs;

pub use bank::{BankError, BankKeeper, MemoryBank};
pub use client::{AccountOwner, ClientError};
pub use error::{ConfidentialError, ErrorKind};
pub use events::{Event, EventKind};
pub use gas::{GasError, GasMeter};
pub use keeper::{Keeper, MsgResponse, MsgServer};
pub use messages::Msg;
pub use metrics::ModuleMetrics;
