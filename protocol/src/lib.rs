// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Shield Protocol: Confidential Balance Primitives
//!
//! Everything the confidential transfer module needs that is not a state
//! transition lives here: the encryption scheme, the zero-knowledge proofs
//! that make encrypted balances verifiable, the lo/hi balance codec, and the
//! account store the module persists into.
//!
//! The state machine in `shield-ledger` never sees a plaintext amount outside
//! the public deposit/withdraw boundary. It only ever combines ciphertexts and
//! checks proofs, and that is only sound if these primitives are.
//!
//! ## Architecture
//!
//! - **config**: Protocol constants and governance-tunable module params.
//! - **codec**: Split a 48-bit amount into 16-bit lo / 32-bit hi parts.
//! - **crypto**: Twisted ElGamal over Ristretto, AES-256-GCM for the
//!   owner-only balance cache.
//! - **zkp**: Sigma proofs and bit-decomposition range proofs with a
//!   SHA-512 Fiat-Shamir transcript.
//! - **storage**: The `Account` record and keyed stores (memory, sled).
//! - **logging**: `tracing` subscriber bootstrap.
//!
//! ## Determinism
//!
//! Randomness is only consumed by provers and encryptors, which run on the
//! client. Every verifier and every homomorphic operation is a pure function
//! of its inputs, so validators re-derive bit-identical results.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod logging;
pub mod storage;
pub mod zkp;
