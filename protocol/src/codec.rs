//! # Balance Codec
//!
//! Confidential amounts are never encrypted as one 48-bit value. They are
//! split into a 16-bit `lo` part and a 32-bit `hi` part, each encrypted on
//! its own, so that every ciphertext the chain touches stays inside a range
//! that is cheap to prove and feasible to decrypt.
//!
//! ```text
//! amount = (hi << 16) + lo        lo < 2^16, hi < 2^32
//! ```
//!
//! Pending balances accumulate many credits per part, so after decryption
//! `lo` may exceed 16 bits. [`combine_pending`] accepts that; [`combine`]
//! does not.

use thiserror::Error;

use crate::config::{HI_BITS, LO_BITS, MAX_TRANSFER_AMOUNT};

/// Errors raised by the balance codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The amount does not fit into `LO_BITS + HI_BITS` bits.
    #[error("amount {0} exceeds the maximum of {MAX_TRANSFER_AMOUNT}")]
    AmountTooLarge(u64),

    /// Recombining decrypted pending parts overflowed a `u64`.
    #[error("combined pending balance overflows")]
    Overflow,
}

const LO_MASK: u64 = (1 << LO_BITS) - 1;
const HI_MASK: u64 = (1 << HI_BITS) - 1;

/// Split an amount into its `(lo, hi)` parts.
pub fn split(amount: u64) -> Result<(u16, u32), CodecError> {
    if amount > MAX_TRANSFER_AMOUNT {
        return Err(CodecError::AmountTooLarge(amount));
    }
    let lo = (amount & LO_MASK) as u16;
    let hi = ((amount >> LO_BITS) & HI_MASK) as u32;
    Ok((lo, hi))
}

/// Exact inverse of [`split`].
pub fn combine(lo: u16, hi: u32) -> u64 {
    (u64::from(hi) << LO_BITS) | u64::from(lo)
}

/// Recombine two decrypted pending parts.
///
/// Unlike [`combine`], `lo` here is the sum of up to `MAX_PENDING_CREDITS`
/// 16-bit credits and so may be wider than 16 bits.
pub fn combine_pending(decrypted_lo: u64, decrypted_hi: u64) -> Result<u64, CodecError> {
    decrypted_hi
        .checked_mul(1 << LO_BITS)
        .and_then(|hi| hi.checked_add(decrypted_lo))
        .ok_or(CodecError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_small_amount() {
        assert_eq!(split(500).unwrap(), (500, 0));
        assert_eq!(split(0).unwrap(), (0, 0));
    }

    #[test]
    fn split_crosses_lo_boundary() {
        assert_eq!(split(65_535).unwrap(), (65_535, 0));
        assert_eq!(split(65_536).unwrap(), (0, 1));
        assert_eq!(split(70_000).unwrap(), (4_464, 1));
    }

    #[test]
    fn split_max_amount() {
        let max = (1u64 << 48) - 1;
        let (lo, hi) = split(max).unwrap();
        assert_eq!(lo, u16::MAX);
        assert_eq!(hi, u32::MAX);
        assert_eq!(combine(lo, hi), max);
    }

    #[test]
    fn split_rejects_2_pow_48() {
        assert_eq!(split(1 << 48), Err(CodecError::AmountTooLarge(1 << 48)));
        assert!(split(u64::MAX).is_err());
    }

    #[test]
    fn combine_inverts_split() {
        for amount in [1u64, 255, 65_537, 1 << 32, 123_456_789_012] {
            let (lo, hi) = split(amount).unwrap();
            assert_eq!(combine(lo, hi), amount);
        }
    }

    #[test]
    fn combine_pending_accepts_wide_lo() {
        // Two credits of 40_000 each push lo past 16 bits.
        assert_eq!(combine_pending(80_000, 0).unwrap(), 80_000);
        assert_eq!(combine_pending(1, 2).unwrap(), 131_073);
    }

    #[test]
    fn combine_pending_detects_overflow() {
        assert_eq!(combine_pending(0, u64::MAX), Err(CodecError::Overflow));
        assert_eq!(
            combine_pending(u64::MAX, 1),
            Err(CodecError::Overflow)
        );
    }
}
