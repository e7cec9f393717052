//! Gas metering.
//!
//! Proof verification is pure CPU work, so it is paid for up front: every
//! handler charges the meter before each homomorphic operation and each
//! proof it checks. A message that runs out of gas fails like any other
//! rejected message, with no state change. Gas consumed before the
//! failure stays consumed.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("out of gas charging {descriptor}: limit {limit}, required {required}")]
pub struct GasError {
    pub descriptor: &'static str,
    pub limit: u64,
    pub required: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    consumed: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    /// A meter that never runs out.
    pub fn infinite() -> Self {
        Self::new(u64::MAX)
    }

    /// Charge `amount`. On failure, including a charge that would overflow
    /// the counter, the meter is left at its limit.
    pub fn consume(&mut self, amount: u64, descriptor: &'static str) -> Result<(), GasError> {
        match self.consumed.checked_add(amount) {
            Some(required) if required <= self.limit => {
                self.consumed = required;
                Ok(())
            }
            _ => {
                let required = self.consumed.saturating_add(amount);
                self.consumed = self.limit;
                Err(GasError {
                    descriptor,
                    limit: self.limit,
                    required,
                })
            }
        }
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_within_limit() {
        let mut gas = GasMeter::new(100);
        gas.consume(40, "a").unwrap();
        gas.consume(60, "b").unwrap();
        assert_eq!(gas.consumed(), 100);
        assert_eq!(gas.remaining(), 0);
    }

    #[test]
    fn exceeding_limit_fails_and_saturates() {
        let mut gas = GasMeter::new(100);
        gas.consume(90, "a").unwrap();
        let err = gas.consume(20, "range proof").unwrap_err();
        assert_eq!(
            err,
            GasError {
                descriptor: "range proof",
                limit: 100,
                required: 110
            }
        );
        assert_eq!(gas.consumed(), 100);
    }

    #[test]
    fn infinite_meter_rejects_overflowing_charge() {
        let mut gas = GasMeter::infinite();
        gas.consume(u64::MAX - 1, "a").unwrap();
        gas.consume(1, "b").unwrap();
        assert_eq!(gas.remaining(), 0);

        let err = gas.consume(1, "c").unwrap_err();
        assert_eq!(err.descriptor, "c");
        assert_eq!(gas.consumed(), u64::MAX);
    }

    #[test]
    fn zero_charge_at_limit_is_free() {
        let mut gas = GasMeter::new(10);
        gas.consume(10, "a").unwrap();
        gas.consume(0, "b").unwrap();
        assert!(gas.consume(1, "c").is_err());
    }
}
