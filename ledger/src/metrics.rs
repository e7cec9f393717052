//! # Prometheus Metrics
//!
//! Counters for delivered messages and verified proofs, registered in a
//! dedicated [`prometheus::Registry`] under the `shield` prefix so the host
//! can merge them into whatever it already exposes.
//!
//! | Metric                              | Labels            |
//! |-------------------------------------|-------------------|
//! | `shield_messages_total`             | `msg`, `outcome`  |
//! | `shield_proof_verifications_total`  | `kind`, `outcome` |
//!
//! `outcome` is `ok` or the lower-case error kind of the rejection.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_REJECTED: &str = "rejected";

/// Metric handles for the module. Cheap to clone; clones share counters.
#[derive(Clone)]
pub struct ModuleMetrics {
    registry: Registry,
    /// Messages delivered, by message name and outcome.
    pub messages_total: IntCounterVec,
    /// Proof verifications, by proof kind and outcome.
    pub proof_verifications_total: IntCounterVec,
}

impl ModuleMetrics {
    /// Create and register all metrics in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("shield".into()), None)?;

        let messages_total = IntCounterVec::new(
            Opts::new(
                "messages_total",
                "Confidential transfer messages delivered, by outcome",
            ),
            &["msg", "outcome"],
        )?;
        registry.register(Box::new(messages_total.clone()))?;

        let proof_verifications_total = IntCounterVec::new(
            Opts::new(
                "proof_verifications_total",
                "Zero-knowledge proof verifications, by outcome",
            ),
            &["kind", "outcome"],
        )?;
        registry.register(Box::new(proof_verifications_total.clone()))?;

        Ok(Self {
            registry,
            messages_total,
            proof_verifications_total,
        })
    }

    pub fn record_message(&self, msg: &str, outcome: &str) {
        self.messages_total.with_label_values(&[msg, outcome]).inc();
    }

    pub fn record_proof(&self, kind: &str, ok: bool) {
        let outcome = if ok { OUTCOME_OK } else { OUTCOME_REJECTED };
        self.proof_verifications_total
            .with_label_values(&[kind, outcome])
            .inc();
    }

    pub fn message_count(&self, msg: &str, outcome: &str) -> u64 {
        self.messages_total.with_label_values(&[msg, outcome]).get()
    }

    pub fn proof_count(&self, kind: &str, outcome: &str) -> u64 {
        self.proof_verifications_total
            .with_label_values(&[kind, outcome])
            .get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_labelled() {
        let metrics = ModuleMetrics::new().unwrap();
        metrics.record_message("deposit", OUTCOME_OK);
        metrics.record_message("deposit", OUTCOME_OK);
        metrics.record_message("deposit", "not_found");
        metrics.record_proof("range", false);

        assert_eq!(metrics.message_count("deposit", OUTCOME_OK), 2);
        assert_eq!(metrics.message_count("deposit", "not_found"), 1);
        assert_eq!(metrics.proof_count("range", OUTCOME_REJECTED), 1);
        assert_eq!(metrics.proof_count("range", OUTCOME_OK), 0);
    }

    #[test]
    fn encode_uses_prefix() {
        let metrics = ModuleMetrics::new().unwrap();
        metrics.record_message("transfer", OUTCOME_OK);
        let text = metrics.encode().unwrap();
        assert!(text.contains("shield_messages_total"));
        assert!(text.contains("msg=\"transfer\""));
    }
}
