//! Deterministic governance decision kernel for a safety-first agent
//! runtime: threat membrane + turnstile, kernel/extension gates, the
//! multi-model modal matrix, the temporal-harmonic omega gate, and signed
//! decision envelopes. The crate performs no I/O and executes no
//! enforcement — it only plans.

pub mod config;
pub mod enforcement;
pub mod envelope;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod mmx;
pub mod omega;
pub mod threat;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One audited decision, emitted per evaluation and appended to an
/// external audit log by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub action: String,
    pub signature: String,
    pub timestamp: String,
    pub reason: String,
    pub confidence: f64,
}

impl DecisionRecord {
    /// Build a record whose `signature` is the SHA-256 of the canonical
    /// JSON of `inputs`, so two calls with identical inputs produce a
    /// byte-identical signature regardless of wall-clock time.
    pub fn new(action: impl Into<String>, reason: impl Into<String>, confidence: f64, inputs: &serde_json::Value) -> Self {
        let canonical = serde_json::to_string(inputs).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let signature = hex::encode(hasher.finalize());

        DecisionRecord {
            action: action.into(),
            signature,
            timestamp: Utc::now().to_rfc3339(),
            reason: reason.into(),
            confidence: config::clamp01(confidence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_record_signature_is_deterministic_over_inputs() {
        let inputs = serde_json::json!({"a": 1, "b": 2});
        let r1 = DecisionRecord::new("ALLOW", "clean", 0.9, &inputs);
        let r2 = DecisionRecord::new("ALLOW", "clean", 0.9, &inputs);
        assert_eq!(r1.signature, r2.signature);
    }
}
