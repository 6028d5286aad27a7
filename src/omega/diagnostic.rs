//! Observability-only remediation hints keyed by weakest lock. Never feeds
//! back into a decision; exposed for CLI/log output alongside a
//! [`super::LockVector`].
//!
//! Grounded on `original_source/scripts/omega_lock_diagnostic.py`.

/// Suggested remediation text for the named weakest lock. Unknown lock
/// names get a generic message rather than panicking.
pub fn recommend(weakest_lock: &str) -> &'static str {
    match weakest_lock {
        "pqc_valid" => "rotate or re-validate the post-quantum signature chain",
        "harm_score" => "reduce harmonic wall cost: lower drift distance or intent persistence",
        "drift_factor" => "investigate positional drift; re-anchor agent geometry",
        "triadic_stable" => "triadic intent distance is high; reconcile fast/memory/governance signals",
        "spectral_score" => "spectral confidence is low; request a fresh multi-model vote",
        _ => "no specific remediation known for this lock",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_locks_have_specific_text() {
        assert_ne!(recommend("pqc_valid"), recommend("unknown_lock"));
    }
}
