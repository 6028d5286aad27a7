//! Tunable constants for the kernel. Every evaluator takes a `&KernelConfig`
//! rather than reaching for ambient globals, so a caller can run several
//! differently-tuned kernels in one process (one per tenant, one per test).

use serde::{Deserialize, Serialize};

/// Golden ratio, used by the triadic-risk and harmonic-wall formulas.
pub const PHI: f64 = 1.618_033_988_749_895;

/// Runtime knobs enumerated for the kernel. Defaults mirror the reference
/// constants; callers load overrides from their own config store and pass
/// the resulting struct through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KernelConfig {
    /// Antibody decay half-life, in arbitrary tick units.
    pub half_life: f64,
    /// Membrane-stress saturation point for `geometry_norm`.
    pub boundary_threshold: f64,
    /// Enforcement plan cooldown per process key, in seconds.
    pub cooldown_seconds: i64,
    /// Antibody ledger capacity before FIFO eviction kicks in.
    pub max_state_entries: usize,
    /// Omega gate ALLOW threshold (strict `>`).
    pub allow_threshold: f64,
    /// Omega gate QUARANTINE threshold (strict `>`).
    pub quarantine_threshold: f64,
    /// Harmonic wall base `R`.
    pub base_risk: f64,
    /// Golden ratio, kept on the config so callers can override in tests.
    pub phi: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            half_life: 12.0,
            boundary_threshold: 0.98,
            cooldown_seconds: 15,
            max_state_entries: 50_000,
            allow_threshold: 0.85,
            quarantine_threshold: 0.40,
            base_risk: 1.5,
            phi: PHI,
        }
    }
}

/// Clamp a floating-point score into `[0, 1]`, mapping NaN to 0.0 and any
/// out-of-range value (including infinities) to the nearest endpoint.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

/// Round to 4 decimal places, matching the reference risk-score rounding.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
