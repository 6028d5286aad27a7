//! Temporal-Harmonic Omega Gate: the five-lock Ω product, plus the
//! hyperbolic-geometry and triadic-risk math that feeds `harm_score` and
//! `triadic_stable`.
//!
//! Grounded on `original_source/src/scbe_math_reference.py` and
//! `original_source/src/scbe_governance_math.py`.

pub mod diagnostic;
pub mod sheaf;

use serde::{Deserialize, Serialize};

use crate::config::clamp01;

/// A point in the open unit ball; callers are responsible for keeping
/// `norm() < 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl BallPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        BallPoint { x, y, z }
    }

    pub fn norm_sq(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    fn sub(&self, other: &BallPoint) -> BallPoint {
        BallPoint::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// Poincaré-ball hyperbolic distance. Both points must have norm `< 1`;
/// callers outside that domain get `f64::INFINITY` rather than a panic,
/// since the formula genuinely diverges there (property 7: "diverges as
/// `‖u‖ → 1`").
pub fn hyperbolic_distance(u: &BallPoint, v: &BallPoint) -> f64 {
    let nu = u.norm_sq();
    let nv = v.norm_sq();
    if nu >= 1.0 || nv >= 1.0 {
        return f64::INFINITY;
    }
    let diff = u.sub(v).norm_sq();
    let arg = 1.0 + 2.0 * diff / ((1.0 - nu) * (1.0 - nv));
    arg.max(1.0).acosh()
}

/// Intent-persistence factor `x`, bounded to `[0, 3]`.
pub fn intent_persistence(accumulated_intent: f64, trust: f64) -> f64 {
    let x = (0.5 + 0.25 * accumulated_intent) * (1.0 + (1.0 - trust));
    x.min(3.0).max(0.0)
}

/// Temporal harmonic wall `H_eff(d, R, x) = R^(d^2 * x)`, computed in the
/// numerically stable `exp(d^2 * x * ln R)` form.
pub fn harmonic_wall_temporal(d: f64, r: f64, x: f64) -> f64 {
    (d * d * x * r.ln()).exp()
}

/// Canonical (non-temporal) harmonic wall `H(d*, R) = R * pi^(phi * d*)`,
/// used where governance-math cost — not the temporal intent wall — is
/// the referent. Kept disjoint from [`harmonic_wall_temporal`] by design;
/// do not unify the two call sites.
pub fn harmonic_wall_canonical(d_star: f64, r: f64, phi: f64) -> f64 {
    r * std::f64::consts::PI.powf(phi * d_star)
}

/// Bounded harm score, `(0, 1]`, derived from a harmonic-wall cost.
pub fn harm_score(h_eff: f64) -> f64 {
    1.0 / (1.0 + h_eff.max(1.0).ln())
}

/// Triadic risk distance over (fast, memory, governance) intent
/// components, weighted `(0.3, 0.5, 0.2)` and combined with a golden-ratio
/// power mean.
pub fn triadic_risk_distance(i_fast: f64, i_memory: f64, i_governance: f64, phi: f64) -> f64 {
    let term = 0.3 * i_fast.max(0.0).powf(phi)
        + 0.5 * i_memory.max(0.0).powf(phi)
        + 0.2 * i_governance.max(0.0).powf(phi);
    term.max(0.0).powf(1.0 / phi)
}

/// `triadic_stable = clamp01(1 / (1 + d_tri))`.
pub fn triadic_stable(d_tri: f64) -> f64 {
    clamp01(1.0 / (1.0 + d_tri))
}

/// The five independent locks that compose Ω.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LockFactors {
    pub pqc_valid: f64,
    pub harm_score: f64,
    pub drift_factor: f64,
    pub triadic_stable: f64,
    pub spectral_score: f64,
}

impl LockFactors {
    /// Clamp every factor into `[0, 1]`.
    pub fn clamped(self) -> Self {
        LockFactors {
            pqc_valid: clamp01(self.pqc_valid),
            harm_score: clamp01(self.harm_score),
            drift_factor: clamp01(self.drift_factor),
            triadic_stable: clamp01(self.triadic_stable),
            spectral_score: clamp01(self.spectral_score),
        }
    }

    /// Name of the smallest of the five factors.
    pub fn weakest_lock(&self) -> &'static str {
        let factors = [
            ("pqc_valid", self.pqc_valid),
            ("harm_score", self.harm_score),
            ("drift_factor", self.drift_factor),
            ("triadic_stable", self.triadic_stable),
            ("spectral_score", self.spectral_score),
        ];
        factors
            .iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(name, _)| *name)
            .unwrap_or("none")
    }
}

/// Final Ω decision band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OmegaDecision {
    Allow,
    Quarantine,
    Deny,
}

/// Derived per-tick lock vector: the five clamped factors, their product
/// Ω, the weakest lock, and whether exile applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockVector {
    pub factors: LockFactors,
    pub omega: f64,
    pub weakest_lock: String,
    pub decision: OmegaDecision,
    pub exile: bool,
}

/// Compute Ω as the product of five clamped `[0,1]` factors. A zero PQC
/// factor forces Ω to zero regardless of the other locks (PQC invariant);
/// this already falls out of the product, but is asserted explicitly so
/// the invariant survives future refactors of this function.
pub fn omega(factors: LockFactors) -> f64 {
    let f = factors.clamped();
    let product = f.pqc_valid * f.harm_score * f.drift_factor * f.triadic_stable * f.spectral_score;
    if f.pqc_valid == 0.0 {
        debug_assert_eq!(product, 0.0);
    }
    product
}

/// Map an Ω value to a decision using strict `>` boundaries: `> 0.85`
/// ALLOW, `> 0.40` QUARANTINE, else DENY.
pub fn omega_decision(omega: f64, allow_threshold: f64, quarantine_threshold: f64) -> OmegaDecision {
    if omega > allow_threshold {
        OmegaDecision::Allow
    } else if omega > quarantine_threshold {
        OmegaDecision::Quarantine
    } else {
        OmegaDecision::Deny
    }
}

/// Full lock-vector evaluation: clamp factors, compute Ω, decide, and flag
/// exile (Ω < 0.22 and trust < 0.35 — decorative on DENY, not a new
/// envelope boundary per the design notes).
pub fn evaluate_lock_vector(
    factors: LockFactors,
    trust: f64,
    allow_threshold: f64,
    quarantine_threshold: f64,
) -> LockVector {
    let clamped = factors.clamped();
    let omega_value = omega(clamped);
    let decision = omega_decision(omega_value, allow_threshold, quarantine_threshold);
    let exile = omega_value < 0.22 && trust < 0.35;

    LockVector {
        weakest_lock: clamped.weakest_lock().to_string(),
        factors: clamped,
        omega: omega_value,
        decision,
        exile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_pqc_zeroes_omega() {
        let factors = LockFactors {
            pqc_valid: 0.0,
            harm_score: 0.99,
            drift_factor: 0.99,
            triadic_stable: 0.99,
            spectral_score: 0.99,
        };
        assert_eq!(omega(factors), 0.0);
    }

    #[test]
    fn hyperbolic_distance_is_symmetric_and_nonnegative() {
        let u = BallPoint::new(0.1, 0.2, 0.0);
        let v = BallPoint::new(0.3, -0.1, 0.05);
        let duv = hyperbolic_distance(&u, &v);
        let dvu = hyperbolic_distance(&v, &u);
        assert!((duv - dvu).abs() < 1e-9);
        assert!(duv >= 0.0);
    }

    #[test]
    fn hyperbolic_distance_diverges_near_boundary() {
        let u = BallPoint::new(0.0, 0.0, 0.0);
        let v = BallPoint::new(0.999999, 0.0, 0.0);
        let near = hyperbolic_distance(&u, &v);
        let closer = hyperbolic_distance(&u, &BallPoint::new(0.99999999, 0.0, 0.0));
        assert!(closer > near);
    }

    #[test]
    fn decision_bands_use_strict_greater_than() {
        assert_eq!(omega_decision(0.85, 0.85, 0.40), OmegaDecision::Quarantine);
        assert_eq!(omega_decision(0.850001, 0.85, 0.40), OmegaDecision::Allow);
        assert_eq!(omega_decision(0.40, 0.85, 0.40), OmegaDecision::Deny);
    }
}
