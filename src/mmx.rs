//! Multi-Model Modal Matrix: a reliability-weighted reducer over
//! (model × modality) verdict cells.
//!
//! Grounded on `original_source/agents/multi_model_modal_matrix.py`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::clamp01;

const EPSILON: f64 = 1e-9;

/// A single model's vote for one modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum Prediction {
    Allow,
    Quarantine,
    Deny,
}

/// One (model, modality) observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixCell {
    pub model_id: String,
    pub modality_id: String,
    pub prediction: Prediction,
    pub confidence: f64,
    pub latency_ms: f64,
    pub drift: f64,
    pub risk: f64,
}

/// Derived aggregate signals used by the reducer and exposed for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedSignals {
    pub agreement_by_modality: HashMap<String, f64>,
    pub overall_agreement: f64,
    pub reliability_by_model: HashMap<String, f64>,
    pub cross_model_drift: f64,
    pub conflict_mass: f64,
}

/// Final reduced decision over the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixDecision {
    Allow,
    Quarantine,
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixReduction {
    pub decision: MatrixDecision,
    pub confidence: f64,
    pub support: HashMap<String, f64>,
    pub signals: DerivedSignals,
    pub rationale: Vec<String>,
}

/// Owns the growing set of cells for one evaluation and the per-(model,
/// modality) previous-confidence cache used to compute `drift`. Not
/// shared across evaluations — each evaluation gets its own reducer
/// instance (§5: "owned by a single MMX reducer instance per evaluation").
#[derive(Debug, Default)]
pub struct MultiModelModalMatrix {
    cells: Vec<MatrixCell>,
    prev_confidence: HashMap<(String, String), f64>,
}

impl MultiModelModalMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one observation, computing its `drift` against the previous
    /// confidence seen for the same (model, modality) key.
    pub fn ingest(
        &mut self,
        model_id: impl Into<String>,
        modality_id: impl Into<String>,
        prediction: Prediction,
        confidence: f64,
        latency_ms: f64,
        risk: f64,
    ) {
        let model_id = model_id.into();
        let modality_id = modality_id.into();
        let key = (model_id.clone(), modality_id.clone());
        let confidence = clamp01(confidence);
        let risk = clamp01(risk);

        let prev = self.prev_confidence.get(&key).copied().unwrap_or(confidence);
        let drift = (confidence - prev).abs();
        self.prev_confidence.insert(key, confidence);

        self.cells.push(MatrixCell {
            model_id,
            modality_id,
            prediction,
            confidence,
            latency_ms,
            drift,
            risk,
        });
    }

    fn derive_signals(&self) -> DerivedSignals {
        let mut by_modality: HashMap<String, Vec<&MatrixCell>> = HashMap::new();
        for cell in &self.cells {
            by_modality.entry(cell.modality_id.clone()).or_default().push(cell);
        }

        let mut agreement_by_modality = HashMap::new();
        for (modality, cells) in &by_modality {
            let mut counts: HashMap<Prediction, usize> = HashMap::new();
            for cell in cells {
                *counts.entry(cell.prediction).or_insert(0) += 1;
            }
            let max_count = counts.values().copied().max().unwrap_or(0);
            let agreement = if cells.is_empty() {
                0.0
            } else {
                max_count as f64 / cells.len() as f64
            };
            agreement_by_modality.insert(modality.clone(), agreement);
        }

        let overall_agreement = if agreement_by_modality.is_empty() {
            0.0
        } else {
            agreement_by_modality.values().sum::<f64>() / agreement_by_modality.len() as f64
        };

        let mut by_model: HashMap<String, Vec<&MatrixCell>> = HashMap::new();
        for cell in &self.cells {
            by_model.entry(cell.model_id.clone()).or_default().push(cell);
        }

        let mut reliability_by_model = HashMap::new();
        for (model, cells) in &by_model {
            let n = cells.len() as f64;
            let mean_conf = cells.iter().map(|c| c.confidence).sum::<f64>() / n;
            let mean_risk = cells.iter().map(|c| c.risk).sum::<f64>() / n;
            let mean_latency = cells.iter().map(|c| c.latency_ms).sum::<f64>() / n;
            let reliability = clamp01(mean_conf * (1.0 - mean_risk) * (1.0 / (1.0 + mean_latency / 4000.0)));
            reliability_by_model.insert(model.clone(), reliability);
        }

        let cross_model_drift = if self.cells.is_empty() {
            0.0
        } else {
            self.cells.iter().map(|c| c.drift).sum::<f64>() / self.cells.len() as f64
        };

        let conflict_mass = clamp01(1.0 - overall_agreement);

        DerivedSignals {
            agreement_by_modality,
            overall_agreement,
            reliability_by_model,
            cross_model_drift,
            conflict_mass,
        }
    }

    /// Reduce the accumulated cells to a single decision. An empty matrix
    /// fails closed: `DENY` with confidence `0.0`.
    pub fn reduce(&self) -> MatrixReduction {
        let signals = self.derive_signals();

        if self.cells.is_empty() {
            return MatrixReduction {
                decision: MatrixDecision::Deny,
                confidence: 0.0,
                support: HashMap::new(),
                signals,
                rationale: vec!["empty matrix: fail-closed DENY".into()],
            };
        }

        let mut support_raw: HashMap<Prediction, f64> = HashMap::new();
        for cell in &self.cells {
            let reliability = signals
                .reliability_by_model
                .get(&cell.model_id)
                .copied()
                .unwrap_or(0.0);
            let weight = reliability * cell.confidence * (1.0 - cell.risk);
            *support_raw.entry(cell.prediction).or_insert(0.0) += weight;
        }

        let total: f64 = support_raw.values().sum();

        let mut rationale = Vec::new();

        if total <= EPSILON {
            return MatrixReduction {
                decision: MatrixDecision::Deny,
                confidence: 0.0,
                support: HashMap::new(),
                signals,
                rationale: vec!["support total near zero: fail-closed DENY".into()],
            };
        }

        let support: HashMap<String, f64> = support_raw
            .iter()
            .map(|(p, v)| (format!("{p:?}"), v / total))
            .collect();

        let (argmax_pred, argmax_support) = support_raw
            .iter()
            .map(|(p, v)| (*p, v / total))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap();

        let penalty = clamp01(0.65 * signals.conflict_mass + 0.35 * signals.cross_model_drift);
        let confidence = clamp01(argmax_support * (1.0 - penalty));

        let decision = if argmax_pred == Prediction::Deny || penalty >= 0.75 {
            rationale.push(format!("argmax={argmax_pred:?} or penalty={penalty:.2} >= 0.75"));
            MatrixDecision::Deny
        } else if argmax_pred == Prediction::Quarantine || confidence < 0.55 {
            rationale.push(format!("argmax={argmax_pred:?} or confidence={confidence:.2} < 0.55"));
            MatrixDecision::Quarantine
        } else {
            rationale.push(format!("argmax={argmax_pred:?}, confidence={confidence:.2}"));
            MatrixDecision::Allow
        };

        MatrixReduction {
            decision,
            confidence,
            support,
            signals,
            rationale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s10_empty_matrix_fails_closed() {
        let matrix = MultiModelModalMatrix::new();
        let reduction = matrix.reduce();
        assert_eq!(reduction.decision, MatrixDecision::Deny);
        assert_eq!(reduction.confidence, 0.0);
    }

    #[test]
    fn s5_full_agreement_allows() {
        let mut matrix = MultiModelModalMatrix::new();
        for model in ["m1", "m2", "m3"] {
            for modality in ["text", "image", "audio"] {
                matrix.ingest(model, modality, Prediction::Allow, 0.92, 120.0, 0.08);
            }
        }
        let reduction = matrix.reduce();
        assert_eq!(reduction.decision, MatrixDecision::Allow);
        assert!(reduction.confidence > 0.6);
        assert!((reduction.signals.overall_agreement - 1.0).abs() < 1e-9);
    }
}
