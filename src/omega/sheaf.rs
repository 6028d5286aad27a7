//! Sheaf consistency via Tarski fixed-point iteration over a finite chain
//! lattice of temporal nodes `{Ti, Tm, Tg}`.
//!
//! Grounded on `original_source/src/harmonic/tarski_sheaf.py` and
//! `original_source/src/harmonic/sheaf_consensus_gate.py`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The three temporal nodes of the sheaf: immediate, medium, governance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalNode {
    Ti,
    Tm,
    Tg,
}

const NODES: [TemporalNode; 3] = [TemporalNode::Ti, TemporalNode::Tm, TemporalNode::Tg];
const MAX_STEPS: usize = 64;

/// Map a continuous signal in `[0,1]` to a discrete lattice level in
/// `0..=3` using the `0.25/0.50/0.75` bands.
pub fn to_lattice_level(value: f64) -> u32 {
    if value >= 0.75 {
        3
    } else if value >= 0.50 {
        2
    } else if value >= 0.25 {
        1
    } else {
        0
    }
}

/// Monotone restriction used on the `Ti -> Tm` and `Tm -> Tg` edges:
/// `relax_one(v) = max(0, v - 1)`.
fn relax_one(v: u32) -> u32 {
    v.saturating_sub(1)
}

/// Edge restriction map: `(from, to) -> closure over a lattice value`.
fn restrict(from: TemporalNode, to: TemporalNode, value: u32) -> u32 {
    match (from, to) {
        (TemporalNode::Ti, TemporalNode::Tm) => relax_one(value),
        (TemporalNode::Tm, TemporalNode::Tg) => relax_one(value),
        _ => value,
    }
}

/// Complete edge set over the three nodes (every ordered pair), matching
/// `make_complete_temporal_edges`.
fn incoming_edges(node: TemporalNode) -> Vec<TemporalNode> {
    NODES.iter().copied().filter(|&n| n != node).collect()
}

fn meet(values: impl IntoIterator<Item = u32>) -> Option<u32> {
    values.into_iter().min()
}

/// One iteration of the Tarski operator: `F(x)_n = min(x_n, meet over
/// incoming restrictions)`.
fn tarski_operator(assignment: &HashMap<TemporalNode, u32>) -> HashMap<TemporalNode, u32> {
    let mut next = HashMap::new();
    for &node in &NODES {
        let incoming: Vec<u32> = incoming_edges(node)
            .into_iter()
            .map(|from| restrict(from, node, assignment[&from]))
            .collect();
        let bound = meet(incoming).unwrap_or(assignment[&node]);
        next.insert(node, assignment[&node].min(bound));
    }
    next
}

/// Result of iterating the Tarski operator to a fixed point.
#[derive(Debug, Clone)]
pub struct FixedPointResult {
    pub assignment: HashMap<TemporalNode, u32>,
    pub steps: usize,
}

/// Iterate the monotone Tarski operator until it stops changing (the
/// operator is decreasing on a finite lattice, so this always terminates);
/// bail out after `MAX_STEPS` as a non-convergence guard.
pub fn iterate_to_fixed_point(initial: HashMap<TemporalNode, u32>) -> FixedPointResult {
    let mut current = initial;
    for step in 0..MAX_STEPS {
        let next = tarski_operator(&current);
        if next == current {
            return FixedPointResult {
                assignment: current,
                steps: step,
            };
        }
        current = next;
    }
    FixedPointResult {
        assignment: current,
        steps: MAX_STEPS,
    }
}

/// Count nodes whose fixed-point value exceeds the meet of their
/// neighbors' restricted values — a global-section obstruction.
pub fn obstruction_count(assignment: &HashMap<TemporalNode, u32>) -> usize {
    NODES
        .iter()
        .filter(|&&node| {
            let incoming: Vec<u32> = incoming_edges(node)
                .into_iter()
                .map(|from| restrict(from, node, assignment[&from]))
                .collect();
            match meet(incoming) {
                Some(bound) => assignment[&node] > bound,
                None => false,
            }
        })
        .count()
}

/// `sheaf_stability = max(0, 1 - obstruction/3)`.
pub fn sheaf_stability(obstruction: usize) -> f64 {
    (1.0 - obstruction as f64 / 3.0).max(0.0)
}

/// Build an initial per-node assignment from continuous observations,
/// quantizing each to a lattice level, then run the fixed-point iteration
/// and report stability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheafGateResult {
    pub obstruction: usize,
    pub stability: f64,
    pub consistent: bool,
}

pub fn evaluate_sheaf_consistency(ti: f64, tm: f64, tg: f64) -> SheafGateResult {
    let mut initial = HashMap::new();
    initial.insert(TemporalNode::Ti, to_lattice_level(ti));
    initial.insert(TemporalNode::Tm, to_lattice_level(tm));
    initial.insert(TemporalNode::Tg, to_lattice_level(tg));

    let fixed = iterate_to_fixed_point(initial);
    let obstruction = obstruction_count(&fixed.assignment);
    let stability = sheaf_stability(obstruction);

    SheafGateResult {
        obstruction,
        stability,
        consistent: obstruction == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_converges_within_max_steps() {
        let mut initial = HashMap::new();
        initial.insert(TemporalNode::Ti, 3);
        initial.insert(TemporalNode::Tm, 3);
        initial.insert(TemporalNode::Tg, 3);
        let result = iterate_to_fixed_point(initial.clone());
        assert!(result.steps <= MAX_STEPS);

        let second = tarski_operator(&result.assignment);
        assert_eq!(second, result.assignment, "fixed point must be idempotent");
    }

    #[test]
    fn consistent_inputs_report_zero_obstruction() {
        let result = evaluate_sheaf_consistency(0.9, 0.9, 0.9);
        assert_eq!(result.obstruction, 0);
        assert!((result.stability - 1.0).abs() < 1e-9);
    }
}
