//! Decision Envelope v1: a signed, canonicalized policy container that
//! constrains which actions are "inside the envelope" given current
//! resource state, plus a Merkle-Mountain-Range leaf hash for audit.
//!
//! Grounded on `original_source/src/governance/decision_envelope_v1.py`.

pub mod wire;

use std::collections::BTreeSet;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::PHI;
use crate::error::{KernelError, KernelResult};

pub const ENVELOPE_VERSION_V1: &str = "decision-envelope.v1";

/// The 17 dotted field paths an audit hook may require be present in the
/// MMR leaf payload before a signature is accepted as complete.
pub const MMR_REQUIRED_FIELDS_V1: [&str; 17] = [
    "identity.envelope_id",
    "identity.version",
    "identity.mission_id",
    "identity.swarm_id",
    "authority.issuer",
    "authority.key_id",
    "authority.valid_from_ms",
    "authority.valid_until_ms",
    "scope.agent_allowlist",
    "scope.capability_allowlist",
    "scope.target_allowlist",
    "constraints.mission_phase_allowlist",
    "constraints.resources.power_min",
    "constraints.resources.bandwidth_min",
    "constraints.resources.thermal_max",
    "constraints.max_risk_tier",
    "rules",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Unspecified,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryBehavior {
    Unspecified,
    AutoAllow,
    Quarantine,
    Deny,
}

pub fn boundary_name(b: BoundaryBehavior) -> &'static str {
    match b {
        BoundaryBehavior::Unspecified => "UNSPECIFIED",
        BoundaryBehavior::AutoAllow => "AUTO_ALLOW",
        BoundaryBehavior::Quarantine => "QUARANTINE",
        BoundaryBehavior::Deny => "DENY",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub envelope_id: String,
    pub version: String,
    pub mission_id: String,
    pub swarm_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Authority {
    pub issuer: String,
    pub key_id: String,
    pub valid_from_ms: i64,
    pub valid_until_ms: i64,
    pub issued_at_ms: i64,
    pub signature: String,
    pub signed_payload_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Scope {
    pub agent_allowlist: BTreeSet<String>,
    pub capability_allowlist: BTreeSet<String>,
    pub target_allowlist: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceConstraints {
    pub power_min: f64,
    pub bandwidth_min: f64,
    pub thermal_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub mission_phase_allowlist: BTreeSet<String>,
    pub resources: ResourceConstraints,
    pub max_risk_tier: RiskTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPath {
    pub path_id: String,
    pub playbook_ref: String,
    pub quorum_min: u32,
    pub human_ack_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub capability: String,
    pub target: String,
    pub boundary: BoundaryBehavior,
    pub recovery: Option<RecoveryPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuditHooks {
    pub mmr_fields: Vec<String>,
    pub mmr_leaf_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEnvelopeV1 {
    pub identity: Identity,
    pub authority: Authority,
    pub scope: Scope,
    pub constraints: Constraints,
    pub rules: Vec<Rule>,
    pub audit: AuditHooks,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionState<'a> {
    pub mission_phase: &'a str,
    pub agent_id: &'a str,
    pub capability: &'a str,
    pub target: &'a str,
    pub risk_tier: RiskTier,
    pub power: f64,
    pub bandwidth: f64,
    pub thermal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub in_envelope: bool,
    pub boundary: BoundaryBehavior,
    pub reason: String,
    pub recovery_path_id: Option<String>,
    pub mmr_leaf_hash: Option<String>,
}

fn sorted_unique(set: &BTreeSet<String>) -> Vec<String> {
    set.iter().cloned().collect()
}

/// Canonical deterministic bytes used for both signing and hashing.
/// `authority.signature`, `authority.signed_payload_hash`, and
/// `audit.mmr_leaf_hash` are zeroed first so signing is idempotent.
pub fn canonical_signing_bytes(env: &DecisionEnvelopeV1) -> Vec<u8> {
    let mut copy = env.clone();
    copy.authority.signature.clear();
    copy.authority.signed_payload_hash.clear();
    copy.audit.mmr_leaf_hash.clear();
    copy.rules.sort_by(|a, b| {
        (
            &a.capability,
            &a.target,
            a.boundary as u8,
            a.recovery.as_ref().map(|r| r.path_id.clone()).unwrap_or_default(),
        )
            .cmp(&(
                &b.capability,
                &b.target,
                b.boundary as u8,
                b.recovery.as_ref().map(|r| r.path_id.clone()).unwrap_or_default(),
            ))
    });
    bincode::serialize(&copy).expect("envelope is plain data, never fails to serialize")
}

pub fn signed_payload_hash(canonical_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes);
    hex::encode(hasher.finalize())
}

/// Canonical JSON value used for the MMR leaf payload: sorted-unique
/// allowlists, rules sorted by `(capability, target, boundary,
/// recovery.path_id)`, and only the fields named in `mmr_fields` (all
/// fields if the list is empty).
pub fn compute_mmr_leaf_payload(env: &DecisionEnvelopeV1) -> serde_json::Value {
    let mut rules: Vec<&Rule> = env.rules.iter().collect();
    rules.sort_by(|a, b| {
        (
            &a.capability,
            &a.target,
            a.boundary as u8,
            a.recovery.as_ref().map(|r| r.path_id.clone()).unwrap_or_default(),
        )
            .cmp(&(
                &b.capability,
                &b.target,
                b.boundary as u8,
                b.recovery.as_ref().map(|r| r.path_id.clone()).unwrap_or_default(),
            ))
    });

    serde_json::json!({
        "identity": {
            "envelope_id": env.identity.envelope_id,
            "version": env.identity.version,
            "mission_id": env.identity.mission_id,
            "swarm_id": env.identity.swarm_id,
        },
        "authority": {
            "issuer": env.authority.issuer,
            "key_id": env.authority.key_id,
            "valid_from_ms": env.authority.valid_from_ms,
            "valid_until_ms": env.authority.valid_until_ms,
        },
        "scope": {
            "agent_allowlist": sorted_unique(&env.scope.agent_allowlist),
            "capability_allowlist": sorted_unique(&env.scope.capability_allowlist),
            "target_allowlist": sorted_unique(&env.scope.target_allowlist),
        },
        "constraints": {
            "mission_phase_allowlist": sorted_unique(&env.constraints.mission_phase_allowlist),
            "resources": {
                "power_min": env.constraints.resources.power_min,
                "bandwidth_min": env.constraints.resources.bandwidth_min,
                "thermal_max": env.constraints.resources.thermal_max,
            },
            "max_risk_tier": format!("{:?}", env.constraints.max_risk_tier),
        },
        "rules": rules.iter().map(|r| serde_json::json!({
            "capability": r.capability,
            "target": r.target,
            "boundary": boundary_name(r.boundary),
            "recovery": r.recovery.as_ref().map(|rp| serde_json::json!({
                "path_id": rp.path_id,
                "playbook_ref": rp.playbook_ref,
                "quorum_min": rp.quorum_min,
                "human_ack_required": rp.human_ack_required,
            })),
        })).collect::<Vec<_>>(),
    })
}

pub fn mmr_leaf_hash(env: &DecisionEnvelopeV1) -> String {
    let payload = compute_mmr_leaf_payload(env);
    let compact = serde_json::to_string(&payload).expect("json value always serializes");
    let mut hasher = Sha256::new();
    hasher.update(compact.as_bytes());
    hex::encode(hasher.finalize())
}

/// Structural validation independent of signature state.
pub fn validate_envelope_schema(env: &DecisionEnvelopeV1) -> KernelResult<()> {
    if env.identity.envelope_id.trim().is_empty() {
        return Err(KernelError::validation("empty envelope_id"));
    }
    if env.identity.version != ENVELOPE_VERSION_V1 {
        return Err(KernelError::validation("unexpected envelope version"));
    }
    if env.identity.mission_id.trim().is_empty() || env.identity.swarm_id.trim().is_empty() {
        return Err(KernelError::validation("missing mission_id or swarm_id"));
    }
    if env.authority.issuer.trim().is_empty() || env.authority.key_id.trim().is_empty() {
        return Err(KernelError::validation("missing issuer or key_id"));
    }
    if env.authority.valid_until_ms <= env.authority.valid_from_ms {
        return Err(KernelError::validation("valid_until_ms must exceed valid_from_ms"));
    }
    if env.scope.agent_allowlist.is_empty()
        || env.scope.capability_allowlist.is_empty()
        || env.scope.target_allowlist.is_empty()
    {
        return Err(KernelError::validation("scope allowlists must be non-empty"));
    }
    if env.constraints.max_risk_tier == RiskTier::Unspecified {
        return Err(KernelError::validation("max_risk_tier must be set"));
    }
    if env.rules.is_empty() {
        return Err(KernelError::validation("at least one rule is required"));
    }
    for rule in &env.rules {
        if matches!(rule.boundary, BoundaryBehavior::Quarantine | BoundaryBehavior::Deny) {
            let recovery = rule
                .recovery
                .as_ref()
                .ok_or_else(|| KernelError::validation("quarantine/deny rule missing recovery"))?;
            if recovery.path_id.trim().is_empty() || recovery.playbook_ref.trim().is_empty() {
                return Err(KernelError::validation("recovery missing path_id or playbook_ref"));
            }
            if rule.boundary == BoundaryBehavior::Quarantine && recovery.quorum_min == 0 {
                return Err(KernelError::validation("quarantine rule requires quorum_min > 0"));
            }
        }
    }
    if !env.audit.mmr_fields.is_empty() {
        let present: BTreeSet<&str> = env.audit.mmr_fields.iter().map(|s| s.as_str()).collect();
        let missing: Vec<&str> = MMR_REQUIRED_FIELDS_V1
            .iter()
            .filter(|f| !present.contains(*f))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(KernelError::validation(format!(
                "mmr_fields missing required entries: {missing:?}"
            )));
        }
    }
    Ok(())
}

type HmacSha256 = Hmac<Sha256>;

/// Sign an envelope: set `issued_at_ms` if unset, populate `mmr_fields` if
/// empty, compute `signed_payload_hash`, the HMAC signature, and finally
/// `mmr_leaf_hash`.
pub fn sign_envelope_hmac(mut env: DecisionEnvelopeV1, key: &[u8], now_ms: i64) -> KernelResult<DecisionEnvelopeV1> {
    validate_envelope_schema(&env)?;

    if env.authority.issued_at_ms == 0 {
        env.authority.issued_at_ms = now_ms;
    }
    if env.audit.mmr_fields.is_empty() {
        env.audit.mmr_fields = MMR_REQUIRED_FIELDS_V1.iter().map(|s| s.to_string()).collect();
    }

    let canonical = canonical_signing_bytes(&env);
    let hash = signed_payload_hash(&canonical);
    env.authority.signed_payload_hash = hash.clone();

    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| KernelError::crypto(e.to_string()))?;
    mac.update(hash.as_bytes());
    env.authority.signature = hex::encode(mac.finalize().into_bytes());

    env.audit.mmr_leaf_hash = mmr_leaf_hash(&env);
    Ok(env)
}

/// Verify schema, validity window, `signed_payload_hash`, HMAC signature,
/// and (when `mmr_fields` is non-empty) `mmr_leaf_hash`.
pub fn verify_envelope_hmac(env: &DecisionEnvelopeV1, key: &[u8], now_ms: i64) -> KernelResult<()> {
    validate_envelope_schema(env)?;

    if now_ms < env.authority.valid_from_ms || now_ms >= env.authority.valid_until_ms {
        return Err(KernelError::crypto("envelope outside validity window"));
    }

    let canonical = canonical_signing_bytes(env);
    let expected_hash = signed_payload_hash(&canonical);
    if expected_hash != env.authority.signed_payload_hash {
        return Err(KernelError::crypto("signed_payload_hash mismatch"));
    }

    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| KernelError::crypto(e.to_string()))?;
    mac.update(expected_hash.as_bytes());
    let expected_sig = hex::encode(mac.finalize().into_bytes());
    if expected_sig != env.authority.signature {
        return Err(KernelError::crypto("signature mismatch"));
    }

    if !env.audit.mmr_fields.is_empty() {
        let expected_leaf = mmr_leaf_hash(env);
        if expected_leaf != env.audit.mmr_leaf_hash {
            return Err(KernelError::crypto("mmr_leaf_hash mismatch"));
        }
    }

    Ok(())
}

fn in_allowlist(set: &BTreeSet<String>, value: &str) -> bool {
    set.contains(value)
}

fn find_rule<'a>(rules: &'a [Rule], capability: &str, target: &str) -> Option<&'a Rule> {
    rules
        .iter()
        .find(|r| {
            (r.capability == capability || r.capability == "*") && (r.target == target || r.target == "*")
        })
}

/// Observability-only cost figure for the current resource state; never
/// participates in the boundary decision.
pub fn harmonic_wall_cost_from_resources(
    power: f64,
    power_min: f64,
    bandwidth: f64,
    bandwidth_min: f64,
    thermal: f64,
    thermal_max: f64,
    base_risk: f64,
) -> f64 {
    let eps = 1e-9;
    let power_ratio = if power_min > 0.0 { power_min / power.max(eps) } else { 1.0 };
    let bandwidth_ratio = if bandwidth_min > 0.0 { bandwidth_min / bandwidth.max(eps) } else { 1.0 };
    let thermal_ratio = if thermal_max > 0.0 { thermal / thermal_max.max(eps) } else { 1.0 };
    let scarcity = power_ratio.max(bandwidth_ratio).max(thermal_ratio).max(1.0);
    let d_star = scarcity - 1.0;
    crate::omega::harmonic_wall_canonical(d_star, base_risk, PHI)
}

/// Evaluate an `ActionState` against a verified envelope: allowlists,
/// mission phase, risk tier, resource floors/ceilings, then rule lookup.
pub fn evaluate_action_inside_envelope(
    env: &DecisionEnvelopeV1,
    key: &[u8],
    action: &ActionState,
    now_ms: i64,
    base_risk: f64,
) -> EvaluationResult {
    if let Err(e) = verify_envelope_hmac(env, key, now_ms) {
        return EvaluationResult {
            in_envelope: false,
            boundary: BoundaryBehavior::Deny,
            reason: format!("invalid_envelope:{e}"),
            recovery_path_id: None,
            mmr_leaf_hash: None,
        };
    }

    if !in_allowlist(&env.scope.agent_allowlist, action.agent_id) {
        return deny_with_reason("agent_out_of_scope");
    }
    if !in_allowlist(&env.scope.capability_allowlist, action.capability) {
        return deny_with_reason("capability_out_of_scope");
    }
    if !in_allowlist(&env.scope.target_allowlist, action.target) {
        return deny_with_reason("target_out_of_scope");
    }
    if !env.constraints.mission_phase_allowlist.contains(action.mission_phase) {
        return deny_with_reason("mission_phase_blocked");
    }
    if action.risk_tier > env.constraints.max_risk_tier {
        return deny_with_reason("risk_tier_above_max");
    }
    if action.power < env.constraints.resources.power_min {
        return deny_with_reason("power_below_floor");
    }
    if action.bandwidth < env.constraints.resources.bandwidth_min {
        return deny_with_reason("bandwidth_below_floor");
    }
    if env.constraints.resources.thermal_max > 0.0 && action.thermal > env.constraints.resources.thermal_max {
        return deny_with_reason("thermal_above_limit");
    }

    let rule = match find_rule(&env.rules, action.capability, action.target) {
        Some(r) => r,
        None => return deny_with_reason("no_policy_rule"),
    };

    let _cost = harmonic_wall_cost_from_resources(
        action.power,
        env.constraints.resources.power_min,
        action.bandwidth,
        env.constraints.resources.bandwidth_min,
        action.thermal,
        env.constraints.resources.thermal_max,
        base_risk,
    );

    let (reason, in_envelope) = match rule.boundary {
        BoundaryBehavior::AutoAllow => ("inside:auto_allow", true),
        BoundaryBehavior::Quarantine => ("inside:quarantine", true),
        BoundaryBehavior::Deny => ("inside:deny", false),
        BoundaryBehavior::Unspecified => ("invalid_envelope:rule boundary unspecified", false),
    };

    EvaluationResult {
        in_envelope,
        boundary: rule.boundary,
        reason: reason.to_string(),
        recovery_path_id: rule.recovery.as_ref().map(|r| r.path_id.clone()),
        mmr_leaf_hash: Some(env.audit.mmr_leaf_hash.clone()),
    }
}

fn deny_with_reason(reason: &str) -> EvaluationResult {
    EvaluationResult {
        in_envelope: false,
        boundary: BoundaryBehavior::Deny,
        reason: reason.to_string(),
        recovery_path_id: None,
        mmr_leaf_hash: None,
    }
}

/// Construct a minimal valid envelope, useful for tests and CLI demos.
#[allow(clippy::too_many_arguments)]
pub fn make_envelope_v1(
    envelope_id: impl Into<String>,
    mission_id: impl Into<String>,
    swarm_id: impl Into<String>,
    issuer: impl Into<String>,
    key_id: impl Into<String>,
    valid_from_ms: i64,
    valid_until_ms: i64,
    agent_allowlist: impl IntoIterator<Item = String>,
    capability_allowlist: impl IntoIterator<Item = String>,
    target_allowlist: impl IntoIterator<Item = String>,
    mission_phase_allowlist: impl IntoIterator<Item = String>,
    resources: ResourceConstraints,
    max_risk_tier: RiskTier,
    rules: Vec<Rule>,
) -> DecisionEnvelopeV1 {
    DecisionEnvelopeV1 {
        identity: Identity {
            envelope_id: envelope_id.into(),
            version: ENVELOPE_VERSION_V1.to_string(),
            mission_id: mission_id.into(),
            swarm_id: swarm_id.into(),
        },
        authority: Authority {
            issuer: issuer.into(),
            key_id: key_id.into(),
            valid_from_ms,
            valid_until_ms,
            ..Default::default()
        },
        scope: Scope {
            agent_allowlist: agent_allowlist.into_iter().collect(),
            capability_allowlist: capability_allowlist.into_iter().collect(),
            target_allowlist: target_allowlist.into_iter().collect(),
        },
        constraints: Constraints {
            mission_phase_allowlist: mission_phase_allowlist.into_iter().collect(),
            resources,
            max_risk_tier,
        },
        rules,
        audit: AuditHooks::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_envelope(rules: Vec<Rule>) -> DecisionEnvelopeV1 {
        make_envelope_v1(
            "env-1",
            "mission-1",
            "swarm-1",
            "issuer-1",
            "key-1",
            0,
            1_000_000_000,
            ["agent-1".to_string()],
            ["nav.move".to_string(), "sample.collect".to_string()],
            ["site-A".to_string(), "site-B".to_string()],
            ["phase-1".to_string()],
            ResourceConstraints {
                power_min: 40.0,
                bandwidth_min: 10.0,
                thermal_max: 85.0,
            },
            RiskTier::Medium,
            rules,
        )
    }

    #[test]
    fn s6_auto_allow_and_power_floor() {
        let rules = vec![Rule {
            capability: "nav.move".into(),
            target: "site-A".into(),
            boundary: BoundaryBehavior::AutoAllow,
            recovery: None,
        }];
        let env = sign_envelope_hmac(sample_envelope(rules), b"secret", 100).unwrap();

        let action = ActionState {
            mission_phase: "phase-1",
            agent_id: "agent-1",
            capability: "nav.move",
            target: "site-A",
            risk_tier: RiskTier::Low,
            power: 55.0,
            bandwidth: 12.0,
            thermal: 70.0,
        };
        let result = evaluate_action_inside_envelope(&env, b"secret", &action, 200, 1.5);
        assert!(result.in_envelope);
        assert_eq!(result.boundary, BoundaryBehavior::AutoAllow);
        assert_eq!(result.reason, "inside:auto_allow");

        let low_power = ActionState { power: 10.0, ..action };
        let result = evaluate_action_inside_envelope(&env, b"secret", &low_power, 200, 1.5);
        assert!(!result.in_envelope);
        assert_eq!(result.reason, "power_below_floor");
    }

    #[test]
    fn s7_quarantine_carries_recovery() {
        let rules = vec![Rule {
            capability: "sample.collect".into(),
            target: "site-B".into(),
            boundary: BoundaryBehavior::Quarantine,
            recovery: Some(RecoveryPath {
                path_id: "recovery-q-01".into(),
                playbook_ref: "playbook://q01".into(),
                quorum_min: 2,
                human_ack_required: true,
            }),
        }];
        let env = sign_envelope_hmac(sample_envelope(rules), b"secret", 100).unwrap();

        let action = ActionState {
            mission_phase: "phase-1",
            agent_id: "agent-1",
            capability: "sample.collect",
            target: "site-B",
            risk_tier: RiskTier::Low,
            power: 55.0,
            bandwidth: 12.0,
            thermal: 70.0,
        };
        let result = evaluate_action_inside_envelope(&env, b"secret", &action, 200, 1.5);
        assert!(result.in_envelope);
        assert_eq!(result.boundary, BoundaryBehavior::Quarantine);
        assert_eq!(result.recovery_path_id.as_deref(), Some("recovery-q-01"));
    }

    #[test]
    fn s8_mmr_hash_permutation_invariant() {
        let rules_a = vec![Rule {
            capability: "nav.move".into(),
            target: "site-A".into(),
            boundary: BoundaryBehavior::AutoAllow,
            recovery: None,
        }];
        let mut env_a = sample_envelope(rules_a.clone());
        let mut env_b = sample_envelope(rules_a);

        env_a.scope.agent_allowlist = ["agent-1".to_string(), "agent-2".to_string()].into_iter().collect();
        env_b.scope.agent_allowlist = ["agent-2".to_string(), "agent-1".to_string()].into_iter().collect();

        let signed_a = sign_envelope_hmac(env_a, b"secret", 100).unwrap();
        let signed_b = sign_envelope_hmac(env_b, b"secret", 100).unwrap();

        assert_eq!(signed_a.audit.mmr_leaf_hash, signed_b.audit.mmr_leaf_hash);
    }

    #[test]
    fn property3_signed_payload_hash_matches_canonical_bytes() {
        let rules = vec![Rule {
            capability: "nav.move".into(),
            target: "site-A".into(),
            boundary: BoundaryBehavior::AutoAllow,
            recovery: None,
        }];
        let env = sign_envelope_hmac(sample_envelope(rules), b"secret", 100).unwrap();
        let canonical = canonical_signing_bytes(&env);
        assert_eq!(env.authority.signed_payload_hash, signed_payload_hash(&canonical));
    }

    #[test]
    fn property4_sign_then_verify_succeeds() {
        let rules = vec![Rule {
            capability: "nav.move".into(),
            target: "site-A".into(),
            boundary: BoundaryBehavior::AutoAllow,
            recovery: None,
        }];
        let env = sign_envelope_hmac(sample_envelope(rules), b"secret", 100).unwrap();
        assert!(verify_envelope_hmac(&env, b"secret", 200).is_ok());
    }
}
