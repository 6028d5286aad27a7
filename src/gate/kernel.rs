//! Kernel gate: integrity scoring for process-level telemetry events.
//!
//! Grounded on `original_source/agents/kernel_antivirus_gate.py`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::clamp01;
use crate::threat::TurnstileAction;

fn operation_base_risk(operation: &str) -> f64 {
    match operation {
        "exec" => 0.12,
        "open" => 0.02,
        "write" => 0.12,
        "delete" => 0.14,
        "rename" => 0.08,
        "network_connect" => 0.08,
        "dns_query" => 0.04,
        "module_load" => 0.30,
        "process_inject" => 0.38,
        "registry_write" => 0.16,
        _ => 0.10,
    }
}

static SENSITIVE_TARGET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"system32\\drivers",
        r"system32\\config",
        r"(?i)\\startup\\",
        r"/etc/ssh",
        r"/etc/sudoers",
        r"/etc/passwd",
        r"/etc/shadow",
        r"/boot",
        r"/usr/lib/modules",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern is valid regex"))
    .collect()
});

const SUSPICIOUS_PARENT_CHILD: &[(&str, &str)] = &[
    ("winword.exe", "powershell.exe"),
    ("excel.exe", "powershell.exe"),
    ("outlook.exe", "powershell.exe"),
    ("wscript.exe", "cmd.exe"),
    ("python", "bash"),
];

/// A normalized process-event observation, produced either directly by a
/// caller or via [`crate::gate::bridge`] from raw telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelEvent {
    pub host: String,
    pub pid: i64,
    pub process_name: String,
    pub operation: String,
    pub target: String,
    pub command_line: String,
    pub parent_process: String,
    pub signer_trusted: bool,
    pub sha256: String,
    pub geometry_norm: f64,
}

impl KernelEvent {
    pub fn process_key(&self) -> String {
        format!("{}:{}:{}", self.host, self.pid, self.process_name)
    }
}

fn target_risk(target: &str) -> f64 {
    let lowered = target.to_lowercase();
    SENSITIVE_TARGET_PATTERNS
        .iter()
        .filter(|re| re.is_match(&lowered))
        .count() as f64
        * 0.18
}

fn integrity_risk(event: &KernelEvent) -> f64 {
    let mut risk = operation_base_risk(&event.operation);
    if !event.signer_trusted {
        risk += 0.22;
    }
    if event.sha256.is_empty() {
        risk += 0.16;
    } else if event.sha256.len() != 64 {
        risk += 0.12;
    }
    risk += target_risk(&event.target);

    let parent = event.parent_process.to_lowercase();
    let child = event.process_name.to_lowercase();
    if SUSPICIOUS_PARENT_CHILD
        .iter()
        .any(|(p, c)| parent.contains(p) && child.contains(c))
    {
        risk += 0.20;
    }

    clamp01(risk)
}

/// Decision band for a kernel event, independent of downstream turnstile
/// routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelDecision {
    Allow,
    Quarantine,
    Escalate,
    Deny,
}

/// Cell state derived from the worst of antibody/stress/suspicion, used to
/// override or upgrade the turnstile-derived action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Healthy,
    Primed,
    Inflamed,
    Necrotic,
}

pub fn cell_state(worst: f64) -> CellState {
    if worst >= 0.90 {
        CellState::Necrotic
    } else if worst >= 0.70 {
        CellState::Inflamed
    } else if worst >= 0.35 {
        CellState::Primed
    } else {
        CellState::Healthy
    }
}

/// Final enforcement-facing action for a kernel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelAction {
    Allow,
    Throttle,
    Quarantine,
    Honeypot,
    Kill,
}

/// Map the upstream turnstile action to a kernel enforcement action.
pub fn map_turnstile_to_kernel_action(turnstile: TurnstileAction) -> KernelAction {
    match turnstile {
        TurnstileAction::Allow => KernelAction::Allow,
        TurnstileAction::Honeypot => KernelAction::Honeypot,
        TurnstileAction::Isolate => KernelAction::Quarantine,
        TurnstileAction::Stop => KernelAction::Kill,
        _ => KernelAction::Throttle,
    }
}

/// Outcome of evaluating one [`KernelEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelGateResult {
    pub decision: KernelDecision,
    pub suspicion: f64,
    pub integrity_risk: f64,
    pub cell_state: CellState,
    pub kernel_action: KernelAction,
    pub block_execution: bool,
    pub isolate_process: bool,
    pub quarantine: bool,
    pub reasons: Vec<String>,
}

/// Composite suspicion from content risk, integrity risk, and raw (unfloored)
/// geometry norm. Exposed so callers needing the decision/suspicion ahead of
/// a turnstile call (to then derive a floored geometry norm) don't have to
/// duplicate the blend formula.
pub fn composite_suspicion(event: &KernelEvent, content_risk: f64) -> f64 {
    clamp01(0.50 * content_risk + 0.35 * integrity_risk(event) + 0.15 * event.geometry_norm)
}

pub fn base_decision(suspicion: f64) -> KernelDecision {
    if suspicion >= 0.85 {
        KernelDecision::Deny
    } else if suspicion >= 0.60 {
        KernelDecision::Escalate
    } else if suspicion >= 0.30 {
        KernelDecision::Quarantine
    } else {
        KernelDecision::Allow
    }
}

/// Evaluate a kernel event end to end: content risk + integrity risk feed a
/// composite suspicion score; suspicion and derived geometry feed cell
/// state; cell state and the turnstile action jointly determine the final
/// `KernelAction`.
pub fn evaluate_kernel_event(
    event: &KernelEvent,
    content_risk: f64,
    previous_antibody_load: f64,
    membrane_stress: f64,
    turnstile_action: TurnstileAction,
) -> KernelGateResult {
    let integrity = integrity_risk(event);
    let suspicion = composite_suspicion(event, content_risk);
    let decision = base_decision(suspicion);

    let worst = previous_antibody_load.max(membrane_stress).max(suspicion);
    let state = cell_state(worst);

    let mut action = map_turnstile_to_kernel_action(turnstile_action);
    let mut reasons = vec![format!("suspicion={suspicion:.4}", suspicion = suspicion)];

    if state == CellState::Necrotic {
        action = KernelAction::Honeypot;
        reasons.push("cell state necrotic: forcing honeypot".into());
    } else if state == CellState::Inflamed && action == KernelAction::Allow {
        action = KernelAction::Throttle;
        reasons.push("cell state inflamed: upgrading allow to throttle".into());
    }

    let block_execution = matches!(
        action,
        KernelAction::Kill | KernelAction::Quarantine | KernelAction::Honeypot
    );
    let isolate_process = matches!(action, KernelAction::Quarantine | KernelAction::Honeypot | KernelAction::Kill);
    let quarantine = matches!(action, KernelAction::Quarantine | KernelAction::Honeypot);

    KernelGateResult {
        decision,
        suspicion,
        integrity_risk: integrity,
        cell_state: state,
        kernel_action: action,
        block_execution,
        isolate_process,
        quarantine,
        reasons,
    }
}

/// Geometry norm input to `suspicion` is monotone in observed value, but
/// never below the suspicion-derived floor — matches the reference
/// `geometry = max(observed, 0.20 + 0.75*suspicion)` relation. Exposed
/// separately because the floor depends on a suspicion value that is
/// itself a function of geometry in the full pipeline; callers compute
/// suspicion first from the observed norm, then may re-derive a floored
/// norm for downstream cell-state comparisons.
pub fn floored_geometry_norm(observed: f64, suspicion: f64) -> f64 {
    observed.max(0.20 + 0.75 * suspicion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_kernel_suspicious_event_isolates() {
        let event = KernelEvent {
            host: "host-1".into(),
            pid: 4242,
            process_name: "powershell.exe".into(),
            operation: "exec".into(),
            target: r"C:\Windows\System32\drivers\evil.sys".into(),
            command_line: "powershell -enc ...".into(),
            parent_process: "winword.exe".into(),
            signer_trusted: false,
            sha256: String::new(),
            geometry_norm: 0.82,
        };
        let content_risk = crate::threat::scan_text_for_threats(&event.command_line, &[], &[], &[]).risk;
        let result = evaluate_kernel_event(&event, content_risk, 0.0, 0.0, TurnstileAction::Isolate);
        assert!(matches!(
            result.decision,
            KernelDecision::Escalate | KernelDecision::Deny | KernelDecision::Quarantine
        ));
        assert!(matches!(
            result.kernel_action,
            KernelAction::Quarantine | KernelAction::Honeypot | KernelAction::Kill
        ));
        assert!(result.block_execution);
        assert!(result.isolate_process);
    }
}
