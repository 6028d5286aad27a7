//! Telemetry bridge: maps eBPF/Falco-shaped JSON payloads to canonical
//! [`KernelEvent`]s, and threads antibody continuity across events for the
//! same process key.
//!
//! Grounded on `original_source/agents/linux_kernel_event_bridge.py`.

use serde_json::Value;

use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::gate::kernel::{base_decision, composite_suspicion, evaluate_kernel_event, floored_geometry_norm, KernelEvent, KernelGateResult};
use crate::ledger::AntibodyLedger;
use crate::threat::{compute_antibody_load, resolve_turnstile, scan_text_for_threats, Domain};

fn pick<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| value.get(k))
}

fn to_str(value: &Value, keys: &[&str], default: &str) -> String {
    pick(value, keys)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

fn to_int(value: &Value, keys: &[&str], default: i64) -> i64 {
    pick(value, keys).and_then(|v| v.as_i64()).unwrap_or(default)
}

fn to_float(value: &Value, keys: &[&str], default: f64) -> f64 {
    pick(value, keys).and_then(|v| v.as_f64()).unwrap_or(default)
}

fn to_bool(value: &Value, keys: &[&str], default: bool) -> bool {
    pick(value, keys).and_then(|v| v.as_bool()).unwrap_or(default)
}

/// Map a raw `evt.type`-style event-type string to the canonical operation
/// vocabulary used by [`KernelEvent::operation`].
fn map_event_type_to_operation(evt_type: &str) -> &'static str {
    let t = evt_type.to_lowercase();
    if t.starts_with("execve") {
        "exec"
    } else if t.starts_with("open") {
        "open"
    } else if t.starts_with("write") {
        "write"
    } else if t.starts_with("unlink") || t.starts_with("rmdir") {
        "delete"
    } else if t.starts_with("rename") {
        "rename"
    } else if t == "connect" || t == "sendto" || t.starts_with("accept") {
        "network_connect"
    } else if t.ends_with("init_module") || t == "delete_module" {
        "module_load"
    } else if t == "ptrace" || t == "process_vm_writev" {
        "process_inject"
    } else {
        "unknown"
    }
}

fn network_target(value: &Value) -> Option<String> {
    let sip = pick(value, &["fd.sip"]).and_then(|v| v.as_str())?;
    let sport = to_int(value, &["fd.sport"], 0);
    let dip = to_str(value, &["fd.dip"], "0.0.0.0");
    let dport = to_int(value, &["fd.dport"], 0);
    Some(format!("{sip}:{sport}->{dip}:{dport}"))
}

/// Map one raw eBPF/Falco-shaped JSON event to a canonical [`KernelEvent`].
/// Unknown fields are ignored; missing fields fall back to conservative
/// defaults (untrusted signer, empty hash) that bias risk upward rather
/// than down.
pub fn map_telemetry_event_to_kernel_event(raw: &Value) -> KernelResult<KernelEvent> {
    let evt_type = to_str(raw, &["evt.type", "evt_type"], "");
    if evt_type.is_empty() {
        return Err(KernelError::input("telemetry event missing evt.type"));
    }

    let operation = map_event_type_to_operation(&evt_type).to_string();
    let target = network_target(raw)
        .unwrap_or_else(|| to_str(raw, &["fd.name", "proc.cwd", "target"], ""));

    Ok(KernelEvent {
        host: to_str(raw, &["host", "host.name"], "unknown-host"),
        pid: to_int(raw, &["proc.pid", "pid"], 0),
        process_name: to_str(raw, &["proc.name", "process_name"], "unknown"),
        operation,
        target,
        command_line: to_str(raw, &["proc.cmdline", "command_line"], ""),
        parent_process: to_str(raw, &["proc.pname", "parent_process"], ""),
        signer_trusted: to_bool(raw, &["scbe.signer_trusted", "signer_trusted"], false),
        sha256: to_str(raw, &["file.sha256", "sha256"], ""),
        geometry_norm: to_float(raw, &["scbe.geometry_norm", "geometry_norm"], 0.0),
    })
}

/// Full result of evaluating one telemetry-bridge event: the gate result
/// plus the turnstile outcome that produced its `kernel_action`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BridgeDecision {
    pub process_key: String,
    pub gate: KernelGateResult,
    pub antibody_load: f64,
    pub membrane_stress: f64,
}

/// Stateful wrapper owning an [`AntibodyLedger`] keyed by process, so
/// repeated events for the same process see a continuously decaying
/// antibody load rather than starting fresh each call.
pub struct LinuxKernelAntivirusBridge {
    ledger: AntibodyLedger,
    config: KernelConfig,
}

impl LinuxKernelAntivirusBridge {
    pub fn new(config: KernelConfig) -> Self {
        let capacity = config.max_state_entries;
        LinuxKernelAntivirusBridge {
            ledger: AntibodyLedger::new(capacity),
            config,
        }
    }

    /// Evaluate one already-mapped [`KernelEvent`], updating antibody state
    /// for its process key.
    pub fn evaluate(&self, event: &KernelEvent, domain: Domain, quorum_ok: bool) -> BridgeDecision {
        let key = event.process_key();
        let previous = self.ledger.get(&key);

        let content_risk = scan_text_for_threats(&event.command_line, &[], &[], &[]).risk;
        let suspicion = composite_suspicion(event, content_risk);
        let decision = base_decision(suspicion);
        let geometry_norm = floored_geometry_norm(event.geometry_norm, suspicion);

        let turnstile = resolve_turnstile(
            decision,
            domain,
            suspicion,
            geometry_norm,
            previous,
            quorum_ok,
            &self.config,
        );

        let gate = evaluate_kernel_event(
            event,
            content_risk,
            previous,
            turnstile.membrane_stress,
            turnstile.action,
        );

        self.ledger.set(&key, turnstile.antibody_load);

        BridgeDecision {
            process_key: key,
            antibody_load: turnstile.antibody_load,
            membrane_stress: turnstile.membrane_stress,
            gate,
        }
    }

    /// Parse and evaluate one raw telemetry JSON line.
    pub fn evaluate_json_line(&self, line: &str, domain: Domain, quorum_ok: bool) -> KernelResult<BridgeDecision> {
        let raw: Value = serde_json::from_str(line).map_err(|e| KernelError::input(e.to_string()))?;
        let event = map_telemetry_event_to_kernel_event(&raw)?;
        Ok(self.evaluate(&event, domain, quorum_ok))
    }

    pub fn antibody_load(&self, process_key: &str) -> f64 {
        self.ledger.get(process_key)
    }

    pub fn compute_antibody_preview(&self, process_key: &str, suspicion: f64) -> f64 {
        compute_antibody_load(self.ledger.get(process_key), suspicion, 1.0, self.config.half_life)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_execve_to_exec() {
        let raw = serde_json::json!({
            "evt.type": "execve",
            "proc.pid": 77,
            "proc.name": "bash",
            "proc.pname": "python",
            "fd.sip": "10.0.0.1",
            "fd.sport": 1234,
            "fd.dip": "10.0.0.2",
            "fd.dport": 443,
        });
        let event = map_telemetry_event_to_kernel_event(&raw).unwrap();
        assert_eq!(event.operation, "exec");
        assert_eq!(event.pid, 77);
    }

    #[test]
    fn bridge_tracks_antibody_load_across_calls() {
        let bridge = LinuxKernelAntivirusBridge::new(KernelConfig::default());
        let event = KernelEvent {
            host: "h".into(),
            pid: 1,
            process_name: "powershell.exe".into(),
            operation: "exec".into(),
            target: "C:\\Windows\\System32\\drivers\\evil.sys".into(),
            command_line: "powershell -enc AAAA".into(),
            parent_process: "winword.exe".into(),
            signer_trusted: false,
            sha256: String::new(),
            geometry_norm: 0.9,
        };
        let first = bridge.evaluate(&event, Domain::Default, true);
        let second = bridge.evaluate(&event, Domain::Default, true);
        assert!(second.antibody_load >= first.antibody_load * 0.5);
    }
}
