//! Cross-module integration scenarios, seeded directly from the kernel's
//! end-to-end test scenarios (content scan -> turnstile -> kernel gate ->
//! enforcement planning, and envelope permutation invariance).

use ward_kernel::config::KernelConfig;
use ward_kernel::enforcement::backends::{EnforcementBackend, StructuredLogBackend};
use ward_kernel::enforcement::plan;
use ward_kernel::gate::kernel::KernelAction;
use ward_kernel::envelope::{
    make_envelope_v1, mmr_leaf_hash, sign_envelope_hmac, BoundaryBehavior, RecoveryPath, ResourceConstraints, RiskTier, Rule,
};
use ward_kernel::gate::kernel::{evaluate_kernel_event, KernelEvent};
use ward_kernel::ledger::CooldownMap;
use ward_kernel::threat::{resolve_turnstile, scan_text_for_threats, Domain};

#[test]
fn full_pipeline_suspicious_kernel_event_triggers_enforcement_plan() {
    let cfg = KernelConfig::default();

    let event = KernelEvent {
        host: "workstation-7".into(),
        pid: 5150,
        process_name: "powershell.exe".into(),
        operation: "exec".into(),
        target: r"C:\Windows\System32\drivers\evil.sys".into(),
        command_line: "powershell -enc AAAAZGVsZXRlIGV2ZXJ5dGhpbmc=".into(),
        parent_process: "winword.exe".into(),
        signer_trusted: false,
        sha256: String::new(),
        geometry_norm: 0.82,
    };

    let content_scan = scan_text_for_threats(&event.command_line, &[], &[], &[]);
    let gate = evaluate_kernel_event(
        &event,
        content_scan.risk,
        0.0,
        0.0,
        ward_kernel::threat::TurnstileAction::Allow,
    );

    let turnstile = resolve_turnstile(gate.decision, Domain::Antivirus, gate.suspicion, event.geometry_norm, 0.0, true, &cfg);

    let final_gate = evaluate_kernel_event(&event, content_scan.risk, 0.0, turnstile.membrane_stress, turnstile.action);
    assert!(final_gate.block_execution);
    assert!(final_gate.isolate_process);

    let cooldowns = CooldownMap::new();
    let backends: Vec<Box<dyn EnforcementBackend>> = vec![Box::new(StructuredLogBackend)];
    let enforcement_plan = plan(
        &event.process_key(),
        event.pid,
        &event.target,
        &event.process_name,
        final_gate.kernel_action,
        "/var/quarantine",
        &cooldowns,
        0,
        cfg.cooldown_seconds,
        &backends,
        false,
    );
    assert!(!enforcement_plan.commands.is_empty());
    assert!(matches!(
        final_gate.kernel_action,
        KernelAction::Quarantine | KernelAction::Honeypot | KernelAction::Kill
    ));
    assert_eq!(enforcement_plan.backend_names, vec!["journald".to_string()]);
    assert!(enforcement_plan.applied, "the planner itself must apply through its backends");
    assert!(enforcement_plan.failures.is_empty());

    let dry_run_plan = plan(
        &event.process_key(),
        event.pid,
        &event.target,
        &event.process_name,
        final_gate.kernel_action,
        "/var/quarantine",
        &CooldownMap::new(),
        0,
        cfg.cooldown_seconds,
        &backends,
        true,
    );
    assert!(!dry_run_plan.applied, "dry run must never apply");
}

#[test]
fn property6_mmr_hash_invariant_across_rule_permutation() {
    let resources = ResourceConstraints {
        power_min: 10.0,
        bandwidth_min: 5.0,
        thermal_max: 90.0,
    };

    let rule_a = Rule {
        capability: "nav.move".into(),
        target: "site-A".into(),
        boundary: BoundaryBehavior::AutoAllow,
        recovery: None,
    };
    let rule_b = Rule {
        capability: "sample.collect".into(),
        target: "site-B".into(),
        boundary: BoundaryBehavior::Quarantine,
        recovery: Some(RecoveryPath {
            path_id: "recovery-q-01".into(),
            playbook_ref: "playbook://q01".into(),
            quorum_min: 2,
            human_ack_required: true,
        }),
    };

    let env_forward = make_envelope_v1(
        "env-perm",
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
        resources,
        RiskTier::Medium,
        vec![rule_a.clone(), rule_b.clone()],
    );
    let env_reversed = make_envelope_v1(
        "env-perm",
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
        resources,
        RiskTier::Medium,
        vec![rule_b, rule_a],
    );

    let signed_forward = sign_envelope_hmac(env_forward, b"secret", 0).unwrap();
    let signed_reversed = sign_envelope_hmac(env_reversed, b"secret", 0).unwrap();

    assert_eq!(mmr_leaf_hash(&signed_forward), mmr_leaf_hash(&signed_reversed));
    assert_eq!(signed_forward.audit.mmr_leaf_hash, signed_reversed.audit.mmr_leaf_hash);
}
