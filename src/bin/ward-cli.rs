//! Synchronous NDJSON batch runner over the governance decision kernel.
//! Reads one tagged JSON object per line from stdin, evaluates it through
//! the matching subsystem, and prints one [`DecisionRecord`] per line to
//! stdout. This binary is the crate's only I/O-performing surface; the
//! core it drives never touches stdin/stdout/the network itself.

use std::io::{self, BufRead, Write};

use serde::Deserialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use ward_kernel::config::KernelConfig;
use ward_kernel::enforcement::backends::{build_enforcement_backends, EnforcementBackend};
use ward_kernel::enforcement::plan as enforcement_plan;
use ward_kernel::gate::bridge::{map_telemetry_event_to_kernel_event, LinuxKernelAntivirusBridge};
use ward_kernel::gate::extension::{evaluate_extension_install, ExtensionManifest};
use ward_kernel::gate::kernel::KernelEvent;
use ward_kernel::ledger::CooldownMap;
use ward_kernel::threat::{scan_text_for_threats, Domain};
use ward_kernel::DecisionRecord;

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum InputLine {
    KernelEvent { event: Value },
    ExtensionManifest { manifest: Value },
    ContentScan { text: String, domain: Option<String> },
}

fn domain_from_str(s: &str) -> Domain {
    match s {
        "browser" => Domain::Browser,
        "vehicle" => Domain::Vehicle,
        "fleet" => Domain::Fleet,
        "antivirus" => Domain::Antivirus,
        _ => Domain::Default,
    }
}

/// Bundles the state that must persist across input lines: antibody load
/// (inside `bridge`), enforcement cooldowns, and the configured backend set.
struct CliState {
    bridge: LinuxKernelAntivirusBridge,
    cooldowns: CooldownMap,
    backends: Vec<Box<dyn EnforcementBackend>>,
    quarantine_dir: String,
    cooldown_seconds: i64,
    dry_run: bool,
}

fn now_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn handle_line(state: &CliState, line: &str) -> Result<DecisionRecord, String> {
    let parsed: InputLine = serde_json::from_str(line).map_err(|e| format!("parse error: {e}"))?;

    match parsed {
        InputLine::KernelEvent { event } => {
            let kernel_event: KernelEvent = if event.get("evt.type").is_some() {
                map_telemetry_event_to_kernel_event(&event).map_err(|e| e.to_string())?
            } else {
                serde_json::from_value(event).map_err(|e| format!("bad kernel event: {e}"))?
            };
            let decision = state.bridge.evaluate(&kernel_event, Domain::Default, true);
            let enforcement = enforcement_plan(
                &decision.process_key,
                kernel_event.pid,
                &kernel_event.target,
                &kernel_event.process_name,
                decision.gate.kernel_action,
                &state.quarantine_dir,
                &state.cooldowns,
                now_seconds(),
                state.cooldown_seconds,
                &state.backends,
                state.dry_run,
            );
            Ok(DecisionRecord::new(
                format!("{:?}", decision.gate.kernel_action),
                decision.gate.reasons.join("; "),
                1.0 - decision.gate.suspicion,
                &serde_json::json!({"bridge": decision, "enforcement": enforcement}),
            ))
        }
        InputLine::ExtensionManifest { manifest } => {
            let manifest: ExtensionManifest =
                serde_json::from_value(manifest).map_err(|e| format!("bad manifest: {e}"))?;
            let result = evaluate_extension_install(&manifest, 0.0);
            Ok(DecisionRecord::new(
                if result.quarantine { "QUARANTINE" } else { "ALLOW" },
                result.reasons.join("; "),
                1.0 - result.suspicion,
                &serde_json::to_value(&result).unwrap_or_default(),
            ))
        }
        InputLine::ContentScan { text, domain } => {
            let scan = scan_text_for_threats(&text, &[], &[], &[]);
            let domain = domain_from_str(domain.as_deref().unwrap_or("default"));
            let action = ward_kernel::threat::turnstile_action(domain, scan.risk);
            Ok(DecisionRecord::new(
                format!("{action:?}"),
                scan.reasons.join("; "),
                1.0 - scan.risk,
                &serde_json::to_value(&scan).unwrap_or_default(),
            ))
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cfg = KernelConfig::default();
    let state = CliState {
        bridge: LinuxKernelAntivirusBridge::new(cfg.clone()),
        cooldowns: CooldownMap::new(),
        backends: build_enforcement_backends(&["journald"], None),
        quarantine_dir: "/var/quarantine".to_string(),
        cooldown_seconds: cfg.cooldown_seconds,
        dry_run: true,
    };
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut input_errors = 0usize;
    let mut total = 0usize;

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        total += 1;

        match handle_line(&state, &line) {
            Ok(record) => {
                writeln!(out, "{}", serde_json::to_string(&record)?)?;
            }
            Err(detail) => {
                input_errors += 1;
                tracing::warn!(line_number = total, %detail, "skipping malformed input line");
            }
        }
    }

    tracing::info!(total, input_errors, "batch complete");

    if input_errors > 0 {
        std::process::exit(2);
    }
    Ok(())
}
