//! Enforcement planner: turns a kernel decision into a synthesized,
//! cooldown-aware enforcement plan of argv vectors — never shell strings.
//!
//! Grounded on `original_source/agents/linux_enforcement_hooks.py`.

pub mod backends;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::enforcement::backends::{EnforcementAction, EnforcementBackend};
use crate::gate::kernel::KernelAction;
use crate::ledger::CooldownMap;

/// Substrings that must never appear in a synthesized command, even if a
/// caller-supplied target path happens to contain them.
static DANGEROUS_SUBSTRINGS: &[&str] = &[
    "rm -rf",
    "dd if=",
    "shutdown",
    "mkfs",
    ":(){ :|:& };:",
    "> /dev/sd",
];

static QUARANTINE_DIR_SAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_./:\\-]+$").unwrap());

/// One synthesized command as an argv vector — constructed directly,
/// never through a shell, so there is no interpolation surface to guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub argv: Vec<String>,
}

impl Command {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// Render for display/logging only — never used to build a shell
    /// invocation.
    pub fn render_for_display(&self) -> String {
        self.argv
            .iter()
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    if arg.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:".contains(c)) {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

fn is_probable_path(target: &str) -> bool {
    target.starts_with('/') || (target.len() > 2 && target.as_bytes()[1] == b':')
}

fn basename(target: &str) -> &str {
    target.rsplit(['/', '\\']).next().unwrap_or(target)
}

fn is_dangerous(command: &Command) -> bool {
    let rendered = command.render_for_display().to_lowercase();
    DANGEROUS_SUBSTRINGS.iter().any(|s| rendered.contains(&s.to_lowercase()))
}

/// A fully built enforcement plan for one process event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementPlan {
    pub process_key: String,
    pub kernel_action: KernelAction,
    pub commands: Vec<Command>,
    pub rationale: Vec<String>,
    pub dry_run: bool,
    pub applied: bool,
    pub failures: Vec<String>,
    pub cooldown_skipped: bool,
    pub backend_names: Vec<String>,
    pub action: KernelAction,
}

fn commands_for_action(action: KernelAction, pid: i64, target: &str, quarantine_dir: &str, process_name: &str) -> Vec<Command> {
    match action {
        KernelAction::Allow => Vec::new(),
        KernelAction::Throttle => vec![Command::new(["renice", "+10", "-p", &pid.to_string()])],
        KernelAction::Kill => vec![Command::new(["kill", "-KILL", &pid.to_string()])],
        KernelAction::Quarantine | KernelAction::Honeypot => {
            let mut commands = vec![Command::new(["kill", "-STOP", &pid.to_string()])];
            commands.push(Command::new(["mkdir", "-p", quarantine_dir]));
            if is_probable_path(target) {
                let dest = format!("{quarantine_dir}/{process_name}-{pid}-{}", basename(target));
                commands.push(Command::new(["cp", "--", target, &dest]));
                commands.push(Command::new(["chmod", "000", target]));
            }
            commands
        }
    }
}

/// Build a plan for one kernel decision and, unless `dry_run`, apply it
/// through every backend adapter passed in, aggregating their real
/// `applied`/`failures` results. Callers still receive a (possibly empty)
/// plan even when suppressed, so logging/audit sees a consistent shape.
#[allow(clippy::too_many_arguments)]
pub fn plan(
    process_key: &str,
    pid: i64,
    target: &str,
    process_name: &str,
    kernel_action: KernelAction,
    quarantine_dir: &str,
    cooldowns: &CooldownMap,
    now: i64,
    cooldown_seconds: i64,
    backends: &[Box<dyn EnforcementBackend>],
    dry_run: bool,
) -> EnforcementPlan {
    let backend_names: Vec<String> = backends.iter().map(|b| b.name().to_string()).collect();

    if kernel_action == KernelAction::Allow {
        return EnforcementPlan {
            process_key: process_key.to_string(),
            kernel_action,
            action: kernel_action,
            commands: Vec::new(),
            rationale: vec!["allow: no enforcement required".into()],
            dry_run,
            applied: false,
            failures: Vec::new(),
            cooldown_skipped: false,
            backend_names,
        };
    }

    if cooldowns.is_in_cooldown(process_key, now, cooldown_seconds) {
        return EnforcementPlan {
            process_key: process_key.to_string(),
            kernel_action,
            action: kernel_action,
            commands: Vec::new(),
            rationale: vec!["cooldown active: suppressing re-fire".into()],
            dry_run,
            applied: false,
            failures: Vec::new(),
            cooldown_skipped: true,
            backend_names,
        };
    }

    let quarantine_dir = if QUARANTINE_DIR_SAFE.is_match(quarantine_dir) {
        quarantine_dir
    } else {
        "/var/quarantine"
    };

    let mut commands = commands_for_action(kernel_action, pid, target, quarantine_dir, process_name);
    let mut rationale = vec![format!("kernel_action={kernel_action:?}")];

    let mut rejected = 0;
    commands.retain(|c| {
        let ok = !is_dangerous(c);
        if !ok {
            rejected += 1;
        }
        ok
    });
    if rejected > 0 {
        rationale.push(format!("rejected {rejected} command(s) matching the dangerous-command guard"));
        commands = vec![Command::new(["kill", "-STOP", &pid.to_string()])];
    }

    cooldowns.record(process_key, now);

    let mut applied = false;
    let mut failures = Vec::new();
    if !dry_run {
        if backends.is_empty() {
            failures.push("no enforcement backends configured".to_string());
        } else {
            let enforcement_action = EnforcementAction {
                process_key: process_key.to_string(),
                pid,
                unit_name: process_name.to_string(),
                action: kernel_action,
            };
            for backend in backends {
                let result = backend.apply(&enforcement_action, false);
                applied = applied || result.applied;
                failures.extend(result.failures);
                rationale.push(format!("{}: {}", result.backend, result.details));
            }
        }
    }

    EnforcementPlan {
        process_key: process_key.to_string(),
        kernel_action,
        action: kernel_action,
        commands,
        rationale,
        dry_run,
        applied,
        failures,
        cooldown_skipped: false,
        backend_names,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_backends() -> Vec<Box<dyn EnforcementBackend>> {
        Vec::new()
    }

    #[test]
    fn allow_produces_no_commands() {
        let cooldowns = CooldownMap::new();
        let p = plan("k", 1, "/tmp/x", "proc", KernelAction::Allow, "/quarantine", &cooldowns, 0, 15, &no_backends(), true);
        assert!(p.commands.is_empty());
    }

    #[test]
    fn cooldown_suppresses_repeat_plans() {
        let cooldowns = CooldownMap::new();
        let first = plan("k", 1, "/tmp/x", "proc", KernelAction::Kill, "/quarantine", &cooldowns, 0, 15, &no_backends(), true);
        assert!(!first.cooldown_skipped);
        let second = plan("k", 1, "/tmp/x", "proc", KernelAction::Kill, "/quarantine", &cooldowns, 5, 15, &no_backends(), true);
        assert!(second.cooldown_skipped);
    }

    #[test]
    fn quarantine_copies_absolute_path_targets() {
        let cooldowns = CooldownMap::new();
        let p = plan(
            "k",
            99,
            "/home/user/evil.bin",
            "evil",
            KernelAction::Quarantine,
            "/var/quarantine",
            &cooldowns,
            0,
            15,
            &no_backends(),
            true,
        );
        assert!(p.commands.iter().any(|c| c.argv.first().map(String::as_str) == Some("cp")));
        assert!(p.commands.iter().any(|c| c.argv.first().map(String::as_str) == Some("chmod")));
    }

    #[test]
    fn non_dry_run_with_no_backends_reports_failure() {
        let cooldowns = CooldownMap::new();
        let p = plan("k", 1, "/tmp/x", "proc", KernelAction::Kill, "/quarantine", &cooldowns, 0, 15, &no_backends(), false);
        assert!(!p.applied);
        assert!(p.failures.iter().any(|f| f.contains("no enforcement backends")));
    }

    #[test]
    fn non_dry_run_applies_through_backends_and_aggregates() {
        use crate::enforcement::backends::StructuredLogBackend;
        let cooldowns = CooldownMap::new();
        let backends: Vec<Box<dyn EnforcementBackend>> = vec![Box::new(StructuredLogBackend)];
        let p = plan("k", 1, "/tmp/x", "proc", KernelAction::Kill, "/quarantine", &cooldowns, 0, 15, &backends, false);
        assert!(p.applied);
        assert_eq!(p.backend_names, vec!["journald".to_string()]);
        assert!(p.failures.is_empty());
    }
}
