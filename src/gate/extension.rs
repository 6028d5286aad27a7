//! Extension gate: permission and provenance scoring for browser/agent
//! extension manifests.
//!
//! Grounded on `original_source/agents/extension_gate.py`.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::clamp01;

static SAFE_SOURCE_DOMAINS: Lazy<BTreeSet<&'static str>> =
    Lazy::new(|| ["chrome.google.com", "addons.mozilla.org", "microsoftedge.microsoft.com"].into());

fn permission_weight(permission: &str) -> f64 {
    match permission {
        "read_dom" => 0.02,
        "notifications" => 0.04,
        "storage" => 0.04,
        "network_fetch" => 0.08,
        "clipboard" => 0.12,
        "cookies" => 0.14,
        "geolocation" => 0.10,
        "filesystem_write" => 0.22,
        "shell_access" => 0.35,
        "exec_command" => 0.35,
        _ => 0.10,
    }
}

static SHA256_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{64}$").unwrap());

/// A normalized extension manifest; `requested_permissions` is always a
/// sorted, unique, lowercased set once constructed via [`from_fields`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub name: String,
    pub version: String,
    pub source_url: String,
    pub entrypoint: String,
    pub requested_permissions: BTreeSet<String>,
    pub sha256: String,
    pub publisher: String,
}

impl ExtensionManifest {
    pub fn from_fields(
        name: impl Into<String>,
        version: impl Into<String>,
        source_url: impl Into<String>,
        entrypoint: impl Into<String>,
        requested_permissions: impl IntoIterator<Item = String>,
        sha256: impl Into<String>,
        publisher: impl Into<String>,
    ) -> Self {
        ExtensionManifest {
            name: name.into(),
            version: version.into(),
            source_url: source_url.into(),
            entrypoint: entrypoint.into(),
            requested_permissions: requested_permissions
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
            sha256: sha256.into(),
            publisher: publisher.into(),
        }
    }
}

fn permission_risk(manifest: &ExtensionManifest) -> f64 {
    clamp01(
        manifest
            .requested_permissions
            .iter()
            .map(|p| permission_weight(p))
            .sum(),
    )
}

fn provenance_risk(manifest: &ExtensionManifest) -> f64 {
    let mut risk = 0.0;

    match Url::parse(&manifest.source_url) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default();
            if !SAFE_SOURCE_DOMAINS.contains(host) {
                risk += 0.20;
            }
        }
        Err(_) => risk += 0.35,
    }

    if manifest.sha256.is_empty() {
        risk += 0.25;
    } else if !SHA256_LIKE.is_match(&manifest.sha256.to_lowercase()) {
        risk += 0.20;
    }

    if manifest.entrypoint.trim().is_empty() {
        risk += 0.20;
    }

    if manifest.publisher.trim().is_empty() {
        risk += 0.15;
    }

    clamp01(risk)
}

/// Permissions a caller may actually enable, once suspicion is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionPartition {
    pub enabled: BTreeSet<String>,
    pub blocked: BTreeSet<String>,
}

const ALWAYS_DANGEROUS: &[&str] = &["exec_command", "shell_access"];
const NEVER_ON_CONSERVATIVE_ALLOWLIST: &[&str] = &["cookies", "clipboard"];

fn permission_partition(requested: &BTreeSet<String>, suspicion: f64) -> PermissionPartition {
    let mut enabled = BTreeSet::new();
    let mut blocked = BTreeSet::new();

    if suspicion >= 0.60 {
        blocked.extend(requested.iter().cloned());
    } else if suspicion < 0.30 {
        for p in requested {
            if ALWAYS_DANGEROUS.contains(&p.as_str()) {
                blocked.insert(p.clone());
            } else {
                enabled.insert(p.clone());
            }
        }
    } else {
        for p in requested {
            if NEVER_ON_CONSERVATIVE_ALLOWLIST.contains(&p.as_str()) || ALWAYS_DANGEROUS.contains(&p.as_str()) {
                blocked.insert(p.clone());
            } else if permission_weight(p) <= 0.10 {
                enabled.insert(p.clone());
            } else {
                blocked.insert(p.clone());
            }
        }
    }

    PermissionPartition { enabled, blocked }
}

/// Outcome of evaluating one extension install request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionGateResult {
    pub suspicion: f64,
    pub permission_risk: f64,
    pub provenance_risk: f64,
    pub partition: PermissionPartition,
    pub quarantine: bool,
    pub reasons: Vec<String>,
}

/// Evaluate an extension install request: weighted content/permission/
/// provenance suspicion drives how much of the requested permission set is
/// actually enabled.
pub fn evaluate_extension_install(manifest: &ExtensionManifest, content_risk: f64) -> ExtensionGateResult {
    let perm_risk = permission_risk(manifest);
    let prov_risk = provenance_risk(manifest);
    let suspicion = clamp01(0.55 * content_risk + 0.25 * perm_risk + 0.20 * prov_risk);
    let partition = permission_partition(&manifest.requested_permissions, suspicion);

    let mut reasons = Vec::new();
    if suspicion >= 0.60 {
        reasons.push("suspicion above quarantine threshold: all permissions blocked".into());
    }

    ExtensionGateResult {
        suspicion,
        permission_risk: perm_risk,
        provenance_risk: prov_risk,
        quarantine: suspicion >= 0.60,
        partition,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_risk_manifest_enables_most_permissions() {
        let manifest = ExtensionManifest::from_fields(
            "reader",
            "1.0.0",
            "https://chrome.google.com/webstore/detail/x",
            "background.js",
            vec!["read_dom".to_string(), "storage".to_string()],
            "a".repeat(64),
            "Acme Corp",
        );
        let result = evaluate_extension_install(&manifest, 0.0);
        assert!(result.suspicion < 0.30);
        assert!(result.partition.enabled.contains("read_dom"));
        assert!(!result.quarantine);
    }

    #[test]
    fn untrusted_source_with_shell_access_quarantines() {
        let manifest = ExtensionManifest::from_fields(
            "sketchy",
            "0.0.1",
            "not a url",
            "",
            vec!["shell_access".to_string(), "exec_command".to_string()],
            "",
            "",
        );
        let result = evaluate_extension_install(&manifest, 0.8);
        assert!(result.suspicion >= 0.60);
        assert!(result.quarantine);
        assert!(result.partition.enabled.is_empty());
    }
}
