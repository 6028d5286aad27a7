//! Binary and JSON wire encodings for [`super::DecisionEnvelopeV1`].
//!
//! The binary form is a deterministic `bincode` encoding (stable field
//! order, no maps in the schema) standing in for the protobuf descriptor
//! the original governance code builds at runtime — Rust's schema is
//! static, so there's nothing to construct at runtime here. The JSON
//! projection still carries the `_canonical.*` envelope audit consumers
//! expect.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::DecisionEnvelopeV1;
use crate::error::{KernelError, KernelResult};

/// Serialize an envelope to its canonical binary wire form.
pub fn to_binary(env: &DecisionEnvelopeV1) -> Vec<u8> {
    bincode::serialize(env).expect("envelope is plain data, never fails to serialize")
}

/// Parse an envelope from its canonical binary wire form.
pub fn from_binary(bytes: &[u8]) -> KernelResult<DecisionEnvelopeV1> {
    bincode::deserialize(bytes).map_err(|e| KernelError::validation(format!("malformed envelope bytes: {e}")))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CanonicalEnvelope {
    #[serde(rename = "proto_sha256")]
    proto_sha256: String,
    #[serde(rename = "signed_payload_sha256")]
    signed_payload_sha256: String,
    #[serde(rename = "proto_b64")]
    proto_b64: String,
}

/// A JSON projection of an envelope, carrying the original binary bytes
/// (base64) and their hashes alongside an optional linked-data header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonProjection {
    #[serde(rename = "_canonical")]
    canonical: CanonicalEnvelope,
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    type_: Option<String>,
    envelope: DecisionEnvelopeV1,
}

/// Project an envelope to JSON, embedding its binary encoding as base64
/// plus both hashes so a reader can verify the projection without
/// re-deriving the canonical bytes from the JSON body itself.
pub fn to_json_projection(env: &DecisionEnvelopeV1, linked_data: bool) -> JsonProjection {
    let bytes = to_binary(env);
    let proto_sha256 = sha256_hex(&bytes);
    let signed_payload_sha256 = env.authority.signed_payload_hash.clone();

    JsonProjection {
        canonical: CanonicalEnvelope {
            proto_sha256,
            signed_payload_sha256,
            proto_b64: BASE64.encode(&bytes),
        },
        context: linked_data.then(|| "https://schema.org/ward-kernel/decision-envelope/v1".to_string()),
        type_: linked_data.then(|| "DecisionEnvelopeV1".to_string()),
        envelope: env.clone(),
    }
}

/// Recover the envelope from its JSON projection, verifying that the
/// embedded `proto_b64` bytes hash to `proto_sha256` and that decoding
/// them round-trips byte-identically.
pub fn from_json_projection(projection: &JsonProjection) -> KernelResult<DecisionEnvelopeV1> {
    let bytes = BASE64
        .decode(&projection.canonical.proto_b64)
        .map_err(|e| KernelError::validation(format!("invalid proto_b64: {e}")))?;

    let actual_hash = sha256_hex(&bytes);
    if actual_hash != projection.canonical.proto_sha256 {
        return Err(KernelError::crypto("proto_sha256 mismatch in JSON projection"));
    }

    let env = from_binary(&bytes)?;
    let reencoded = to_binary(&env);
    if reencoded != bytes {
        return Err(KernelError::validation("binary round-trip mismatch"));
    }

    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::*;

    fn sample() -> DecisionEnvelopeV1 {
        let rules = vec![Rule {
            capability: "nav.move".into(),
            target: "site-A".into(),
            boundary: BoundaryBehavior::AutoAllow,
            recovery: None,
        }];
        let env = make_envelope_v1(
            "env-wire-1",
            "mission-1",
            "swarm-1",
            "issuer-1",
            "key-1",
            0,
            1_000_000_000,
            ["agent-1".to_string()],
            ["nav.move".to_string()],
            ["site-A".to_string()],
            ["phase-1".to_string()],
            ResourceConstraints {
                power_min: 40.0,
                bandwidth_min: 10.0,
                thermal_max: 85.0,
            },
            RiskTier::Medium,
            rules,
        );
        sign_envelope_hmac(env, b"secret", 10).unwrap()
    }

    #[test]
    fn property5_json_projection_round_trips_byte_identical() {
        let env = sample();
        let original_bytes = to_binary(&env);

        let projection = to_json_projection(&env, true);
        let recovered = from_json_projection(&projection).unwrap();
        let recovered_bytes = to_binary(&recovered);

        assert_eq!(original_bytes, recovered_bytes);
        assert_eq!(recovered, env);
    }
}
