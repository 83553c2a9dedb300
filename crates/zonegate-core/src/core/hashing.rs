// crates/zonegate-core/src/core/hashing.rs
// ============================================================================
// Module: Zonegate Canonical Hashing
// Description: RFC 8785 canonical JSON and SHA-256 digests for ledger records.
// Purpose: Provide deterministic hashes for evidence snapshots and the audit chain.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Every record that participates in tamper evidence is hashed over its RFC
//! 8785 (JCS) canonical JSON form, so two processes serializing the same
//! record always agree on the digest. Audit chain links are computed by
//! [`chain_digest`], which prefixes the canonical body with the previous
//! link's hex digest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported hash algorithms for ledger records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing.
    Sha256,
}

impl HashAlgorithm {
    /// Returns the stable label stored alongside persisted digests.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

/// Default hash algorithm for zonegate records.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Previous-hash value carried by the first audit entry of a chain.
pub const GENESIS_HASH: &str = "0";

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Deterministic content hash representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Hash algorithm identifier.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Creates a new digest from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex_encode(bytes),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes canonical JSON using the provided algorithm.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes using the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            HashDigest::new(HashAlgorithm::Sha256, &hasher.finalize())
        }
    }
}

/// Computes a chain link digest: `sha256(previous_hash || canonical(body))`.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the body cannot be serialized.
pub fn chain_digest<T: Serialize + ?Sized>(
    previous_hash: &str,
    body: &T,
) -> Result<HashDigest, HashError> {
    let body_bytes = canonical_json_bytes(body)?;
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(&body_bytes);
    Ok(HashDigest::new(HashAlgorithm::Sha256, &hasher.finalize()))
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_hash_ignores_key_order() {
        let left = json!({"b": 1, "a": [true, null]});
        let right = json!({"a": [true, null], "b": 1});
        let left_hash = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &left).expect("hash");
        let right_hash = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &right).expect("hash");
        assert_eq!(left_hash, right_hash);
    }

    #[test]
    fn sha256_of_empty_input_matches_known_vector() {
        let digest = hash_bytes(HashAlgorithm::Sha256, b"");
        assert_eq!(
            digest.value,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn chain_digest_depends_on_previous_hash() {
        let body = json!({"action": "create_pre_alert"});
        let first = chain_digest(GENESIS_HASH, &body).expect("digest");
        let second = chain_digest(&first.value, &body).expect("digest");
        assert_ne!(first.value, second.value);
        assert_eq!(first.value.len(), 64);
    }
}
