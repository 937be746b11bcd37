//! Hashing System - SHA-256 for Sprite Manifests
//!
//! Reproducible hashes over pixel content, synthesis jobs and manifests.

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{Value, to_string};

use crate::pixels::PixelData;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hash of dimensions plus raw RGBA bytes. Two buffers hash equal only if
/// they are pixel-identical and the same shape.
pub fn content_hash(img: &PixelData) -> String {
    let mut hasher = Sha256::new();
    hasher.update(img.width().to_be_bytes());
    hasher.update(img.height().to_be_bytes());
    hasher.update(img.data());
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

pub fn compute_manifest_hash<T: Serialize>(manifest: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(manifest)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// job_hash = sha256(directive + base identity + engine version)
pub fn compute_job_hash(directive: &str, base_identity: &str, engine_version: &str) -> String {
    let combined = format!("{}:{}:{}", base_identity, engine_version, directive);
    sha256_hex(combined.as_bytes())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": {"y": true, "b": null}});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":{"b":null,"y":true},"z":1}"#);
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_content_hash_depends_on_shape() {
        let wide = PixelData::filled(4, 1, [1, 2, 3, 4]).unwrap();
        let tall = PixelData::filled(1, 4, [1, 2, 3, 4]).unwrap();
        assert_eq!(wide.data(), tall.data());
        assert_ne!(content_hash(&wide), content_hash(&tall));
        assert_eq!(content_hash(&wide), content_hash(&wide.clone()));
    }

    #[test]
    fn test_job_hash_changes_with_directive() {
        let a = compute_job_hash("paint armor", "8x8-0", "1.0.0");
        let b = compute_job_hash("paint robes", "8x8-0", "1.0.0");
        assert_ne!(a, b);
        assert_eq!(a, compute_job_hash("paint armor", "8x8-0", "1.0.0"));
    }
}
