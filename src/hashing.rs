//! Hashing - SHA-256 for Sheet Manifests
//!
//! Deterministic hashes let a shop prove which layout a sheet was printed
//! from and reproduce it bit for bit.

use sha2::{Digest, Sha256};
use serde::Serialize;
use serde_json::{to_string, Value};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Compute manifest hash for a rendered sheet record
pub fn compute_manifest_hash<T: Serialize>(manifest: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(manifest)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Compute job hash for audit logging
/// job_hash = sha256(paper_key + canonical_payload + engine_version)
pub fn compute_job_hash(
    paper_key: &str,
    payload: &impl Serialize,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical_payload = canonical_json(payload)?;
    let combined = format!("{}:{}:{}", paper_key, canonical_payload, engine_version);
    Ok(sha256_hex(combined.as_bytes()))
}

// We need hex encoding
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
        let obj = json!({"widthMm": 30.0, "heightMm": 40.0, "key": "3x4"});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"heightMm":40.0,"key":"3x4","widthMm":30.0}"#);
    }

    #[test]
    fn test_hash_deterministic() {
        let data = b"sheet pixels";
        let h1 = sha256_hex(data);
        let h2 = sha256_hex(data);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_job_hash_depends_on_paper() {
        let payload = json!({"photos": [{"source": "p.png", "size": "3x4", "count": 4}]});
        let a4 = compute_job_hash("a4", &payload, "1.0.0").unwrap();
        let small = compute_job_hash("10x15", &payload, "1.0.0").unwrap();
        assert_ne!(a4, small);
        assert_eq!(a4, compute_job_hash("a4", &payload, "1.0.0").unwrap());
    }
}
