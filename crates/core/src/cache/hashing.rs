//! Content hashing for query filters.
//!
//! A filter is encoded to canonical JSON (object keys sorted recursively,
//! array order kept) and digested with SHA-256. Logically equal filters built
//! with different key orders therefore share a hash.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::serialization::{Result, SerializationError};

/// Encodes a value as canonical JSON bytes.
pub fn canonical_json<T>(value: &T) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(value)
        .map_err(|e| SerializationError::SerializeFailed(e.to_string()))?;
    let mut out = Vec::new();
    write_canonical(&value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

            out.push(b'{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)
                    .map_err(|e| SerializationError::SerializeFailed(e.to_string()))?;
                out.push(b':');
                write_canonical(value, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => {
            serde_json::to_writer(&mut *out, scalar)
                .map_err(|e| SerializationError::SerializeFailed(e.to_string()))?;
        }
    }
    Ok(())
}

/// Returns the lowercase hex SHA-256 digest of the filter's canonical encoding.
pub fn filter_hash<T>(filter: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    let content = canonical_json(filter)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}
