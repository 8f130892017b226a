//! Opaque document identifier.
//!
//! An [`ObjectId`] is a 12-byte value rendered as a 24-character lowercase
//! hexadecimal string. Generated ids use the conventional layout:
//!
//! | bytes  | content                                   |
//! |--------|-------------------------------------------|
//! | 0..4   | seconds since the Unix epoch, big-endian  |
//! | 4..9   | random value, fixed per process           |
//! | 9..12  | counter, big-endian, randomly seeded      |

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of an identifier in bytes.
pub const OBJECT_ID_LEN: usize = 12;

/// Length of the hexadecimal form of an identifier.
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

const COUNTER_MASK: u32 = 0x00ff_ffff;

static PROCESS_UNIQUE: LazyLock<[u8; 5]> = LazyLock::new(rand::random);

static COUNTER: LazyLock<AtomicU32> =
    LazyLock::new(|| AtomicU32::new(rand::random::<u32>() & COUNTER_MASK));

/// Errors produced when parsing an identifier from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectIdError {
    #[error("Malformed identifier {input:?}: {reason}")]
    Malformed { input: String, reason: String },
}

/// Opaque 12-byte document identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// The nil identifier. Never produced by [`ObjectId::new`].
    pub const NIL: ObjectId = ObjectId([0; OBJECT_ID_LEN]);

    /// Generates a new identifier.
    pub fn new() -> Self {
        let seconds = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..]);

        // A zero timestamp, zero random part and zero counter in the same
        // id would collide with NIL.
        if bytes == Self::NIL.0 {
            bytes[11] = 1;
        }

        Self(bytes)
    }

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub const fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Parses the 24-character hexadecimal form.
    ///
    /// # Examples
    ///
    /// ```
    /// use arepo_core::ObjectId;
    ///
    /// let id = ObjectId::parse_str("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
    /// assert_eq!(id.to_hex(), "65a1f0c2e4b0a1b2c3d4e5f6");
    ///
    /// assert!(ObjectId::parse_str("not-an-id").is_err());
    /// ```
    pub fn parse_str(input: &str) -> Result<Self, ObjectIdError> {
        if input.len() != OBJECT_ID_HEX_LEN {
            return Err(ObjectIdError::Malformed {
                input: input.to_string(),
                reason: format!(
                    "expected {} hex characters, got {}",
                    OBJECT_ID_HEX_LEN,
                    input.len()
                ),
            });
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::decode_to_slice(input, &mut bytes).map_err(|e| ObjectIdError::Malformed {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self(bytes))
    }

    /// Renders the lowercase hexadecimal form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns true for [`ObjectId::NIL`].
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// Creation time embedded in the first four bytes.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let mut seconds = [0u8; 4];
        seconds.copy_from_slice(&self.0[0..4]);
        Utc.timestamp_opt(u32::from_be_bytes(seconds) as i64, 0)
            .single()
            .unwrap_or_default()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl TryFrom<&str> for ObjectId {
    type Error = ObjectIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse_str(value)
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Accepted serialized forms: `"<hex>"` and `{"$oid": "<hex>"}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ObjectIdRepr {
    Hex(String),
    Extended {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = match ObjectIdRepr::deserialize(deserializer)? {
            ObjectIdRepr::Hex(hex) => hex,
            ObjectIdRepr::Extended { oid } => oid,
        };
        ObjectId::parse_str(&hex).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const SAMPLE: &str = "65a1f0c2e4b0a1b2c3d4e5f6";

    #[test]
    fn test_hex_roundtrip() {
        let id = ObjectId::parse_str(SAMPLE).unwrap();
        assert_eq!(id.to_hex(), SAMPLE);
        assert_eq!(id.to_string(), SAMPLE);
        assert_eq!(SAMPLE.parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn test_uppercase_hex_is_accepted_and_normalized() {
        let id = ObjectId::parse_str(&SAMPLE.to_uppercase()).unwrap();
        assert_eq!(id.to_hex(), SAMPLE);
    }

    #[test]
    fn test_wrong_length_is_malformed() {
        let err = ObjectId::parse_str("65a1f0").unwrap_err();
        assert!(matches!(err, ObjectIdError::Malformed { .. }));

        let err = ObjectId::parse_str("").unwrap_err();
        assert!(matches!(err, ObjectIdError::Malformed { .. }));
    }

    #[test]
    fn test_non_hex_is_malformed() {
        let err = ObjectId::parse_str("zza1f0c2e4b0a1b2c3d4e5f6").unwrap_err();
        match err {
            ObjectIdError::Malformed { input, .. } => {
                assert_eq!(input, "zza1f0c2e4b0a1b2c3d4e5f6");
            }
        }
    }

    #[test]
    fn test_nil() {
        assert!(ObjectId::NIL.is_nil());
        assert!(ObjectId::default().is_nil());
        assert_eq!(ObjectId::NIL.to_hex(), "000000000000000000000000");
        assert!(!ObjectId::parse_str(SAMPLE).unwrap().is_nil());
    }

    #[test]
    fn test_generated_ids_are_unique_and_not_nil() {
        let ids: HashSet<ObjectId> = (0..1_000).map(|_| ObjectId::new()).collect();
        assert_eq!(ids.len(), 1_000);
        assert!(ids.iter().all(|id| !id.is_nil()));
    }

    #[test]
    fn test_generated_id_timestamp_is_recent() {
        let before = Utc::now().timestamp();
        let id = ObjectId::new();
        let after = Utc::now().timestamp();

        let ts = id.timestamp().timestamp();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let id = ObjectId::parse_str(SAMPLE).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", SAMPLE));

        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_deserialize_extended_json() {
        let json = format!("{{\"$oid\":\"{}\"}}", SAMPLE);
        let id: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id.to_hex(), SAMPLE);
    }

    #[test]
    fn test_deserialize_malformed_fails() {
        let result: Result<ObjectId, _> = serde_json::from_str("\"nope\"");
        assert!(result.is_err());
    }
}
