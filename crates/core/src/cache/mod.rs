mod error;
mod hashing;
mod keys;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use hashing::{canonical_json, filter_hash};
pub use keys::{
    custom_namespace, id_key, id_namespace, CacheKey, CUSTOM_SEGMENT, ID_SEGMENT, KEY_SEPARATOR,
};
pub use serialization::{decode, encode, SerializationError};
pub use traits::{Cache, CacheExt};
