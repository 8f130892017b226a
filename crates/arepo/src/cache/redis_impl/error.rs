use redis::{ErrorKind, RedisError};

use arepo_core::cache::CacheError;

/// Maps a Redis failure onto [`CacheError`].
///
/// A reply that does not convert to bytes is reported as `Serialization`,
/// so readers discard it like any other undecodable entry.
pub fn map_redis_error(err: RedisError) -> CacheError {
    match err.kind() {
        ErrorKind::TypeError => CacheError::Serialization(err.to_string()),
        ErrorKind::IoError | ErrorKind::AuthenticationFailed | ErrorKind::InvalidClientConfig => {
            CacheError::ConnectionFailed(err.to_string())
        }
        _ if err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() => {
            CacheError::ConnectionFailed(err.to_string())
        }
        _ => CacheError::OperationFailed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_refused_connection() {
        let err = RedisError::from(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(matches!(map_redis_error(err), CacheError::ConnectionFailed(_)));
    }

    #[test]
    fn test_bad_configuration_is_a_connection_failure() {
        let err = RedisError::from((ErrorKind::InvalidClientConfig, "bad url"));
        assert!(matches!(map_redis_error(err), CacheError::ConnectionFailed(_)));

        let err = RedisError::from((ErrorKind::AuthenticationFailed, "wrong password"));
        assert!(matches!(map_redis_error(err), CacheError::ConnectionFailed(_)));
    }

    #[test]
    fn test_incompatible_reply_is_serialization() {
        let err = RedisError::from((ErrorKind::TypeError, "not a bulk string"));
        let mapped = map_redis_error(err);

        assert!(matches!(mapped, CacheError::Serialization(_)));
        assert!(!mapped.is_backend());
    }

    #[test]
    fn test_server_side_failure_is_operation_failed() {
        let err = RedisError::from((ErrorKind::ReadOnly, "replica is read-only"));
        assert!(matches!(map_redis_error(err), CacheError::OperationFailed(_)));
    }
}
