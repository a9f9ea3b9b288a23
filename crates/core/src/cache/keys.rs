//! Cache key layout.
//!
//! The by-id and by-username keys for one contributor are disjoint; the
//! coordinator's key index links them for invalidation.

const PREFIX: &str = "contributor:";
const USERNAME_PREFIX: &str = "contributor:username:";

/// Key caching a contributor looked up by id.
pub fn by_id(id: &str) -> String {
    format!("{PREFIX}{id}")
}

/// Key caching a contributor looked up by username.
pub fn by_username(username: &str) -> String {
    format!("{USERNAME_PREFIX}{username}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(by_id("65a1f0c2e4b0a1b2c3d4e5f6"), "contributor:65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(by_username("alice"), "contributor:username:alice");
    }

    #[test]
    fn test_keys_disjoint() {
        assert_ne!(by_id("alice"), by_username("alice"));
    }
}
