//! Utility functions.

use sha2::{Digest, Sha256};

/// Hash a raw bearer token into the key it is stored and cached under.
///
/// Returns the lowercase hex SHA-256 digest.
pub fn hash_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

/// Lowercase a slug before it is used as a lookup key.
pub fn normalize_slug(slug: &str) -> String {
    slug.trim().to_lowercase()
}
