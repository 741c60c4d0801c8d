//! Personal access token model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CachedEntity;

/// Minimum time between two `last_used` writes for the same token.
pub const PAT_USAGE_COOLDOWN: Duration = Duration::minutes(5);

/// A personal access token. Only the hash of the secret is stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonalAccessToken {
    pub id: String,
    pub name: String,
    /// SHA-256 hex digest of the raw token.
    pub token_hash: String,
    /// Granted scope bits.
    pub scopes: u64,
    pub user_id: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

impl PersonalAccessToken {
    /// Whether a read at `now` should record usage in the store.
    pub fn needs_usage_stamp(&self, now: DateTime<Utc>) -> bool {
        self.last_used
            .is_none_or(|last_used| now - last_used > PAT_USAGE_COOLDOWN)
    }
}

/// Cached as `token hash -> PAT` plus `id -> token hash`.
impl CachedEntity for PersonalAccessToken {
    fn value_key(&self) -> String {
        self.token_hash.clone()
    }

    fn alias_key(&self) -> Option<String> {
        Some(self.id.clone())
    }
}
