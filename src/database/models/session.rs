//! Session model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CachedEntity;

/// Total validity window of a session.
pub const SESSION_VALIDITY: Duration = Duration::days(14);

/// A logged-in browser session, addressed by the hash of its token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// SHA-256 hex digest of the session token.
    pub session_hash: String,
    pub user_id: String,
    pub created: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub expires: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Session {
    /// Create a session starting at `now`.
    pub fn new(
        id: impl Into<String>,
        session_hash: impl Into<String>,
        user_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            session_hash: session_hash.into(),
            user_id: user_id.into(),
            created: now,
            last_login: now,
            expires: now + SESSION_VALIDITY,
            ip: None,
            platform: None,
            user_agent: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// True once less than a quarter of the validity window remains.
    pub fn needs_extension(&self, now: DateTime<Utc>) -> bool {
        self.expires - now < SESSION_VALIDITY / 4
    }

    /// Push the expiry a full window past `now`.
    pub fn extend(&mut self, now: DateTime<Utc>) {
        self.last_login = now;
        self.expires = now + SESSION_VALIDITY;
    }
}

impl CachedEntity for Session {
    fn value_key(&self) -> String {
        self.session_hash.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_threshold() {
        let now = Utc::now();
        let mut session = Session::new("s1", "hash", "u1", now);
        assert!(!session.needs_extension(now));

        session.expires = now + Duration::days(3);
        assert!(session.needs_extension(now));

        session.extend(now);
        assert_eq!(session.expires, now + SESSION_VALIDITY);
        assert!(!session.is_expired(now));
    }
}
