//! Team model.

use serde::{Deserialize, Serialize};

use crate::cache::CachedEntity;

/// A member's role within a team.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    pub role: String,
    /// Whether the member accepted the invite.
    #[serde(default)]
    pub accepted: bool,
}

/// A group of users owning a project or organization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

impl CachedEntity for Team {
    fn value_key(&self) -> String {
        self.id.clone()
    }
}
