//! Organization model.

use serde::{Deserialize, Serialize};

use super::Team;
use crate::cache::CachedEntity;
use crate::utils::normalize_slug;

/// An organization owning projects through its team.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Stable organization ID.
    pub id: String,
    /// URL slug (always lowercase).
    pub slug: String,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Team holding the organization's members.
    pub team_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
}

impl Organization {
    /// Create a new organization, normalizing the slug.
    pub fn new(
        id: impl Into<String>,
        slug: &str,
        name: impl Into<String>,
        team_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            slug: normalize_slug(slug),
            name: name.into(),
            description: String::new(),
            team_id: team_id.into(),
            icon_url: None,
            color: None,
        }
    }
}

/// Cached as `slug -> organization` plus `id -> slug`.
impl CachedEntity for Organization {
    fn value_key(&self) -> String {
        self.slug.clone()
    }

    fn alias_key(&self) -> Option<String> {
        Some(self.id.clone())
    }
}

/// An organization joined with its owning team.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrganizationWithTeam {
    pub organization: Organization,
    pub team: Team,
}
