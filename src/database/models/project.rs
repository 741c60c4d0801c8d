//! Project model, as read by the search synchronizer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation status of a project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Processing,
    Approved,
    Archived,
    Rejected,
    Withheld,
}

impl ProjectStatus {
    /// Statuses whose projects may appear in search.
    pub fn is_searchable(self) -> bool {
        matches!(self, ProjectStatus::Approved | ProjectStatus::Archived)
    }
}

/// Who can see a project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
}

/// Client or server environment support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideSupport {
    Required,
    Optional,
    Unsupported,
    Unknown,
}

/// A gallery image attached to a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub url: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub ordering: i64,
}

/// A hosted project (mod, modpack, resource pack, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub slug: Option<String>,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub color: Option<u32>,

    #[serde(default)]
    pub project_types: Vec<String>,
    #[serde(default)]
    pub loaders: Vec<String>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub additional_categories: Vec<String>,

    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub follows: u64,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,

    #[serde(default)]
    pub source_url: Option<String>,
    pub client_side: SideSupport,
    pub server_side: SideSupport,
    #[serde(default)]
    pub gallery: Vec<GalleryItem>,

    pub team_id: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    pub status: ProjectStatus,
    pub visibility: Visibility,
}

impl Project {
    /// Whether this project belongs in the search index.
    pub fn is_searchable(&self) -> bool {
        self.visibility == Visibility::Public && self.status.is_searchable()
    }

    /// URL of the first featured gallery image, by gallery ordering.
    pub fn featured_gallery(&self) -> Option<&str> {
        self.gallery
            .iter()
            .filter(|item| item.featured)
            .min_by_key(|item| item.ordering)
            .map(|item| item.url.as_str())
    }

    pub fn is_open_source(&self) -> bool {
        self.source_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}
