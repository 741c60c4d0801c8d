//! Search index documents.

use serde::{Deserialize, Serialize};

use crate::database::{Project, SideSupport, Visibility};

/// One project as stored in the search index.
///
/// Every field is recomputed from the store at hydration time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub project_id: String,
    pub name: String,
    pub slug: Option<String>,
    pub icon_url: Option<String>,
    pub summary: String,

    pub loaders: Vec<String>,
    pub project_types: Vec<String>,
    pub game_versions: Vec<String>,
    /// Primary and additional categories together.
    pub categories: Vec<String>,

    pub downloads: u64,
    /// Downloads over the recent window, computed per sync cycle.
    pub recent_downloads: u64,
    pub follows: u64,

    pub date_created: String,
    pub created_timestamp: i64,
    pub date_modified: String,
    pub modified_timestamp: i64,

    pub open_source: bool,
    pub client_side: SideSupport,
    pub server_side: SideSupport,
    pub featured_gallery: Option<String>,
    pub color: Option<u32>,
    pub is_org_owned: bool,
    pub visibility: Visibility,
}

impl SearchDocument {
    pub fn from_project(project: &Project, recent_downloads: u64) -> Self {
        let mut categories = project.categories.clone();
        for category in &project.additional_categories {
            if !categories.contains(category) {
                categories.push(category.clone());
            }
        }

        Self {
            project_id: project.id.clone(),
            name: project.name.clone(),
            slug: project.slug.clone(),
            icon_url: project.icon_url.clone(),
            summary: project.summary.clone(),
            loaders: project.loaders.clone(),
            project_types: project.project_types.clone(),
            game_versions: project.game_versions.clone(),
            categories,
            downloads: project.downloads,
            recent_downloads,
            follows: project.follows,
            date_created: project.published.to_rfc3339(),
            created_timestamp: project.published.timestamp(),
            date_modified: project.updated.to_rfc3339(),
            modified_timestamp: project.updated.timestamp(),
            open_source: project.is_open_source(),
            client_side: project.client_side,
            server_side: project.server_side,
            featured_gallery: project.featured_gallery().map(str::to_string),
            color: project.color,
            is_org_owned: project.organization_id.is_some(),
            visibility: project.visibility,
        }
    }
}
