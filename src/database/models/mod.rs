//! Database models.

pub mod organization;
pub mod pat;
pub mod project;
pub mod session;
pub mod team;

pub use organization::{Organization, OrganizationWithTeam};
pub use pat::{PAT_USAGE_COOLDOWN, PersonalAccessToken};
pub use project::{GalleryItem, Project, ProjectStatus, SideSupport, Visibility};
pub use session::{SESSION_VALIDITY, Session};
pub use team::{Team, TeamMember};
