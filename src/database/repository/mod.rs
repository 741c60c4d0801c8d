//! Repository module - cached access to each entity kind.

mod organization_repository;
mod pat_repository;
mod session_repository;

pub use organization_repository::OrganizationRepository;
pub use pat_repository::PatRepository;
pub use session_repository::SessionRepository;
