//! Directory store, moderation workflow, and the HTTP surface consumed by presentation layers.
//!
//! Registrations enter as `pending`, an administrator approves or rejects them, and only
//! approved professionals are served by the public directory queries.

pub mod domain;
pub mod memory;
pub mod moderation;
pub mod repository;
pub mod router;
pub mod seed;
pub mod service;
pub mod sqlite;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    DirectoryFilter, Hospital, HospitalDetails, HospitalId, Professional, ProfessionalDetails,
    ProfessionalId, ProfessionalStatus, UnknownStatus,
};
pub use memory::MemoryDirectoryStore;
pub use moderation::{ModerationAction, ModerationError, ModerationOutcome, RejectPolicy};
pub use repository::{DirectoryStore, EmailUniqueness, StoreError};
pub use router::{directory_router, Pagination, ProfessionalPage, ADMIN_KEY_HEADER};
pub use service::{DirectoryError, DirectoryPolicy, DirectoryService};
pub use sqlite::SqliteDirectoryStore;
pub use validation::{HospitalForm, IdInput, RegistrationForm, ValidationError};
