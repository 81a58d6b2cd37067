use chrono::{DateTime, Utc};

use super::domain::{
    DirectoryFilter, Hospital, HospitalDetails, HospitalId, Professional, ProfessionalDetails,
    ProfessionalId, ProfessionalStatus,
};

/// Whether a registration email must be unique among active (pending or approved) records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailUniqueness {
    #[default]
    Enforced,
    Relaxed,
}

impl EmailUniqueness {
    pub const fn is_enforced(self) -> bool {
        matches!(self, EmailUniqueness::Enforced)
    }
}

/// Storage abstraction so the directory service can run over memory or SQLite.
///
/// Every method is atomic with respect to a single record: an insert either lands with all of
/// its invariants checked or not at all, and status updates are compare-and-set.
pub trait DirectoryStore: Send + Sync {
    fn insert_hospital(
        &self,
        details: HospitalDetails,
        created_at: DateTime<Utc>,
    ) -> Result<Hospital, StoreError>;

    fn fetch_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, StoreError>;

    /// Hospitals in insertion order, truncated to `limit` when given.
    fn list_hospitals(&self, limit: Option<usize>) -> Result<Vec<Hospital>, StoreError>;

    fn count_hospitals(&self) -> Result<usize, StoreError>;

    /// Removes a hospital unless professionals still reference it.
    fn delete_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, StoreError>;

    /// Inserts a `pending` professional with `created_at == updated_at`.
    ///
    /// Fails with [`StoreError::UnknownHospital`] when the hospital reference does not
    /// resolve, and with [`StoreError::DuplicateEmail`] when `email` is enforced and an active
    /// record already holds the normalized address.
    fn insert_professional(
        &self,
        details: ProfessionalDetails,
        email: EmailUniqueness,
        created_at: DateTime<Utc>,
    ) -> Result<Professional, StoreError>;

    fn fetch_professional(&self, id: ProfessionalId) -> Result<Option<Professional>, StoreError>;

    /// Professionals in `status` matching every constraint of `filter`, in insertion order.
    fn list_professionals(
        &self,
        status: ProfessionalStatus,
        filter: &DirectoryFilter,
    ) -> Result<Vec<Professional>, StoreError>;

    /// Moves a record from `expected` to `next`. Returns `None` when the record is missing or
    /// its status no longer equals `expected`.
    fn compare_and_set_status(
        &self,
        id: ProfessionalId,
        expected: ProfessionalStatus,
        next: ProfessionalStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Professional>, StoreError>;

    fn delete_professional(&self, id: ProfessionalId) -> Result<Option<Professional>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("hospital {0} does not exist")]
    UnknownHospital(HospitalId),
    #[error("email {email} is already registered with status {status}")]
    DuplicateEmail {
        email: String,
        status: ProfessionalStatus,
    },
    #[error("hospital {0} is still referenced by registered professionals")]
    HospitalInUse(HospitalId),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
