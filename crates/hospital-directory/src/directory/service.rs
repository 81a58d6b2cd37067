use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    DirectoryFilter, Hospital, HospitalId, Professional, ProfessionalId, ProfessionalStatus,
};
use super::moderation::{
    self, ModerationAction, ModerationError, ModerationOutcome, RejectPolicy, Transition,
};
use super::repository::{DirectoryStore, EmailUniqueness, StoreError};
use super::seed::sample_hospitals;
use super::validation::{HospitalForm, RegistrationForm, ValidationError};

/// A lost compare-and-set is re-planned this many times before giving up.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Deployment-level choices for the moderation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectoryPolicy {
    pub reject: RejectPolicy,
    pub email: EmailUniqueness,
}

/// Service composing a directory store with the configured moderation policy.
pub struct DirectoryService<S> {
    store: Arc<S>,
    policy: DirectoryPolicy,
}

impl<S> DirectoryService<S>
where
    S: DirectoryStore + 'static,
{
    pub fn new(store: Arc<S>, policy: DirectoryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> DirectoryPolicy {
        self.policy
    }

    pub fn create_hospital(&self, form: HospitalForm) -> Result<Hospital, DirectoryError> {
        let details = form.validate()?;
        let hospital = self.store.insert_hospital(details, Utc::now())?;
        info!(hospital_id = %hospital.id, name = %hospital.details.name, "hospital created");
        Ok(hospital)
    }

    pub fn list_hospitals(&self, limit: Option<usize>) -> Result<Vec<Hospital>, DirectoryError> {
        Ok(self.store.list_hospitals(limit)?)
    }

    pub fn get_hospital(&self, id: HospitalId) -> Result<Hospital, DirectoryError> {
        self.store
            .fetch_hospital(id)?
            .ok_or(DirectoryError::HospitalNotFound(id))
    }

    /// Deletes a hospital that no professional references.
    pub fn delete_hospital(&self, id: HospitalId) -> Result<Hospital, DirectoryError> {
        let removed = self
            .store
            .delete_hospital(id)?
            .ok_or(DirectoryError::HospitalNotFound(id))?;
        info!(hospital_id = %id, "hospital deleted");
        Ok(removed)
    }

    /// Loads the sample hospital network when the directory has no hospitals yet.
    pub fn seed_sample_hospitals(&self) -> Result<usize, DirectoryError> {
        if self.store.count_hospitals()? > 0 {
            debug!("hospitals already present; skipping sample data");
            return Ok(0);
        }

        let now = Utc::now();
        let mut inserted = 0;
        for details in sample_hospitals() {
            self.store.insert_hospital(details, now)?;
            inserted += 1;
        }
        info!(inserted, "seeded sample hospitals");
        Ok(inserted)
    }

    /// Accept a public registration. The record starts `pending` and stays invisible until
    /// an administrator approves it.
    pub fn register(&self, form: RegistrationForm) -> Result<Professional, DirectoryError> {
        let details = form.validate()?;

        if self.store.fetch_hospital(details.hospital_id)?.is_none() {
            return Err(ValidationError::UnknownHospital(details.hospital_id).into());
        }

        let professional = self
            .store
            .insert_professional(details, self.policy.email, Utc::now())?;
        info!(
            professional_id = %professional.id,
            hospital_id = %professional.details.hospital_id,
            "registration received"
        );
        Ok(professional)
    }

    pub fn get_professional(&self, id: ProfessionalId) -> Result<Professional, DirectoryError> {
        self.store
            .fetch_professional(id)?
            .ok_or(DirectoryError::ProfessionalNotFound(id))
    }

    /// Public directory listing: approved professionals matching every filter.
    pub fn list_approved(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<Professional>, DirectoryError> {
        Ok(self
            .store
            .list_professionals(ProfessionalStatus::Approved, filter)?)
    }

    /// Administrator review queue.
    pub fn list_pending(&self) -> Result<Vec<Professional>, DirectoryError> {
        Ok(self
            .store
            .list_professionals(ProfessionalStatus::Pending, &DirectoryFilter::default())?)
    }

    pub fn approve(&self, id: ProfessionalId) -> Result<ModerationOutcome, DirectoryError> {
        self.moderate(id, ModerationAction::Approve)
    }

    pub fn reject(&self, id: ProfessionalId) -> Result<ModerationOutcome, DirectoryError> {
        self.moderate(id, ModerationAction::Reject)
    }

    fn moderate(
        &self,
        id: ProfessionalId,
        action: ModerationAction,
    ) -> Result<ModerationOutcome, DirectoryError> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let current = self
                .store
                .fetch_professional(id)?
                .ok_or(DirectoryError::ProfessionalNotFound(id))?;

            match moderation::plan(current.status, action, self.policy.reject)? {
                Transition::Skip => {
                    info!(
                        professional_id = %id,
                        action = action.label(),
                        status = %current.status,
                        "moderation already applied"
                    );
                    return Ok(ModerationOutcome::Unchanged(current));
                }
                Transition::Remove => {
                    let removed = self
                        .store
                        .delete_professional(id)?
                        .ok_or(DirectoryError::ProfessionalNotFound(id))?;
                    info!(
                        professional_id = %id,
                        action = action.label(),
                        "registration removed"
                    );
                    return Ok(ModerationOutcome::Removed(removed));
                }
                Transition::Move(next) => {
                    let updated = self.store.compare_and_set_status(
                        id,
                        current.status,
                        next,
                        Utc::now(),
                    )?;
                    if let Some(updated) = updated {
                        info!(
                            professional_id = %id,
                            action = action.label(),
                            from = %current.status,
                            to = %next,
                            "moderation applied"
                        );
                        return Ok(ModerationOutcome::Applied(updated));
                    }
                    debug!(professional_id = %id, "status changed during moderation; re-reading");
                }
            }
        }

        warn!(
            professional_id = %id,
            action = action.label(),
            "moderation abandoned after repeated conflicts"
        );
        Err(DirectoryError::Contended(id))
    }
}

/// Error raised by the directory service.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("hospital {0} not found")]
    HospitalNotFound(HospitalId),
    #[error("professional {0} not found")]
    ProfessionalNotFound(ProfessionalId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Moderation(#[from] ModerationError),
    #[error("hospital {0} is still referenced by registered professionals")]
    HospitalInUse(HospitalId),
    #[error("professional {0} kept changing status; retry the action")]
    Contended(ProfessionalId),
    #[error(transparent)]
    Store(StoreError),
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DirectoryError::HospitalNotFound(_) | DirectoryError::ProfessionalNotFound(_)
        )
    }
}

impl From<StoreError> for DirectoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::UnknownHospital(id) => {
                Self::Validation(ValidationError::UnknownHospital(id))
            }
            StoreError::DuplicateEmail { email, status } => {
                Self::Validation(ValidationError::DuplicateEmail { email, status })
            }
            StoreError::HospitalInUse(id) => Self::HospitalInUse(id),
            other => Self::Store(other),
        }
    }
}
