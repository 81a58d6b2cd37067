use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    DirectoryFilter, Hospital, HospitalDetails, HospitalId, Professional, ProfessionalDetails,
    ProfessionalId, ProfessionalStatus,
};
use super::repository::{DirectoryStore, EmailUniqueness, StoreError};

/// Process-local store. Ids grow monotonically, so map order is insertion order.
#[derive(Debug, Default)]
pub struct MemoryDirectoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    hospitals: BTreeMap<HospitalId, Hospital>,
    professionals: BTreeMap<ProfessionalId, Professional>,
    last_hospital_id: i64,
    last_professional_id: i64,
}

impl MemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".to_string()))
    }
}

impl DirectoryStore for MemoryDirectoryStore {
    fn insert_hospital(
        &self,
        details: HospitalDetails,
        created_at: DateTime<Utc>,
    ) -> Result<Hospital, StoreError> {
        let mut state = self.lock()?;
        state.last_hospital_id += 1;
        let hospital = Hospital {
            id: HospitalId(state.last_hospital_id),
            details,
            created_at,
        };
        state.hospitals.insert(hospital.id, hospital.clone());
        Ok(hospital)
    }

    fn fetch_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, StoreError> {
        Ok(self.lock()?.hospitals.get(&id).cloned())
    }

    fn list_hospitals(&self, limit: Option<usize>) -> Result<Vec<Hospital>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .hospitals
            .values()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn count_hospitals(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.hospitals.len())
    }

    fn delete_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, StoreError> {
        let mut state = self.lock()?;
        if !state.hospitals.contains_key(&id) {
            return Ok(None);
        }
        let referenced = state
            .professionals
            .values()
            .any(|professional| professional.details.hospital_id == id);
        if referenced {
            return Err(StoreError::HospitalInUse(id));
        }
        Ok(state.hospitals.remove(&id))
    }

    fn insert_professional(
        &self,
        details: ProfessionalDetails,
        email: EmailUniqueness,
        created_at: DateTime<Utc>,
    ) -> Result<Professional, StoreError> {
        let mut state = self.lock()?;

        if !state.hospitals.contains_key(&details.hospital_id) {
            return Err(StoreError::UnknownHospital(details.hospital_id));
        }

        if email.is_enforced() {
            if let Some(address) = details.email.as_deref() {
                let holder = state.professionals.values().find(|existing| {
                    existing.status.is_active()
                        && existing
                            .details
                            .email
                            .as_deref()
                            .is_some_and(|other| other.eq_ignore_ascii_case(address))
                });
                if let Some(holder) = holder {
                    return Err(StoreError::DuplicateEmail {
                        email: address.to_string(),
                        status: holder.status,
                    });
                }
            }
        }

        state.last_professional_id += 1;
        let professional = Professional {
            id: ProfessionalId(state.last_professional_id),
            details,
            status: ProfessionalStatus::Pending,
            created_at,
            updated_at: created_at,
        };
        state
            .professionals
            .insert(professional.id, professional.clone());
        Ok(professional)
    }

    fn fetch_professional(&self, id: ProfessionalId) -> Result<Option<Professional>, StoreError> {
        Ok(self.lock()?.professionals.get(&id).cloned())
    }

    fn list_professionals(
        &self,
        status: ProfessionalStatus,
        filter: &DirectoryFilter,
    ) -> Result<Vec<Professional>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .professionals
            .values()
            .filter(|professional| professional.status == status && filter.matches(professional))
            .cloned()
            .collect())
    }

    fn compare_and_set_status(
        &self,
        id: ProfessionalId,
        expected: ProfessionalStatus,
        next: ProfessionalStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Professional>, StoreError> {
        let mut state = self.lock()?;
        match state.professionals.get_mut(&id) {
            Some(professional) if professional.status == expected => {
                professional.status = next;
                professional.updated_at = updated_at;
                Ok(Some(professional.clone()))
            }
            _ => Ok(None),
        }
    }

    fn delete_professional(&self, id: ProfessionalId) -> Result<Option<Professional>, StoreError> {
        Ok(self.lock()?.professionals.remove(&id))
    }
}
