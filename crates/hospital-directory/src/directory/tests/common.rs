use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::directory::domain::{
    DirectoryFilter, Hospital, HospitalDetails, HospitalId, Professional, ProfessionalDetails,
    ProfessionalId, ProfessionalStatus,
};
use crate::directory::repository::{DirectoryStore, EmailUniqueness, StoreError};
use crate::directory::validation::{HospitalForm, IdInput, RegistrationForm};
use crate::directory::{
    directory_router, DirectoryPolicy, DirectoryService, MemoryDirectoryStore, RejectPolicy,
};

pub(super) const ADMIN_KEY: &str = "review-desk";

pub(super) fn build_service() -> (
    DirectoryService<MemoryDirectoryStore>,
    Arc<MemoryDirectoryStore>,
) {
    build_service_with(DirectoryPolicy::default())
}

pub(super) fn build_service_with(
    policy: DirectoryPolicy,
) -> (
    DirectoryService<MemoryDirectoryStore>,
    Arc<MemoryDirectoryStore>,
) {
    let store = Arc::new(MemoryDirectoryStore::new());
    let service = DirectoryService::new(store.clone(), policy);
    (service, store)
}

pub(super) fn delete_on_reject() -> DirectoryPolicy {
    DirectoryPolicy {
        reject: RejectPolicy::Delete,
        ..DirectoryPolicy::default()
    }
}

pub(super) fn hospital_form(name: &str, state: &str, city: &str) -> HospitalForm {
    HospitalForm {
        name: Some(name.to_string()),
        state: Some(state.to_string()),
        city: Some(city.to_string()),
        ..HospitalForm::default()
    }
}

pub(super) fn aizawl<S: DirectoryStore + 'static>(service: &DirectoryService<S>) -> Hospital {
    service
        .create_hospital(hospital_form(
            "Aizawl Adventist Hospital",
            "Mizoram",
            "Aizawl",
        ))
        .expect("hospital created")
}

pub(super) fn registration(name: &str, role: &str, hospital_id: HospitalId) -> RegistrationForm {
    RegistrationForm {
        name: Some(name.to_string()),
        role: Some(role.to_string()),
        hospital_id: Some(IdInput::from(hospital_id)),
        ..RegistrationForm::default()
    }
}

pub(super) fn registration_with(
    name: &str,
    role: &str,
    hospital_id: HospitalId,
    specialization: &str,
    email: &str,
) -> RegistrationForm {
    RegistrationForm {
        specialization: Some(specialization.to_string()),
        email: Some(email.to_string()),
        ..registration(name, role, hospital_id)
    }
}

pub(super) fn names(professionals: &[Professional]) -> Vec<&str> {
    professionals
        .iter()
        .map(|professional| professional.details.name.as_str())
        .collect()
}

pub(super) fn router_with_service(
    service: DirectoryService<MemoryDirectoryStore>,
    admin_key: Option<&str>,
) -> axum::Router {
    directory_router(Arc::new(service), admin_key.map(str::to_string))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Memory store where another writer gets to a record before the service does.
pub(super) struct InterferingStore {
    pub(super) inner: MemoryDirectoryStore,
    interference: Mutex<Option<ProfessionalStatus>>,
    always_stale: bool,
}

impl InterferingStore {
    /// The next status write is preceded by another administrator moving the record to `status`.
    pub(super) fn once(status: ProfessionalStatus) -> Self {
        Self {
            inner: MemoryDirectoryStore::new(),
            interference: Mutex::new(Some(status)),
            always_stale: false,
        }
    }

    pub(super) fn always_stale() -> Self {
        Self {
            inner: MemoryDirectoryStore::new(),
            interference: Mutex::new(None),
            always_stale: true,
        }
    }
}

impl DirectoryStore for InterferingStore {
    fn insert_hospital(
        &self,
        details: HospitalDetails,
        created_at: DateTime<Utc>,
    ) -> Result<Hospital, StoreError> {
        self.inner.insert_hospital(details, created_at)
    }

    fn fetch_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, StoreError> {
        self.inner.fetch_hospital(id)
    }

    fn list_hospitals(&self, limit: Option<usize>) -> Result<Vec<Hospital>, StoreError> {
        self.inner.list_hospitals(limit)
    }

    fn count_hospitals(&self) -> Result<usize, StoreError> {
        self.inner.count_hospitals()
    }

    fn delete_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, StoreError> {
        self.inner.delete_hospital(id)
    }

    fn insert_professional(
        &self,
        details: ProfessionalDetails,
        email: EmailUniqueness,
        created_at: DateTime<Utc>,
    ) -> Result<Professional, StoreError> {
        self.inner.insert_professional(details, email, created_at)
    }

    fn fetch_professional(&self, id: ProfessionalId) -> Result<Option<Professional>, StoreError> {
        self.inner.fetch_professional(id)
    }

    fn list_professionals(
        &self,
        status: ProfessionalStatus,
        filter: &DirectoryFilter,
    ) -> Result<Vec<Professional>, StoreError> {
        self.inner.list_professionals(status, filter)
    }

    fn compare_and_set_status(
        &self,
        id: ProfessionalId,
        expected: ProfessionalStatus,
        next: ProfessionalStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Professional>, StoreError> {
        if self.always_stale {
            return Ok(None);
        }
        let interference = self
            .interference
            .lock()
            .expect("interference mutex poisoned")
            .take();
        if let Some(status) = interference {
            self.inner
                .compare_and_set_status(id, expected, status, updated_at)?;
        }
        self.inner
            .compare_and_set_status(id, expected, next, updated_at)
    }

    fn delete_professional(&self, id: ProfessionalId) -> Result<Option<Professional>, StoreError> {
        self.inner.delete_professional(id)
    }
}

pub(super) struct UnavailableStore;

fn offline() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

impl DirectoryStore for UnavailableStore {
    fn insert_hospital(
        &self,
        _details: HospitalDetails,
        _created_at: DateTime<Utc>,
    ) -> Result<Hospital, StoreError> {
        Err(offline())
    }

    fn fetch_hospital(&self, _id: HospitalId) -> Result<Option<Hospital>, StoreError> {
        Err(offline())
    }

    fn list_hospitals(&self, _limit: Option<usize>) -> Result<Vec<Hospital>, StoreError> {
        Err(offline())
    }

    fn count_hospitals(&self) -> Result<usize, StoreError> {
        Err(offline())
    }

    fn delete_hospital(&self, _id: HospitalId) -> Result<Option<Hospital>, StoreError> {
        Err(offline())
    }

    fn insert_professional(
        &self,
        _details: ProfessionalDetails,
        _email: EmailUniqueness,
        _created_at: DateTime<Utc>,
    ) -> Result<Professional, StoreError> {
        Err(offline())
    }

    fn fetch_professional(&self, _id: ProfessionalId) -> Result<Option<Professional>, StoreError> {
        Err(offline())
    }

    fn list_professionals(
        &self,
        _status: ProfessionalStatus,
        _filter: &DirectoryFilter,
    ) -> Result<Vec<Professional>, StoreError> {
        Err(offline())
    }

    fn compare_and_set_status(
        &self,
        _id: ProfessionalId,
        _expected: ProfessionalStatus,
        _next: ProfessionalStatus,
        _updated_at: DateTime<Utc>,
    ) -> Result<Option<Professional>, StoreError> {
        Err(offline())
    }

    fn delete_professional(&self, _id: ProfessionalId) -> Result<Option<Professional>, StoreError> {
        Err(offline())
    }
}
