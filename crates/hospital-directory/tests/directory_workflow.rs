//! End-to-end directory scenarios exercised through the public service and router, once per
//! store backend.

mod common {
    use std::sync::Arc;

    use hospital_directory::directory::{
        DirectoryPolicy, DirectoryService, DirectoryStore, HospitalForm, HospitalId, IdInput,
        MemoryDirectoryStore, RegistrationForm, SqliteDirectoryStore,
    };

    pub(super) fn memory_service(
        policy: DirectoryPolicy,
    ) -> DirectoryService<MemoryDirectoryStore> {
        DirectoryService::new(Arc::new(MemoryDirectoryStore::new()), policy)
    }

    pub(super) fn sqlite_service(
        policy: DirectoryPolicy,
    ) -> DirectoryService<SqliteDirectoryStore> {
        let store = SqliteDirectoryStore::open_in_memory().expect("in-memory database opens");
        DirectoryService::new(Arc::new(store), policy)
    }

    pub(super) fn create_aizawl<S: DirectoryStore + 'static>(
        service: &DirectoryService<S>,
    ) -> HospitalId {
        service
            .create_hospital(HospitalForm {
                name: Some("Aizawl Adventist Hospital".to_string()),
                state: Some("Mizoram".to_string()),
                city: Some("Aizawl".to_string()),
                ..HospitalForm::default()
            })
            .expect("hospital created")
            .id
    }

    pub(super) fn registration(
        name: &str,
        role: &str,
        hospital_id: HospitalId,
        email: Option<&str>,
    ) -> RegistrationForm {
        RegistrationForm {
            name: Some(name.to_string()),
            role: Some(role.to_string()),
            hospital_id: Some(IdInput::from(hospital_id)),
            specialization: Some("Cardiology".to_string()),
            email: email.map(str::to_string),
            ..RegistrationForm::default()
        }
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hospital_directory::directory::{
    directory_router, DirectoryError, DirectoryFilter, DirectoryPolicy, DirectoryService,
    DirectoryStore, HospitalForm, ModerationOutcome, ProfessionalPage, ProfessionalStatus,
    RejectPolicy, SqliteDirectoryStore, ValidationError,
};
use tower::ServiceExt;

use common::*;

fn moderation_lifecycle<S: DirectoryStore + 'static>(service: DirectoryService<S>) {
    let hospital = create_aizawl(&service);

    let p1 = service
        .register(registration("Dr. A", "Doctor", hospital, None))
        .expect("registration succeeds");
    assert_eq!(p1.status, ProfessionalStatus::Pending);
    assert_eq!(p1.created_at, p1.updated_at);

    let pending = service.list_pending().expect("queue loads");
    assert_eq!(pending, vec![p1.clone()]);
    assert!(service
        .list_approved(&DirectoryFilter::default())
        .expect("listing succeeds")
        .is_empty());

    let approved = service.approve(p1.id).expect("approve succeeds");
    assert!(matches!(approved, ModerationOutcome::Applied(_)));
    assert!(approved.professional().updated_at >= p1.updated_at);

    let again = service.approve(p1.id).expect("repeat approve succeeds");
    assert!(matches!(again, ModerationOutcome::Unchanged(_)));

    let listed = service
        .list_approved(&DirectoryFilter::default())
        .expect("listing succeeds");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, p1.id);

    let filtered = service
        .list_approved(
            &DirectoryFilter::default()
                .hospital(hospital)
                .specialization("cardio")
                .role("Doctor"),
        )
        .expect("listing succeeds");
    assert_eq!(filtered.len(), 1);

    service.reject(p1.id).expect("reject succeeds");
    assert!(service
        .list_approved(&DirectoryFilter::default())
        .expect("listing succeeds")
        .is_empty());
    assert!(service.list_pending().expect("queue loads").is_empty());
}

fn email_uniqueness<S: DirectoryStore + 'static>(service: DirectoryService<S>) {
    let hospital = create_aizawl(&service);
    let first = service
        .register(registration("Dr. A", "Doctor", hospital, Some("dr.a@aah.org")))
        .expect("registration succeeds");

    let duplicate = service.register(registration(
        "Dr. A",
        "Doctor",
        hospital,
        Some("Dr.A@AAH.org"),
    ));
    assert!(matches!(
        duplicate,
        Err(DirectoryError::Validation(ValidationError::DuplicateEmail { .. }))
    ));

    service.reject(first.id).expect("reject succeeds");
    service
        .register(registration("Dr. A", "Doctor", hospital, Some("dr.a@aah.org")))
        .expect("email released after rejection");
}

fn hospital_restrict<S: DirectoryStore + 'static>(service: DirectoryService<S>) {
    let hospital = create_aizawl(&service);
    let professional = service
        .register(registration("Dr. A", "Doctor", hospital, None))
        .expect("registration succeeds");

    assert!(matches!(
        service.delete_hospital(hospital),
        Err(DirectoryError::HospitalInUse(_))
    ));

    service.reject(professional.id).expect("reject deletes");
    service
        .delete_hospital(hospital)
        .expect("hospital free once its professionals are gone");
    assert!(service
        .get_hospital(hospital)
        .expect_err("hospital removed")
        .is_not_found());
}

fn filters_combine<S: DirectoryStore + 'static>(service: DirectoryService<S>) {
    let aizawl = create_aizawl(&service);
    let pune = service
        .create_hospital(HospitalForm {
            name: Some("Pune Adventist Hospital".to_string()),
            state: Some("Maharashtra".to_string()),
            city: Some("Pune".to_string()),
            ..HospitalForm::default()
        })
        .expect("hospital created")
        .id;

    let roster = [
        ("A Doctor", "Doctor", aizawl, Some("Cardiology")),
        ("A Nurse", "Nurse", aizawl, None),
        ("B Doctor", "Doctor", pune, Some("Échographie")),
        ("B Nurse", "Nurse", pune, Some("Cardiac care")),
    ];
    for (name, role, hospital, specialization) in roster {
        let mut form = registration(name, role, hospital, None);
        form.specialization = specialization.map(str::to_string);
        let professional = service.register(form).expect("registration succeeds");
        service.approve(professional.id).expect("approve succeeds");
    }
    service
        .register(registration("A Doctor Pending", "Doctor", aizawl, None))
        .expect("pending registration succeeds");

    let names = |filter: DirectoryFilter| -> Vec<String> {
        service
            .list_approved(&filter)
            .expect("listing succeeds")
            .into_iter()
            .map(|professional| professional.details.name)
            .collect()
    };

    assert_eq!(names(DirectoryFilter::default()).len(), 4);
    assert_eq!(
        names(DirectoryFilter::default().hospital(aizawl)),
        ["A Doctor", "A Nurse"]
    );
    assert_eq!(
        names(DirectoryFilter::default().role("Nurse")),
        ["A Nurse", "B Nurse"]
    );
    assert_eq!(
        names(DirectoryFilter::default().hospital(pune).role("Nurse")),
        ["B Nurse"]
    );
    assert_eq!(
        names(DirectoryFilter::default().specialization("CARD")),
        ["A Doctor", "B Nurse"]
    );
    assert_eq!(
        names(DirectoryFilter::default().specialization("card").hospital(aizawl)),
        ["A Doctor"]
    );
    assert!(names(
        DirectoryFilter::default()
            .specialization("card")
            .hospital(pune)
            .role("Doctor")
    )
    .is_empty());
    assert!(names(DirectoryFilter::default().specialization("neuro")).is_empty());
    assert_eq!(
        names(DirectoryFilter::default().specialization("ÉCHO")),
        ["B Doctor"]
    );
    assert_eq!(
        names(DirectoryFilter::default().specialization("  ").role("")).len(),
        4
    );
}

fn delete_policy() -> DirectoryPolicy {
    DirectoryPolicy {
        reject: RejectPolicy::Delete,
        ..DirectoryPolicy::default()
    }
}

#[test]
fn memory_store_moderation_lifecycle() {
    moderation_lifecycle(memory_service(DirectoryPolicy::default()));
}

#[test]
fn sqlite_store_moderation_lifecycle() {
    moderation_lifecycle(sqlite_service(DirectoryPolicy::default()));
}

#[test]
fn memory_store_combines_filters() {
    filters_combine(memory_service(DirectoryPolicy::default()));
}

#[test]
fn sqlite_store_combines_filters() {
    filters_combine(sqlite_service(DirectoryPolicy::default()));
}

#[test]
fn memory_store_email_uniqueness() {
    email_uniqueness(memory_service(DirectoryPolicy::default()));
}

#[test]
fn sqlite_store_email_uniqueness() {
    email_uniqueness(sqlite_service(DirectoryPolicy::default()));
}

#[test]
fn memory_store_restricts_hospital_deletes() {
    hospital_restrict(memory_service(delete_policy()));
}

#[test]
fn sqlite_store_restricts_hospital_deletes() {
    hospital_restrict(sqlite_service(delete_policy()));
}

#[test]
fn sqlite_directory_survives_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("directory.db");
    let timeout = std::time::Duration::from_millis(500);

    let professional_id = {
        let store = Arc::new(SqliteDirectoryStore::open(&path, timeout).expect("database opens"));
        let service = DirectoryService::new(store.clone(), DirectoryPolicy::default());
        assert_eq!(service.seed_sample_hospitals().expect("seed succeeds"), 12);
        let hospital = service.list_hospitals(Some(1)).expect("listing succeeds")[0].id;
        let professional = service
            .register(registration("Dr. A", "Doctor", hospital, None))
            .expect("registration succeeds");
        service.approve(professional.id).expect("approve succeeds");
        store.close().expect("database closes");
        professional.id
    };

    let store = Arc::new(SqliteDirectoryStore::open(&path, timeout).expect("database reopens"));
    let service = DirectoryService::new(store, DirectoryPolicy::default());
    assert_eq!(service.seed_sample_hospitals().expect("seed is a no-op"), 0);
    let stored = service
        .get_professional(professional_id)
        .expect("professional persisted");
    assert_eq!(stored.status, ProfessionalStatus::Approved);
}

#[tokio::test]
async fn sqlite_backed_router_serves_the_directory() {
    let service = sqlite_service(DirectoryPolicy::default());
    let hospital = create_aizawl(&service);
    let professional = service
        .register(registration("Dr. A", "Doctor", hospital, None))
        .expect("registration succeeds");
    service.approve(professional.id).expect("approve succeeds");
    let app = directory_router(Arc::new(service), Some("desk".to_string()));

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/directory?hospital={hospital}&specialization=CARDIO"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let page: ProfessionalPage = serde_json::from_slice(&body).expect("page payload");
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.professionals[0].details.name, "Dr. A");

    let response = app
        .oneshot(
            Request::get("/admin/pending")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
