use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use super::domain::{DirectoryFilter, HospitalId, Professional, ProfessionalId};
use super::moderation::ModerationError;
use super::repository::DirectoryStore;
use super::service::{DirectoryError, DirectoryService};
use super::validation::{HospitalForm, RegistrationForm, ValidationError};

/// Header carrying the administrator key on `/admin` routes.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

const DEFAULT_PAGE_LIMIT: usize = 50;
const MAX_PAGE_LIMIT: usize = 100;

/// Shared handler state: the service plus the optional administrator key.
pub struct DirectoryState<S> {
    service: Arc<DirectoryService<S>>,
    admin_key: Option<Arc<str>>,
}

impl<S> DirectoryState<S> {
    pub(crate) fn new(service: Arc<DirectoryService<S>>, admin_key: Option<String>) -> Self {
        Self {
            service,
            admin_key: admin_key.map(Arc::from),
        }
    }
}

impl<S> Clone for DirectoryState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            admin_key: self.admin_key.clone(),
        }
    }
}

/// Router builder exposing the public directory and the administrator review endpoints.
///
/// When `admin_key` is `None` the `/admin` routes are open.
pub fn directory_router<S>(service: Arc<DirectoryService<S>>, admin_key: Option<String>) -> Router
where
    S: DirectoryStore + 'static,
{
    let state = DirectoryState::new(service, admin_key);

    Router::new()
        .route("/hospitals", get(list_hospitals_handler::<S>))
        .route("/hospitals/:hospital_id", get(hospital_handler::<S>))
        .route("/directory", get(directory_handler::<S>))
        .route("/register", post(register_handler::<S>))
        .route("/admin/pending", get(pending_handler::<S>))
        .route(
            "/admin/approve/:professional_id",
            get(approve_handler::<S>).post(approve_handler::<S>),
        )
        .route(
            "/admin/reject/:professional_id",
            get(reject_handler::<S>).post(reject_handler::<S>),
        )
        .route("/admin/hospitals", post(create_hospital_handler::<S>))
        .route(
            "/admin/hospitals/:hospital_id",
            delete(delete_hospital_handler::<S>),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HospitalListQuery {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

/// Raw directory query string. Blank values are treated as absent.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DirectoryQuery {
    #[serde(default)]
    pub(crate) hospital: Option<String>,
    #[serde(default)]
    pub(crate) specialization: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) limit: Option<i64>,
    #[serde(default)]
    pub(crate) offset: Option<i64>,
}

impl DirectoryQuery {
    fn filter(&self) -> Result<DirectoryFilter, Response> {
        let hospital_id = match self
            .hospital
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
        {
            Some(raw) => {
                let id = raw.parse::<i64>().map_err(|_| {
                    failure(
                        StatusCode::BAD_REQUEST,
                        "INVALID_FILTER",
                        format!("hospital filter '{raw}' is not a numeric id"),
                    )
                })?;
                Some(HospitalId(id))
            }
            None => None,
        };

        Ok(DirectoryFilter {
            hospital_id,
            specialization: self.specialization.clone(),
            role: self.role.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default)]
    pub(crate) limit: Option<i64>,
    #[serde(default)]
    pub(crate) offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// One page of professionals plus the counts needed to fetch the next one.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfessionalPage {
    pub professionals: Vec<Professional>,
    pub pagination: Pagination,
}

fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> Result<(usize, usize), Response> {
    let limit = match limit {
        None => DEFAULT_PAGE_LIMIT,
        Some(value) => usize::try_from(value)
            .ok()
            .filter(|value| (1..=MAX_PAGE_LIMIT).contains(value))
            .ok_or_else(|| {
                failure(
                    StatusCode::BAD_REQUEST,
                    "INVALID_LIMIT",
                    format!("limit must be between 1 and {MAX_PAGE_LIMIT}"),
                )
            })?,
    };
    let offset = match offset {
        None => 0,
        Some(value) => usize::try_from(value).map_err(|_| {
            failure(
                StatusCode::BAD_REQUEST,
                "INVALID_OFFSET",
                "offset must be non-negative",
            )
        })?,
    };
    Ok((limit, offset))
}

fn paginate(professionals: Vec<Professional>, limit: usize, offset: usize) -> ProfessionalPage {
    let total = professionals.len();
    let professionals = professionals
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect();
    ProfessionalPage {
        professionals,
        pagination: Pagination {
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total,
        },
    }
}

fn authorize<S>(state: &DirectoryState<S>, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = state.admin_key.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if provided == Some(expected) {
        Ok(())
    } else {
        warn!("admin request refused: missing or invalid key");
        Err(failure(
            StatusCode::UNAUTHORIZED,
            "INVALID_ADMIN_KEY",
            format!("valid admin key required in {ADMIN_KEY_HEADER} header"),
        ))
    }
}

/// Request body accepted either as JSON or as a url-encoded browser form post.
///
/// Undecodable bodies are answered with `400 INVALID_BODY` in the usual error shape.
#[derive(Debug)]
pub(crate) struct Submission<T>(pub(crate) T);

#[async_trait]
impl<T, St> FromRequest<St> for Submission<T>
where
    T: DeserializeOwned,
    St: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        let url_encoded = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if url_encoded {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(value)| Self(value))
                .map_err(|rejection| invalid_body(rejection.body_text()))
        } else {
            Json::<T>::from_request(req, state)
                .await
                .map(|Json(value)| Self(value))
                .map_err(|rejection| invalid_body(rejection.body_text()))
        }
    }
}

fn invalid_body(reason: String) -> Response {
    warn!(%reason, "request body refused");
    failure(StatusCode::BAD_REQUEST, "INVALID_BODY", reason)
}

/// Runs a service call on the blocking pool; stores may wait on locks or disk.
async fn run_blocking<S, T, F>(state: &DirectoryState<S>, operation: F) -> Result<T, Response>
where
    S: DirectoryStore + 'static,
    T: Send + 'static,
    F: FnOnce(&DirectoryService<S>) -> Result<T, DirectoryError> + Send + 'static,
{
    let service = state.service.clone();
    match tokio::task::spawn_blocking(move || operation(&service)).await {
        Ok(result) => result.map_err(IntoResponse::into_response),
        Err(join_error) => {
            error!(error = %join_error, "directory task failed");
            Err(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "internal server error",
            ))
        }
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, Response>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(response) => response,
    }
}

fn failure(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
        "code": code,
    });
    (status, Json(payload)).into_response()
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        let (status, code, details) = match &self {
            DirectoryError::HospitalNotFound(_) | DirectoryError::ProfessionalNotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", None)
            }
            DirectoryError::Validation(ValidationError::DuplicateEmail { status, .. }) => (
                StatusCode::CONFLICT,
                "DUPLICATE_EMAIL",
                Some(json!({ "status": status })),
            ),
            DirectoryError::Validation(validation) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                Some(json!(validation.messages())),
            ),
            DirectoryError::Moderation(ModerationError::InvalidTransition { from, .. }) => (
                StatusCode::CONFLICT,
                "INVALID_TRANSITION",
                Some(json!({ "status": from })),
            ),
            DirectoryError::HospitalInUse(_) => (StatusCode::CONFLICT, "HOSPITAL_IN_USE", None),
            DirectoryError::Contended(_) => (StatusCode::CONFLICT, "CONCURRENT_UPDATE", None),
            DirectoryError::Store(store) => {
                error!(error = %store, "directory store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None)
            }
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut payload = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            payload["details"] = details;
        }
        (status, Json(payload)).into_response()
    }
}

pub(crate) async fn list_hospitals_handler<S>(
    State(state): State<DirectoryState<S>>,
    Query(query): Query<HospitalListQuery>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    let result = run_blocking(&state, move |service| service.list_hospitals(query.limit)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn hospital_handler<S>(
    State(state): State<DirectoryState<S>>,
    Path(hospital_id): Path<i64>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    let result = run_blocking(&state, move |service| {
        service.get_hospital(HospitalId(hospital_id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn directory_handler<S>(
    State(state): State<DirectoryState<S>>,
    Query(query): Query<DirectoryQuery>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(response) => return response,
    };
    let (limit, offset) = match page_bounds(query.limit, query.offset) {
        Ok(bounds) => bounds,
        Err(response) => return response,
    };

    let result = run_blocking(&state, move |service| service.list_approved(&filter)).await;
    respond(
        StatusCode::OK,
        result.map(|professionals| paginate(professionals, limit, offset)),
    )
}

pub(crate) async fn register_handler<S>(
    State(state): State<DirectoryState<S>>,
    Submission(form): Submission<RegistrationForm>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    let result = run_blocking(&state, move |service| service.register(form)).await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn pending_handler<S>(
    State(state): State<DirectoryState<S>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let (limit, offset) = match page_bounds(query.limit, query.offset) {
        Ok(bounds) => bounds,
        Err(response) => return response,
    };

    let result = run_blocking(&state, |service| service.list_pending()).await;
    respond(
        StatusCode::OK,
        result.map(|professionals| paginate(professionals, limit, offset)),
    )
}

pub(crate) async fn approve_handler<S>(
    State(state): State<DirectoryState<S>>,
    headers: HeaderMap,
    Path(professional_id): Path<i64>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let result = run_blocking(&state, move |service| {
        service.approve(ProfessionalId(professional_id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn reject_handler<S>(
    State(state): State<DirectoryState<S>>,
    headers: HeaderMap,
    Path(professional_id): Path<i64>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let result = run_blocking(&state, move |service| {
        service.reject(ProfessionalId(professional_id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_hospital_handler<S>(
    State(state): State<DirectoryState<S>>,
    headers: HeaderMap,
    Submission(form): Submission<HospitalForm>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let result = run_blocking(&state, move |service| service.create_hospital(form)).await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn delete_hospital_handler<S>(
    State(state): State<DirectoryState<S>>,
    headers: HeaderMap,
    Path(hospital_id): Path<i64>,
) -> Response
where
    S: DirectoryStore + 'static,
{
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let result = run_blocking(&state, move |service| {
        service.delete_hospital(HospitalId(hospital_id))
    })
    .await;
    respond(StatusCode::OK, result)
}
