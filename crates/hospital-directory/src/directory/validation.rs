//! Input schemas for the mutating directory operations.
//!
//! Forms arrive with every field optional so that a single pass can report all problems at
//! once. Nothing reaches the store until a form validates.

use serde::{Deserialize, Serialize};

use super::domain::{HospitalDetails, HospitalId, ProfessionalDetails, ProfessionalStatus};

/// Identifier accepted either as a JSON number or as numeric text from a form post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdInput {
    Number(i64),
    Text(String),
}

impl IdInput {
    fn resolve(&self) -> Result<Option<i64>, ()> {
        match self {
            IdInput::Number(value) => Ok(Some(*value)),
            IdInput::Text(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    Ok(None)
                } else {
                    raw.parse::<i64>().map(Some).map_err(|_| ())
                }
            }
        }
    }
}

impl From<HospitalId> for IdInput {
    fn from(value: HospitalId) -> Self {
        IdInput::Number(value.0)
    }
}

/// Public registration submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub hospital_id: Option<IdInput>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_photo: Option<String>,
}

impl RegistrationForm {
    /// Checks required fields and formats. The email, when given, is normalized to lowercase.
    pub fn validate(self) -> Result<ProfessionalDetails, ValidationError> {
        let mut issues = Vec::new();

        let name = required(self.name, "Name is required", &mut issues);
        let role = required(self.role, "Role is required", &mut issues);

        let hospital_id = match self.hospital_id.as_ref().map(IdInput::resolve) {
            Some(Ok(Some(id))) => Some(HospitalId(id)),
            Some(Err(())) => {
                issues.push("Hospital must be a numeric id".to_string());
                None
            }
            Some(Ok(None)) | None => {
                issues.push("Hospital is required".to_string());
                None
            }
        };

        let address = optional(self.email).map(|value| value.to_ascii_lowercase());
        if address.as_deref().is_some_and(|value| !is_valid_email(value)) {
            issues.push("Invalid email format".to_string());
        }

        match (name, role, hospital_id) {
            (Some(name), Some(role), Some(hospital_id)) if issues.is_empty() => {
                Ok(ProfessionalDetails {
                    name,
                    role,
                    hospital_id,
                    designation: optional(self.designation),
                    specialization: optional(self.specialization),
                    bio: optional(self.bio),
                    email: address,
                    phone: optional(self.phone),
                    profile_photo: optional(self.profile_photo),
                })
            }
            _ => Err(ValidationError::Invalid(issues)),
        }
    }
}

/// Administrator hospital entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub services: Option<String>,
    #[serde(default)]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub medical_director_name: Option<String>,
    #[serde(default)]
    pub medical_director_bio: Option<String>,
    #[serde(default)]
    pub medical_director_photo: Option<String>,
}

impl HospitalForm {
    pub fn validate(self) -> Result<HospitalDetails, ValidationError> {
        let mut issues = Vec::new();

        let name = required(self.name, "Name is required", &mut issues);
        let state = required(self.state, "State is required", &mut issues);
        let city = required(self.city, "City is required", &mut issues);

        let email = optional(self.email);
        if email.as_deref().is_some_and(|value| !is_valid_email(value)) {
            issues.push("Invalid email format".to_string());
        }

        match (name, state, city) {
            (Some(name), Some(state), Some(city)) if issues.is_empty() => Ok(HospitalDetails {
                name,
                state,
                city,
                address: optional(self.address),
                phone: optional(self.phone),
                email,
                website: optional(self.website),
                description: optional(self.description),
                services: optional(self.services),
                banner_image: optional(self.banner_image),
                medical_director_name: optional(self.medical_director_name),
                medical_director_bio: optional(self.medical_director_bio),
                medical_director_photo: optional(self.medical_director_photo),
            }),
            _ => Err(ValidationError::Invalid(issues)),
        }
    }
}

/// Rejected input, including references and uniqueness checks made against the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("validation failed: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("hospital {0} does not exist")]
    UnknownHospital(HospitalId),
    #[error("email {email} is already registered with status {status}")]
    DuplicateEmail {
        email: String,
        status: ProfessionalStatus,
    },
}

impl ValidationError {
    /// Human-readable messages suitable for showing next to a form.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ValidationError::Invalid(issues) => issues.clone(),
            other => vec![other.to_string()],
        }
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn required(value: Option<String>, message: &str, issues: &mut Vec<String>) -> Option<String> {
    let value = optional(value);
    if value.is_none() {
        issues.push(message.to_string());
    }
    value
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(index, ch)| ch == '.' && index > 0 && index + 1 < domain.len())
}
