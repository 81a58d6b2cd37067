use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Surrogate key for hospitals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HospitalId(pub i64);

impl fmt::Display for HospitalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Surrogate key for professional registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfessionalId(pub i64);

impl fmt::Display for ProfessionalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive fields of a hospital, as entered by seeding or an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalDetails {
    pub name: String,
    pub state: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_director_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_director_bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_director_photo: Option<String>,
}

impl HospitalDetails {
    /// Location-only hospital; every optional field starts empty.
    pub fn new(name: impl Into<String>, state: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: state.into(),
            city: city.into(),
            address: None,
            phone: None,
            email: None,
            website: None,
            description: None,
            services: None,
            banner_image: None,
            medical_director_name: None,
            medical_director_bio: None,
            medical_director_photo: None,
        }
    }
}

/// Persisted hospital.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: HospitalId,
    #[serde(flatten)]
    pub details: HospitalDetails,
    pub created_at: DateTime<Utc>,
}

/// Validated registration fields for a professional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionalDetails {
    pub name: String,
    pub role: String,
    pub hospital_id: HospitalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
}

impl ProfessionalDetails {
    pub fn new(name: impl Into<String>, role: impl Into<String>, hospital_id: HospitalId) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            hospital_id,
            designation: None,
            specialization: None,
            bio: None,
            email: None,
            phone: None,
            profile_photo: None,
        }
    }
}

/// Persisted professional registration together with its moderation status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professional {
    pub id: ProfessionalId,
    #[serde(flatten)]
    pub details: ProfessionalDetails,
    pub status: ProfessionalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Visibility status driven by the moderation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfessionalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProfessionalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProfessionalStatus::Pending => "pending",
            ProfessionalStatus::Approved => "approved",
            ProfessionalStatus::Rejected => "rejected",
        }
    }

    /// Pending and approved registrations hold their email; rejected ones release it.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            ProfessionalStatus::Pending | ProfessionalStatus::Approved
        )
    }
}

impl fmt::Display for ProfessionalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown professional status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ProfessionalStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(ProfessionalStatus::Pending),
            "approved" => Ok(ProfessionalStatus::Approved),
            "rejected" => Ok(ProfessionalStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Optional constraints applied to directory listings. Every present constraint must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    pub hospital_id: Option<HospitalId>,
    pub specialization: Option<String>,
    pub role: Option<String>,
}

impl DirectoryFilter {
    pub fn hospital(mut self, hospital_id: HospitalId) -> Self {
        self.hospital_id = Some(hospital_id);
        self
    }

    pub fn specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = Some(specialization.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Lowercased specialization needle, or `None` when the filter is absent or blank.
    pub fn specialization_needle(&self) -> Option<String> {
        self.specialization
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase)
    }

    /// Trimmed role, or `None` when the filter is absent or blank.
    pub fn role_exact(&self) -> Option<&str> {
        self.role
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn matches(&self, professional: &Professional) -> bool {
        let details = &professional.details;

        if let Some(hospital_id) = self.hospital_id {
            if details.hospital_id != hospital_id {
                return false;
            }
        }

        if let Some(role) = self.role_exact() {
            if details.role != role {
                return false;
            }
        }

        match self.specialization_needle() {
            Some(needle) => details
                .specialization
                .as_deref()
                .map(|value| value.to_lowercase().contains(&needle))
                .unwrap_or(false),
            None => true,
        }
    }
}
