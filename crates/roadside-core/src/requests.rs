//! Assistance requests: service catalogue, status lifecycle and submission
//! validation.

use std::sync::LazyLock;

use regex::Regex;
use roadside_location::is_map_link;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{compact_phone, sanitize_input, ValidationErrors};
use crate::CoreError;

pub const MIN_PHONE_LEN: usize = 8;
pub const MAX_PHONE_LEN: usize = 20;
pub const MAX_LOCATION_LEN: usize = 500;
pub const MAX_NOTES_LEN: usize = 1000;

static SUBMIT_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{1,4}\d{6,12}$").expect("valid phone regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Tow,
    BatteryJump,
    FlatTire,
    FuelDelivery,
    MinorRepair,
}

impl ServiceType {
    pub const ALL: [ServiceType; 5] = [
        ServiceType::Tow,
        ServiceType::BatteryJump,
        ServiceType::FlatTire,
        ServiceType::FuelDelivery,
        ServiceType::MinorRepair,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Tow => "tow",
            ServiceType::BatteryJump => "battery_jump",
            ServiceType::FlatTire => "flat_tire",
            ServiceType::FuelDelivery => "fuel_delivery",
            ServiceType::MinorRepair => "minor_repair",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        ServiceType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| CoreError::InvalidServiceType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Assigned,
    Completed,
}

impl RequestStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Assigned => "assigned",
            RequestStatus::Completed => "completed",
        }
    }

    /// Check that a request in `self` may move to `to`.
    ///
    /// `provider` is the provider named in the change, if any. Re-opening to
    /// `Pending` is always allowed and drops the assignment.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ProviderRequired`] when assigning without a
    /// provider, or [`CoreError::InvalidTransition`] for moves out of
    /// `Completed` other than re-opening.
    pub fn check_transition(self, to: RequestStatus, provider: Option<Uuid>) -> Result<(), CoreError> {
        match (self, to) {
            (_, RequestStatus::Pending)
            | (
                RequestStatus::Pending | RequestStatus::Assigned,
                RequestStatus::Completed,
            )
            | (RequestStatus::Completed, RequestStatus::Completed) => Ok(()),
            (RequestStatus::Pending | RequestStatus::Assigned, RequestStatus::Assigned) => {
                if provider.is_some() {
                    Ok(())
                } else {
                    Err(CoreError::ProviderRequired)
                }
            }
            (RequestStatus::Completed, RequestStatus::Assigned) => {
                Err(CoreError::InvalidTransition { from: self, to })
            }
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(RequestStatus::Pending),
            "assigned" => Ok(RequestStatus::Assigned),
            "completed" => Ok(RequestStatus::Completed),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// A request as submitted by the public form, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub service_type: ServiceType,
    pub user_phone: String,
    pub location_link: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Sanitized request ready for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidRequest {
    pub service_type: ServiceType,
    pub user_phone: String,
    pub location_link: String,
    pub notes: Option<String>,
}

impl NewRequest {
    /// Sanitize every text field and check it against the submission rules.
    ///
    /// # Errors
    ///
    /// Returns all failing fields at once.
    pub fn validate(&self) -> Result<ValidRequest, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let user_phone = compact_phone(&sanitize_input(&self.user_phone));
        if user_phone.len() < MIN_PHONE_LEN || user_phone.len() > MAX_PHONE_LEN {
            errors.push(
                "user_phone",
                format!("must be {MIN_PHONE_LEN}-{MAX_PHONE_LEN} characters"),
            );
        } else if !SUBMIT_PHONE.is_match(&user_phone) {
            errors.push(
                "user_phone",
                "must include a country code, e.g. +9613123456",
            );
        }

        let location_link = sanitize_input(&self.location_link);
        if location_link.is_empty() {
            errors.push("location_link", "is required");
        } else if location_link.len() > MAX_LOCATION_LEN {
            errors.push(
                "location_link",
                format!("must be at most {MAX_LOCATION_LEN} characters"),
            );
        } else if !is_map_link(&location_link) {
            errors.push("location_link", "must be a Google Maps link");
        }

        let notes = self
            .notes
            .as_deref()
            .map(sanitize_input)
            .filter(|n| !n.is_empty());
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
            errors.push("notes", format!("must be at most {MAX_NOTES_LEN} characters"));
        }

        errors.into_result(ValidRequest {
            service_type: self.service_type,
            user_phone,
            location_link,
            notes,
        })
    }
}
