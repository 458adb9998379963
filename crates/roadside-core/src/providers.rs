//! Service providers dispatched to requests.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::requests::ServiceType;
use crate::validation::{compact_phone, sanitize_input, ValidationErrors};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_COVERAGE_LEN: usize = 200;

static PROVIDER_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("valid phone regex"));

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProvider {
    pub name: String,
    pub phone: String,
    pub service_types: Vec<ServiceType>,
    pub coverage_area: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidProvider {
    pub name: String,
    pub phone: String,
    pub service_types: Vec<ServiceType>,
    pub coverage_area: String,
    pub active: bool,
}

/// Sparse update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub service_types: Option<Vec<ServiceType>>,
    pub coverage_area: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidProviderUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub service_types: Option<Vec<ServiceType>>,
    pub coverage_area: Option<String>,
    pub active: Option<bool>,
}

impl NewProvider {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<ValidProvider, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let name = check_name(&mut errors, &self.name);
        let phone = check_phone(&mut errors, &self.phone);
        let service_types = check_service_types(&mut errors, &self.service_types);
        let coverage_area = check_coverage(&mut errors, &self.coverage_area);

        errors.into_result(ValidProvider {
            name,
            phone,
            service_types,
            coverage_area,
            active: self.active,
        })
    }
}

impl ProviderUpdate {
    /// Validate only the fields present in the update.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<ValidProviderUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let update = ValidProviderUpdate {
            name: self.name.as_deref().map(|n| check_name(&mut errors, n)),
            phone: self.phone.as_deref().map(|p| check_phone(&mut errors, p)),
            service_types: self
                .service_types
                .as_deref()
                .map(|t| check_service_types(&mut errors, t)),
            coverage_area: self
                .coverage_area
                .as_deref()
                .map(|c| check_coverage(&mut errors, c)),
            active: self.active,
        };
        errors.into_result(update)
    }
}

fn check_name(errors: &mut ValidationErrors, raw: &str) -> String {
    let name = sanitize_input(raw);
    if name.is_empty() {
        errors.push("name", "is required");
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push("name", format!("must be at most {MAX_NAME_LEN} characters"));
    }
    name
}

fn check_phone(errors: &mut ValidationErrors, raw: &str) -> String {
    let phone = compact_phone(&sanitize_input(raw));
    if phone.is_empty() {
        errors.push("phone", "is required");
    } else if !PROVIDER_PHONE.is_match(&phone) {
        errors.push("phone", "invalid phone number format");
    }
    phone
}

fn check_service_types(errors: &mut ValidationErrors, types: &[ServiceType]) -> Vec<ServiceType> {
    let mut unique: Vec<ServiceType> = Vec::with_capacity(types.len());
    for t in types {
        if !unique.contains(t) {
            unique.push(*t);
        }
    }
    if unique.is_empty() {
        errors.push("service_types", "at least one service type is required");
    }
    unique
}

fn check_coverage(errors: &mut ValidationErrors, raw: &str) -> String {
    let coverage = sanitize_input(raw);
    if coverage.is_empty() {
        errors.push("coverage_area", "is required");
    } else if coverage.chars().count() > MAX_COVERAGE_LEN {
        errors.push(
            "coverage_area",
            format!("must be at most {MAX_COVERAGE_LEN} characters"),
        );
    }
    coverage
}
