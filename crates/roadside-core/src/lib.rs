//! Shared domain types and configuration for the roadside request service.

pub mod app_config;
pub mod config;
pub mod providers;
pub mod requests;
pub mod validation;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use providers::{NewProvider, ProviderUpdate, ValidProvider, ValidProviderUpdate};
pub use requests::{NewRequest, RequestStatus, ServiceType, ValidRequest};
pub use validation::{sanitize_input, FieldError, ValidationErrors};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown service type: {0}")]
    InvalidServiceType(String),

    #[error("unknown request status: {0}")]
    InvalidStatus(String),

    #[error("cannot move a request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("assigning a request requires a provider")]
    ProviderRequired,
}
