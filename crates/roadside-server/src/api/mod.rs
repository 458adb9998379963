mod location;
mod providers;
mod requests;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use roadside_core::{AppConfig, FieldError, ValidationErrors};
use roadside_location::{MapProvider, PositionOptions};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::middleware::{
    enforce_rate_limit, enforce_submission_limit, request_id, require_bearer_auth, AuthState,
    KeyedRateLimiter, RateLimitState, RequestId,
};

/// A phone number may submit at most this many requests per window.
const PHONE_ATTEMPTS: usize = 3;
const PHONE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Location-capture settings handed to clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationDefaults {
    pub position: PositionOptions,
    pub map_provider: MapProvider,
}

impl From<&AppConfig> for LocationDefaults {
    fn from(config: &AppConfig) -> Self {
        Self {
            position: config.position_options(),
            map_provider: config.default_map_provider,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub location: LocationDefaults,
    pub phone_limiter: KeyedRateLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, location: LocationDefaults) -> Self {
        Self {
            pool,
            location,
            phone_limiter: KeyedRateLimiter::new(PHONE_ATTEMPTS, PHONE_WINDOW),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: Vec::new(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    /// 400 carrying one entry per rejected field.
    pub fn validation(request_id: impl Into<String>, errors: ValidationErrors) -> Self {
        let mut err = Self::new(request_id, "validation_error", errors.to_string());
        err.error.details = errors.errors;
        err
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &roadside_db::DbError) -> ApiError {
    if matches!(error, roadside_db::DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Parse a public id path segment, rejecting malformed ids with a 400.
pub(super) fn parse_public_id(request_id: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("'{raw}' is not a valid id"),
        )
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/requests", get(requests::list_requests))
        .route(
            "/api/v1/requests/{id}",
            get(requests::get_request)
                .patch(requests::update_request_status)
                .delete(requests::delete_request),
        )
        .route(
            "/api/v1/providers",
            get(providers::list_providers).post(providers::create_provider),
        )
        .route(
            "/api/v1/providers/{id}",
            get(providers::get_provider)
                .put(providers::update_provider)
                .delete(providers::delete_provider),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

fn submission_router(limiter: KeyedRateLimiter) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/requests",
            axum::routing::post(requests::submit_request),
        )
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            enforce_submission_limit,
        ))
}

pub fn build_app(
    state: AppState,
    auth: AuthState,
    rate_limit: RateLimitState,
    submissions: KeyedRateLimiter,
) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/location/resolve", get(location::resolve_link))
        .route("/api/v1/location/settings", get(location::settings))
        .merge(submission_router(submissions));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match roadside_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[must_use]
pub fn submission_limiter(config: &AppConfig) -> KeyedRateLimiter {
    KeyedRateLimiter::new(config.submission_limit, config.submission_window())
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
