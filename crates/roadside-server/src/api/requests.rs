//! Assistance request handlers.
//!
//! - `POST   /api/v1/requests`      public submission
//! - `GET    /api/v1/requests`      admin list (`status`, `limit`)
//! - `GET    /api/v1/requests/{id}` admin detail
//! - `PATCH  /api/v1/requests/{id}` admin status change / assignment
//! - `DELETE /api/v1/requests/{id}` admin delete

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use roadside_core::{CoreError, NewRequest, RequestStatus};
use roadside_db::RequestRow;
use roadside_location::{decode, encode, MapProvider};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, parse_public_id, ApiError, ApiResponse, AppState,
    ResponseMeta,
};

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct ListRequestsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateStatusRequest {
    pub status: RequestStatus,
    pub provider_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub(super) struct SubmittedRequest {
    pub id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub(super) struct AssignedProvider {
    pub id: Uuid,
    pub name: String,
}

/// Pin decoded from the stored link, when it carries coordinates.
#[derive(Debug, Serialize)]
pub(super) struct RequestPin {
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
    pub open_map_url: String,
}

#[derive(Debug, Serialize)]
pub(super) struct RequestItem {
    pub id: Uuid,
    pub service_type: String,
    pub user_phone: String,
    pub location_link: String,
    pub notes: Option<String>,
    pub status: String,
    pub provider: Option<AssignedProvider>,
    pub pin: Option<RequestPin>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RequestRow> for RequestItem {
    fn from(row: RequestRow) -> Self {
        let pin = decode(&row.location_link).map(|link| RequestPin {
            lat: link.coordinates.lat(),
            lng: link.coordinates.lng(),
            zoom: link.zoom.level(),
            open_map_url: encode(link.coordinates, link.zoom, MapProvider::OpenMap),
        });
        let provider = row
            .provider_public_id
            .zip(row.provider_name)
            .map(|(id, name)| AssignedProvider { id, name });

        Self {
            id: row.public_id,
            service_type: row.service_type,
            user_phone: row.user_phone,
            location_link: row.location_link,
            notes: row.notes,
            status: row.status,
            provider,
            pin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn resolve_request(
    pool: &sqlx::PgPool,
    public_id: Uuid,
    request_id: &str,
) -> Result<RequestRow, ApiError> {
    roadside_db::get_request(pool, public_id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                request_id,
                "not_found",
                format!("request '{public_id}' not found"),
            )
        })
}

fn map_transition_error(request_id: &str, error: &CoreError) -> ApiError {
    match error {
        CoreError::InvalidTransition { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        _ => ApiError::new(request_id, "validation_error", error.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/requests
pub(super) async fn submit_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<NewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmittedRequest>>), ApiError> {
    let rid = &req_id.0;
    let request = body
        .validate()
        .map_err(|errors| ApiError::validation(rid.clone(), errors))?;

    if !state.phone_limiter.check(&request.user_phone).await {
        tracing::warn!("per-phone submission limit hit");
        return Err(ApiError::new(
            rid,
            "rate_limited",
            "too many requests for this phone number, please try again later",
        ));
    }

    let row = roadside_db::insert_request(&state.pool, &request)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: SubmittedRequest {
                id: row.public_id,
                status: row.status,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/requests
pub(super) async fn list_requests(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<ApiResponse<Vec<RequestItem>>>, ApiError> {
    let rid = &req_id.0;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<RequestStatus>)
        .transpose()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let rows = roadside_db::list_requests(&state.pool, status, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(RequestItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/requests/{id}
pub(super) async fn get_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RequestItem>>, ApiError> {
    let rid = &req_id.0;
    let public_id = parse_public_id(rid, &id)?;
    let row = resolve_request(&state.pool, public_id, rid).await?;

    Ok(Json(ApiResponse {
        data: RequestItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PATCH /api/v1/requests/{id}
pub(super) async fn update_request_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<RequestItem>>, ApiError> {
    let rid = &req_id.0;
    let public_id = parse_public_id(rid, &id)?;
    let current = resolve_request(&state.pool, public_id, rid).await?;

    let from = current.status.parse::<RequestStatus>().map_err(|e| {
        tracing::error!(error = %e, "stored request has an unknown status");
        ApiError::new(rid, "internal_error", "stored request is malformed")
    })?;
    from.check_transition(body.status, body.provider_id)
        .map_err(|e| map_transition_error(rid, &e))?;

    if let Some(provider_id) = body.provider_id {
        let provider = roadside_db::get_provider(&state.pool, provider_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
        match provider {
            Some(p) if p.is_active => {}
            Some(_) => {
                return Err(ApiError::new(
                    rid,
                    "validation_error",
                    format!("provider '{provider_id}' is inactive"),
                ))
            }
            None => {
                return Err(ApiError::new(
                    rid,
                    "validation_error",
                    format!("provider '{provider_id}' does not exist"),
                ))
            }
        }
    }

    let row =
        roadside_db::update_request_status(&state.pool, public_id, body.status, body.provider_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: RequestItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/requests/{id}
pub(super) async fn delete_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let public_id = parse_public_id(rid, &id)?;

    let deleted = roadside_db::delete_request(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(
            rid,
            "not_found",
            format!("request '{public_id}' not found"),
        ));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
