//! Provider directory handlers (admin only).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use roadside_core::{NewProvider, ProviderUpdate};
use roadside_db::{DbError, ProviderRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, parse_public_id, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ListProvidersQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ProviderItem {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub service_types: Vec<String>,
    pub coverage_area: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProviderRow> for ProviderItem {
    fn from(row: ProviderRow) -> Self {
        Self {
            id: row.public_id,
            name: row.name,
            phone: row.phone,
            service_types: row.service_types,
            coverage_area: row.coverage_area,
            active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn parse_status_filter(request_id: &str, raw: Option<&str>) -> Result<Option<bool>, ApiError> {
    match raw.map(str::trim) {
        None | Some("" | "all") => Ok(None),
        Some("active") => Ok(Some(true)),
        Some("inactive") => Ok(Some(false)),
        Some(other) => Err(ApiError::new(
            request_id,
            "validation_error",
            format!("status must be 'active', 'inactive' or 'all', got '{other}'"),
        )),
    }
}

fn duplicate_phone(request_id: &str) -> ApiError {
    ApiError::new(
        request_id,
        "conflict",
        "a provider with this phone number already exists",
    )
}

fn map_write_error(request_id: &str, e: &DbError) -> ApiError {
    if e.is_unique_violation() {
        return duplicate_phone(request_id);
    }
    map_db_error(request_id.to_owned(), e)
}

/// Fails with 409 when `phone` belongs to a provider other than `except`.
async fn ensure_phone_available(
    pool: &sqlx::PgPool,
    request_id: &str,
    phone: &str,
    except: Option<Uuid>,
) -> Result<(), ApiError> {
    let existing = roadside_db::find_provider_by_phone(pool, phone)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;
    match existing {
        Some(row) if Some(row.public_id) != except => Err(duplicate_phone(request_id)),
        _ => Ok(()),
    }
}

/// GET /api/v1/providers
pub(super) async fn list_providers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListProvidersQuery>,
) -> Result<Json<ApiResponse<Vec<ProviderItem>>>, ApiError> {
    let rid = &req_id.0;
    let active = parse_status_filter(rid, query.status.as_deref())?;

    let rows = roadside_db::list_providers(&state.pool, active, query.search.as_deref())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProviderItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/providers/{id}
pub(super) async fn get_provider(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProviderItem>>, ApiError> {
    let rid = &req_id.0;
    let public_id = parse_public_id(rid, &id)?;

    let row = roadside_db::get_provider(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(rid, "not_found", format!("provider '{public_id}' not found"))
        })?;

    Ok(Json(ApiResponse {
        data: ProviderItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/providers
pub(super) async fn create_provider(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<NewProvider>,
) -> Result<(StatusCode, Json<ApiResponse<ProviderItem>>), ApiError> {
    let rid = &req_id.0;
    let provider = body
        .validate()
        .map_err(|errors| ApiError::validation(rid.clone(), errors))?;

    ensure_phone_available(&state.pool, rid, &provider.phone, None).await?;

    // The unique index still catches a concurrent insert of the same phone.
    let row = roadside_db::create_provider(&state.pool, &provider)
        .await
        .map_err(|e| map_write_error(rid, &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ProviderItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PUT /api/v1/providers/{id}
pub(super) async fn update_provider(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(body): Json<ProviderUpdate>,
) -> Result<Json<ApiResponse<ProviderItem>>, ApiError> {
    let rid = &req_id.0;
    let public_id = parse_public_id(rid, &id)?;
    let update = body
        .validate()
        .map_err(|errors| ApiError::validation(rid.clone(), errors))?;

    if let Some(ref phone) = update.phone {
        ensure_phone_available(&state.pool, rid, phone, Some(public_id)).await?;
    }

    let row = roadside_db::update_provider(&state.pool, public_id, &update)
        .await
        .map_err(|e| map_write_error(rid, &e))?;

    Ok(Json(ApiResponse {
        data: ProviderItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/providers/{id}
pub(super) async fn delete_provider(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let public_id = parse_public_id(rid, &id)?;

    let deleted = roadside_db::delete_provider(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(
            rid,
            "not_found",
            format!("provider '{public_id}' not found"),
        ));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
