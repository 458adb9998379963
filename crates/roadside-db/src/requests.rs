//! Database operations for the `requests` table.

use chrono::{DateTime, Utc};
use roadside_core::{RequestStatus, ValidRequest};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from `requests`, joined with its assigned provider when there is one.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequestRow {
    pub id: i64,
    pub public_id: Uuid,
    pub service_type: String,
    pub user_phone: String,
    pub location_link: String,
    pub notes: Option<String>,
    pub status: String,
    pub provider_public_id: Option<Uuid>,
    pub provider_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const REQUEST_COLUMNS: &str = "r.id, r.public_id, r.service_type, r.user_phone, r.location_link, \
     r.notes, r.status, p.public_id AS provider_public_id, p.name AS provider_name, \
     r.created_at, r.updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Stores a validated submission as a new `pending` request.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_request(pool: &PgPool, request: &ValidRequest) -> Result<RequestRow, DbError> {
    let row = sqlx::query_as::<_, RequestRow>(
        "INSERT INTO requests (service_type, user_phone, location_link, notes) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, public_id, service_type, user_phone, location_link, notes, status, \
                   NULL::UUID AS provider_public_id, NULL::TEXT AS provider_name, \
                   created_at, updated_at",
    )
    .bind(request.service_type.as_str())
    .bind(&request.user_phone)
    .bind(&request.location_link)
    .bind(request.notes.as_deref())
    .fetch_one(pool)
    .await?;

    tracing::info!(
        request_id = %row.public_id,
        service_type = %row.service_type,
        "stored assistance request"
    );
    Ok(row)
}

/// Returns a single request by public id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_request(pool: &PgPool, public_id: Uuid) -> Result<Option<RequestRow>, DbError> {
    let sql = format!(
        "SELECT {REQUEST_COLUMNS} \
         FROM requests r \
         LEFT JOIN providers p ON p.id = r.provider_id \
         WHERE r.public_id = $1"
    );
    let row = sqlx::query_as::<_, RequestRow>(&sql)
        .bind(public_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Returns requests newest first, optionally restricted to one status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_requests(
    pool: &PgPool,
    status: Option<RequestStatus>,
    limit: i64,
) -> Result<Vec<RequestRow>, DbError> {
    let sql = format!(
        "SELECT {REQUEST_COLUMNS} \
         FROM requests r \
         LEFT JOIN providers p ON p.id = r.provider_id \
         WHERE ($1::TEXT IS NULL OR r.status = $1) \
         ORDER BY r.created_at DESC, r.id DESC \
         LIMIT $2"
    );
    let rows = sqlx::query_as::<_, RequestRow>(&sql)
        .bind(status.map(RequestStatus::as_str))
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Moves a request to `status`.
///
/// Re-opening to `pending` drops the provider. Otherwise `provider_id`
/// replaces the assignment when given and keeps it when `None`. Transition
/// rules are checked by the caller via [`RequestStatus::check_transition`].
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no request has `public_id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_request_status(
    pool: &PgPool,
    public_id: Uuid,
    status: RequestStatus,
    provider_id: Option<Uuid>,
) -> Result<RequestRow, DbError> {
    let sql = format!(
        "WITH r AS ( \
             UPDATE requests \
             SET status      = $2, \
                 provider_id = CASE \
                     WHEN $2 = 'pending' THEN NULL \
                     WHEN $3::UUID IS NULL THEN provider_id \
                     ELSE (SELECT id FROM providers WHERE public_id = $3) \
                 END, \
                 updated_at  = NOW() \
             WHERE public_id = $1 \
             RETURNING * \
         ) \
         SELECT {REQUEST_COLUMNS} \
         FROM r \
         LEFT JOIN providers p ON p.id = r.provider_id"
    );
    let row = sqlx::query_as::<_, RequestRow>(&sql)
        .bind(public_id)
        .bind(status.as_str())
        .bind(provider_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    tracing::info!(
        request_id = %row.public_id,
        status = %row.status,
        provider = ?row.provider_public_id,
        "request status updated"
    );
    Ok(row)
}

/// Deletes a request. Returns `false` when nothing matched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_request(pool: &PgPool, public_id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM requests WHERE public_id = $1")
        .bind(public_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
