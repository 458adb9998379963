//! Database operations for the `providers` table.

use chrono::{DateTime, Utc};
use roadside_core::{ServiceType, ValidProvider, ValidProviderUpdate};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{like_pattern, DbError};

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `providers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProviderRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub phone: String,
    pub service_types: Vec<String>,
    pub coverage_area: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PROVIDER_COLUMNS: &str =
    "id, public_id, name, phone, service_types, coverage_area, is_active, created_at, updated_at";

fn type_names(types: &[ServiceType]) -> Vec<String> {
    types.iter().map(|t| t.as_str().to_string()).collect()
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns providers newest first.
///
/// `active` restricts to active or inactive providers; `search` matches
/// name, phone or coverage area case-insensitively.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_providers(
    pool: &PgPool,
    active: Option<bool>,
    search: Option<&str>,
) -> Result<Vec<ProviderRow>, DbError> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);

    let sql = format!(
        "SELECT {PROVIDER_COLUMNS} \
         FROM providers \
         WHERE ($1::BOOL IS NULL OR is_active = $1) \
           AND ($2::TEXT IS NULL \
                OR name ILIKE $2 OR phone ILIKE $2 OR coverage_area ILIKE $2) \
         ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, ProviderRow>(&sql)
        .bind(active)
        .bind(pattern)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Returns a single provider by public id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_provider(pool: &PgPool, public_id: Uuid) -> Result<Option<ProviderRow>, DbError> {
    let sql = format!("SELECT {PROVIDER_COLUMNS} FROM providers WHERE public_id = $1");
    let row = sqlx::query_as::<_, ProviderRow>(&sql)
        .bind(public_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Returns the provider registered with `phone`, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_provider_by_phone(
    pool: &PgPool,
    phone: &str,
) -> Result<Option<ProviderRow>, DbError> {
    let sql = format!("SELECT {PROVIDER_COLUMNS} FROM providers WHERE phone = $1");
    let row = sqlx::query_as::<_, ProviderRow>(&sql)
        .bind(phone)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Creates a provider and returns the inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique
/// violation on `phone` (see [`DbError::is_unique_violation`]).
pub async fn create_provider(
    pool: &PgPool,
    provider: &ValidProvider,
) -> Result<ProviderRow, DbError> {
    let sql = format!(
        "INSERT INTO providers (name, phone, service_types, coverage_area, is_active) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {PROVIDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProviderRow>(&sql)
        .bind(&provider.name)
        .bind(&provider.phone)
        .bind(type_names(&provider.service_types))
        .bind(&provider.coverage_area)
        .bind(provider.active)
        .fetch_one(pool)
        .await?;

    tracing::info!(provider_id = %row.public_id, name = %row.name, "provider created");
    Ok(row)
}

/// Overlays the supplied fields onto an existing provider.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no provider has `public_id`, or
/// [`DbError::Sqlx`] if the update fails (including a duplicate phone).
pub async fn update_provider(
    pool: &PgPool,
    public_id: Uuid,
    update: &ValidProviderUpdate,
) -> Result<ProviderRow, DbError> {
    let sql = format!(
        "UPDATE providers \
         SET name          = COALESCE($2, name), \
             phone         = COALESCE($3, phone), \
             service_types = COALESCE($4::TEXT[], service_types), \
             coverage_area = COALESCE($5, coverage_area), \
             is_active     = COALESCE($6, is_active), \
             updated_at    = NOW() \
         WHERE public_id = $1 \
         RETURNING {PROVIDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProviderRow>(&sql)
        .bind(public_id)
        .bind(update.name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.service_types.as_deref().map(type_names))
        .bind(update.coverage_area.as_deref())
        .bind(update.active)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;
    Ok(row)
}

/// Deletes a provider. Requests still `assigned` to it go back to `pending`;
/// completed requests just lose the reference. Returns `false` when nothing
/// matched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the transaction is
/// rolled back in that case.
pub async fn delete_provider(pool: &PgPool, public_id: Uuid) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    let reopened = sqlx::query(
        "UPDATE requests \
         SET status = 'pending', provider_id = NULL, updated_at = NOW() \
         WHERE status = 'assigned' \
           AND provider_id = (SELECT id FROM providers WHERE public_id = $1)",
    )
    .bind(public_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let deleted = sqlx::query("DELETE FROM providers WHERE public_id = $1")
        .bind(public_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    if deleted > 0 {
        tracing::info!(provider_id = %public_id, reopened, "provider deleted");
    }
    Ok(deleted > 0)
}
