//! Request commands backed by the database.

use roadside_core::{NewRequest, RequestStatus, ServiceType};
use uuid::Uuid;

/// Validate and store a request as if it came from the public form.
///
/// # Errors
///
/// Returns an error listing every invalid field, or if the insert fails.
pub(crate) async fn run_submit(
    pool: &sqlx::PgPool,
    service_type: ServiceType,
    user_phone: String,
    location_link: String,
    notes: Option<String>,
) -> anyhow::Result<()> {
    let request = NewRequest {
        service_type,
        user_phone,
        location_link,
        notes,
    }
    .validate()?;

    let row = roadside_db::insert_request(pool, &request).await?;
    println!("submitted request {} ({})", row.public_id, row.status);
    Ok(())
}

/// Print a table of requests, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_list(
    pool: &sqlx::PgPool,
    status: Option<RequestStatus>,
    limit: i64,
) -> anyhow::Result<()> {
    let rows = roadside_db::list_requests(pool, status, limit.clamp(1, 200)).await?;

    if rows.is_empty() {
        println!(
            "no requests found{}",
            status.map(|s| format!(" with status {s}")).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{:<38}{:<15}{:<11}{:<17}{:<18}LOCATION",
        "ID", "SERVICE", "STATUS", "PHONE", "CREATED"
    );
    for row in &rows {
        println!(
            "{:<38}{:<15}{:<11}{:<17}{:<18}{}",
            row.public_id,
            row.service_type,
            row.status,
            row.user_phone,
            row.created_at.format("%Y-%m-%d %H:%M"),
            row.location_link
        );
    }
    Ok(())
}

/// Apply a status change after checking the transition is allowed.
///
/// # Errors
///
/// Returns an error if the request or provider does not exist, the
/// transition is not allowed, or the update fails.
pub(crate) async fn run_set_status(
    pool: &sqlx::PgPool,
    id: Uuid,
    status: RequestStatus,
    provider_id: Option<Uuid>,
) -> anyhow::Result<()> {
    let current = roadside_db::get_request(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("request '{id}' not found"))?;
    let from: RequestStatus = current.status.parse()?;
    from.check_transition(status, provider_id)?;

    if let Some(provider_id) = provider_id {
        roadside_db::get_provider(pool, provider_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("provider '{provider_id}' not found"))?;
    }

    let row = roadside_db::update_request_status(pool, id, status, provider_id).await?;
    tracing::info!(request_id = %row.public_id, status = %row.status, "status changed from cli");
    println!(
        "request {} is now {}{}",
        row.public_id,
        row.status,
        row.provider_name
            .map(|name| format!(" (provider: {name})"))
            .unwrap_or_default()
    );
    Ok(())
}
