//! Live tests for roadside-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, migrated Postgres database from the sqlx test
//! harness; `"../../migrations"` is relative to `crates/roadside-db/`.

use roadside_core::{
    NewProvider, NewRequest, ProviderUpdate, RequestStatus, ServiceType, ValidProvider,
    ValidRequest,
};
use roadside_db::{
    create_provider, delete_provider, delete_request, find_provider_by_phone, get_provider,
    get_request, insert_request, list_providers, list_requests, update_provider,
    update_request_status, DbError,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn valid_request(service_type: ServiceType) -> ValidRequest {
    NewRequest {
        service_type,
        user_phone: "+9613123456".to_string(),
        location_link: "https://maps.google.com/maps?q=33.8938,35.5018&z=16".to_string(),
        notes: Some("white van".to_string()),
    }
    .validate()
    .expect("valid request")
}

fn valid_provider(name: &str, phone: &str) -> ValidProvider {
    NewProvider {
        name: name.to_string(),
        phone: phone.to_string(),
        service_types: vec![ServiceType::Tow, ServiceType::BatteryJump],
        coverage_area: "Beirut".to_string(),
        active: true,
    }
    .validate()
    .expect("valid provider")
}

// ---------------------------------------------------------------------------
// requests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn inserted_request_starts_pending(pool: sqlx::PgPool) {
    let row = insert_request(&pool, &valid_request(ServiceType::Tow))
        .await
        .expect("insert");
    assert_eq!(row.status, "pending");
    assert_eq!(row.service_type, "tow");
    assert!(row.provider_public_id.is_none());

    let fetched = get_request(&pool, row.public_id)
        .await
        .expect("get")
        .expect("row exists");
    assert_eq!(fetched.notes.as_deref(), Some("white van"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_requests_filters_by_status_and_limit(pool: sqlx::PgPool) {
    let first = insert_request(&pool, &valid_request(ServiceType::Tow))
        .await
        .expect("insert");
    insert_request(&pool, &valid_request(ServiceType::FlatTire))
        .await
        .expect("insert");
    update_request_status(&pool, first.public_id, RequestStatus::Completed, None)
        .await
        .expect("complete");

    let pending = list_requests(&pool, Some(RequestStatus::Pending), 50)
        .await
        .expect("list");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].service_type, "flat_tire");

    let all = list_requests(&pool, None, 1).await.expect("list");
    assert_eq!(all.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn assigning_and_reopening_tracks_provider(pool: sqlx::PgPool) {
    let provider = create_provider(&pool, &valid_provider("Cedar Towing", "+9613555111"))
        .await
        .expect("provider");
    let request = insert_request(&pool, &valid_request(ServiceType::Tow))
        .await
        .expect("insert");

    let assigned = update_request_status(
        &pool,
        request.public_id,
        RequestStatus::Assigned,
        Some(provider.public_id),
    )
    .await
    .expect("assign");
    assert_eq!(assigned.status, "assigned");
    assert_eq!(assigned.provider_public_id, Some(provider.public_id));
    assert_eq!(assigned.provider_name.as_deref(), Some("Cedar Towing"));

    let completed =
        update_request_status(&pool, request.public_id, RequestStatus::Completed, None)
            .await
            .expect("complete");
    assert_eq!(completed.provider_public_id, Some(provider.public_id));

    let reopened = update_request_status(&pool, request.public_id, RequestStatus::Pending, None)
        .await
        .expect("reopen");
    assert!(reopened.provider_public_id.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn updating_missing_request_is_not_found(pool: sqlx::PgPool) {
    let err = update_request_status(&pool, Uuid::new_v4(), RequestStatus::Completed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_request_reports_whether_it_matched(pool: sqlx::PgPool) {
    let row = insert_request(&pool, &valid_request(ServiceType::FuelDelivery))
        .await
        .expect("insert");
    assert!(delete_request(&pool, row.public_id).await.expect("delete"));
    assert!(!delete_request(&pool, row.public_id).await.expect("delete"));
}

// ---------------------------------------------------------------------------
// providers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_phone_is_a_unique_violation(pool: sqlx::PgPool) {
    create_provider(&pool, &valid_provider("First", "+9613555111"))
        .await
        .expect("first");
    let err = create_provider(&pool, &valid_provider("Second", "+9613555111"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "got {err:?}");

    let found = find_provider_by_phone(&pool, "+9613555111")
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(found.name, "First");
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_providers_applies_status_and_search(pool: sqlx::PgPool) {
    create_provider(&pool, &valid_provider("Cedar Towing", "+9613555111"))
        .await
        .expect("create");
    let mut inactive = valid_provider("Harbor Batteries", "+9613555222");
    inactive.active = false;
    inactive.coverage_area = "Jounieh".to_string();
    create_provider(&pool, &inactive).await.expect("create");

    let active = list_providers(&pool, Some(true), None).await.expect("list");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "Cedar Towing");

    let by_area = list_providers(&pool, None, Some("jounieh"))
        .await
        .expect("list");
    assert_eq!(by_area.len(), 1);
    assert_eq!(by_area[0].name, "Harbor Batteries");

    let by_phone = list_providers(&pool, None, Some("555111"))
        .await
        .expect("list");
    assert_eq!(by_phone.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_provider_keeps_absent_fields(pool: sqlx::PgPool) {
    let created = create_provider(&pool, &valid_provider("Cedar Towing", "+9613555111"))
        .await
        .expect("create");
    let update = ProviderUpdate {
        active: Some(false),
        service_types: Some(vec![ServiceType::MinorRepair]),
        ..ProviderUpdate::default()
    }
    .validate()
    .expect("valid update");

    let updated = update_provider(&pool, created.public_id, &update)
        .await
        .expect("update");
    assert!(!updated.is_active);
    assert_eq!(updated.name, "Cedar Towing");
    assert_eq!(updated.service_types, vec!["minor_repair".to_string()]);

    let err = update_provider(&pool, Uuid::new_v4(), &update)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_provider_reopens_assigned_requests(pool: sqlx::PgPool) {
    let provider = create_provider(&pool, &valid_provider("Cedar Towing", "+9613555111"))
        .await
        .expect("provider");
    let request = insert_request(&pool, &valid_request(ServiceType::Tow))
        .await
        .expect("insert");
    update_request_status(
        &pool,
        request.public_id,
        RequestStatus::Assigned,
        Some(provider.public_id),
    )
    .await
    .expect("assign");

    assert!(delete_provider(&pool, provider.public_id)
        .await
        .expect("delete"));
    assert!(get_provider(&pool, provider.public_id)
        .await
        .expect("get")
        .is_none());

    let request = get_request(&pool, request.public_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(request.status, "pending");
    assert!(request.provider_public_id.is_none());
}
