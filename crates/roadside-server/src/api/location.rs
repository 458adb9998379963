//! Public location helpers for the request form.

use std::time::Duration;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use roadside_core::ValidationErrors;
use roadside_location::{decode, encode, is_map_link, MapProvider, ValidationError};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ResolveQuery {
    pub link: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ResolvedLink {
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
    pub primary_url: String,
    pub open_map_url: String,
}

#[derive(Debug, Serialize)]
pub(super) struct GeolocationSettings {
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct LocationSettings {
    pub geolocation: GeolocationSettings,
    pub default_map_provider: MapProvider,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// GET /api/v1/location/resolve?link=
pub(super) async fn resolve_link(
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ApiResponse<ResolvedLink>>, ApiError> {
    let Some(link) = decode(&query.link) else {
        let message = if is_map_link(&query.link) {
            "map link does not carry coordinates; open it and share the pin instead".to_string()
        } else {
            ValidationError::InvalidMapLink.to_string()
        };
        let mut errors = ValidationErrors::default();
        errors.push("link", message);
        return Err(ApiError::validation(req_id.0, errors));
    };

    tracing::debug!(
        lat = link.coordinates.lat(),
        lng = link.coordinates.lng(),
        zoom = link.zoom.level(),
        "resolved map link"
    );

    Ok(Json(ApiResponse {
        data: ResolvedLink {
            lat: link.coordinates.lat(),
            lng: link.coordinates.lng(),
            zoom: link.zoom.level(),
            primary_url: encode(link.coordinates, link.zoom, MapProvider::Primary),
            open_map_url: encode(link.coordinates, link.zoom, MapProvider::OpenMap),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/location/settings
pub(super) async fn settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<LocationSettings>> {
    let position = state.location.position;
    Json(ApiResponse {
        data: LocationSettings {
            geolocation: GeolocationSettings {
                high_accuracy: position.high_accuracy,
                timeout_ms: millis(position.timeout),
                maximum_age_ms: millis(position.max_cache_age),
            },
            default_map_provider: state.location.map_provider,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}
