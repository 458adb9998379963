//! Share-URL codec for the two supported map renderers.
//!
//! Primary links look like `https://maps.google.com/maps?q=<lat>,<lng>&z=<zoom>`
//! (capture form) or `https://www.google.com/maps?q=<lat>,<lng>&z=<zoom>`
//! (share form); both decode. Open-map links are bounding-box embeds and are
//! produced but never decoded.

use reqwest::Url;

use crate::types::{Coordinates, MapProvider, Zoom};

/// Angular width and height of the open-map bounding box, in degrees.
pub const OPEN_MAP_SPAN_DEG: f64 = 0.1;

const PRIMARY_CAPTURE_BASE: &str = "https://maps.google.com/maps";
const OPEN_MAP_EMBED_BASE: &str = "https://www.openstreetmap.org/export/embed.html";

/// Coordinates and zoom recovered from a primary-provider link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedLink {
    pub coordinates: Coordinates,
    pub zoom: Zoom,
}

/// Build the share URL for `coordinates` on `provider`.
///
/// Open-map links ignore `zoom`; that embed takes a box rather than a level.
#[must_use]
pub fn encode(coordinates: Coordinates, zoom: Zoom, provider: MapProvider) -> String {
    let (lat, lng) = (coordinates.lat(), coordinates.lng());
    match provider {
        MapProvider::Primary => format!("{PRIMARY_CAPTURE_BASE}?q={lat},{lng}&z={zoom}"),
        MapProvider::OpenMap => {
            let half = OPEN_MAP_SPAN_DEG / 2.0;
            format!(
                "{OPEN_MAP_EMBED_BASE}?bbox={},{},{},{}&layer=mapnik&marker={lat},{lng}",
                lng - half,
                lat - half,
                lng + half,
                lat + half,
            )
        }
    }
}

/// Parse a primary-provider link back into coordinates and zoom.
///
/// Returns `None` for anything that is not a primary link with a `q` value of
/// exactly two numeric, range-valid tokens. A missing or unparseable `z`
/// falls back to the default zoom; an out-of-range `z` is clamped.
#[must_use]
pub fn decode(url: &str) -> Option<DecodedLink> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !is_primary_link(&parsed) {
        return None;
    }

    let q = query_value(&parsed, "q")?;
    let mut tokens = q.split(',');
    let (Some(lat_raw), Some(lng_raw), None) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return None;
    };

    let lat = lat_raw.trim().parse::<f64>().ok()?;
    let lng = lng_raw.trim().parse::<f64>().ok()?;
    let coordinates = Coordinates::new(lat, lng)?;

    let zoom = query_value(&parsed, "z")
        .and_then(|z| z.trim().parse::<i64>().ok())
        .map_or(Zoom::DEFAULT, Zoom::new);

    Some(DecodedLink { coordinates, zoom })
}

/// Whether `url` points at a recognised map service.
///
/// Broader than [`decode`]: short links (`goo.gl/maps`, `maps.app.goo.gl`)
/// are accepted even though they carry no coordinates.
#[must_use]
pub fn is_map_link(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    if is_primary_link(&parsed) {
        return true;
    }

    match host_of(&parsed).as_deref() {
        Some("goo.gl") => parsed.path().starts_with("/maps"),
        Some("maps.app.goo.gl") => true,
        _ => false,
    }
}

fn is_primary_link(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    match host_of(url).as_deref() {
        Some("maps.google.com") => true,
        Some("www.google.com" | "google.com") => url.path().starts_with("/maps"),
        _ => false,
    }
}

fn host_of(url: &Url) -> Option<String> {
    url.host_str().map(str::to_ascii_lowercase)
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
