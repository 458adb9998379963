//! Domain types for the location reconciler.

use serde::{Deserialize, Serialize};

use crate::codec;

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 20;
pub const DEFAULT_ZOOM: u8 = 16;

/// A range-valid latitude/longitude pair in decimal degrees.
///
/// The only way to build one is [`Coordinates::new`], so a value of this type
/// is always complete and inside `[-90, 90]` / `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = String;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Coordinates::new(raw.lat, raw.lng)
            .ok_or_else(|| format!("coordinates out of range: {},{}", raw.lat, raw.lng))
    }
}

impl Coordinates {
    /// Returns `None` when either value is non-finite or outside its range.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if is_valid_latitude(lat) && is_valid_longitude(lng) {
            Some(Self { lat, lng })
        } else {
            None
        }
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lng(&self) -> f64 {
        self.lng
    }
}

#[must_use]
pub fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat)
}

#[must_use]
pub fn is_valid_longitude(lng: f64) -> bool {
    (-180.0..=180.0).contains(&lng)
}

/// Map zoom level, always within `MIN_ZOOM..=MAX_ZOOM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Zoom(u8);

impl Zoom {
    pub const DEFAULT: Zoom = Zoom(DEFAULT_ZOOM);

    /// Builds a zoom level, clamping out-of-range input into `1..=20`.
    #[must_use]
    pub fn new(level: i64) -> Self {
        let clamped = level.clamp(i64::from(MIN_ZOOM), i64::from(MAX_ZOOM));
        // clamped is within 1..=20, so the conversion cannot fail.
        Self(u8::try_from(clamped).unwrap_or(DEFAULT_ZOOM))
    }

    #[must_use]
    pub fn level(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn zoomed_in(self) -> Self {
        Self::new(i64::from(self.0) + 1)
    }

    #[must_use]
    pub fn zoomed_out(self) -> Self {
        Self::new(i64::from(self.0) - 1)
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i64> for Zoom {
    fn from(level: i64) -> Self {
        Self::new(level)
    }
}

impl From<Zoom> for u8 {
    fn from(zoom: Zoom) -> Self {
        zoom.0
    }
}

impl std::fmt::Display for Zoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External renderer that a share URL targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapProvider {
    /// Google Maps query links; the only decodable format.
    #[default]
    Primary,
    /// OpenStreetMap bounding-box embed; produce-only.
    OpenMap,
}

impl std::fmt::Display for MapProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapProvider::Primary => write!(f, "primary"),
            MapProvider::OpenMap => write!(f, "open_map"),
        }
    }
}

impl std::str::FromStr for MapProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" | "google" => Ok(MapProvider::Primary),
            "open_map" | "open-map" | "osm" => Ok(MapProvider::OpenMap),
            other => Err(format!("unknown map provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    #[default]
    Unset,
    /// Pasted link or map interaction.
    Manual,
    Sensor,
}

/// Browser-level geolocation permission as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    #[default]
    Prompt,
    Unsupported,
}

/// Canonical location of one in-progress request form.
///
/// Fields are read-only outside this crate; every write goes through
/// [`crate::LocationReconciler`], which regenerates `share_url` in the same
/// step as the fields it derives from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationState {
    pub(crate) coordinates: Option<Coordinates>,
    pub(crate) accuracy_m: Option<f64>,
    pub(crate) source: LocationSource,
    pub(crate) zoom: Zoom,
    pub(crate) share_url: String,
    pub(crate) provider: MapProvider,
}

impl LocationState {
    #[must_use]
    pub fn empty(provider: MapProvider) -> Self {
        Self {
            coordinates: None,
            accuracy_m: None,
            source: LocationSource::Unset,
            zoom: Zoom::DEFAULT,
            share_url: String::new(),
            provider,
        }
    }

    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    #[must_use]
    pub fn accuracy_m(&self) -> Option<f64> {
        self.accuracy_m
    }

    #[must_use]
    pub fn source(&self) -> LocationSource {
        self.source
    }

    #[must_use]
    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    /// Empty when no coordinates are set.
    #[must_use]
    pub fn share_url(&self) -> &str {
        &self.share_url
    }

    #[must_use]
    pub fn provider(&self) -> MapProvider {
        self.provider
    }

    /// Regenerates `share_url` from the current coordinates, zoom and provider.
    pub(crate) fn rederive_share_url(&mut self) {
        self.share_url = self
            .coordinates
            .map(|coords| codec::encode(coords, self.zoom, self.provider))
            .unwrap_or_default();
    }
}

impl Default for LocationState {
    fn default() -> Self {
        Self::empty(MapProvider::default())
    }
}
