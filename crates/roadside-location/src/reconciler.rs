//! The single owner of a request form's location.
//!
//! Three write paths reach the state: a pasted link, a sensor reading, and
//! manual map interaction. Each path has exactly one mutating entry point
//! here, and each entry point leaves `share_url` consistent with
//! `coordinates`/`zoom`/`provider` before it returns.

use crate::acquisition::{
    accuracy_advisory, recommended_zoom, AcquisitionOutcome, AcquisitionPhase, AcquisitionTicket,
    GeolocationError, GeolocationProvider, PositionOptions, PositionReading,
};
use crate::codec;
use crate::error::{AcquisitionError, Advisory, ValidationError};
use crate::types::{
    is_valid_latitude, is_valid_longitude, Coordinates, LocationSource, LocationState,
    MapProvider, PermissionState, Zoom,
};

/// Accuracy assumed for map picks: reasonably precise, not sensor-grade.
pub const MANUAL_ACCURACY_M: f64 = 20.0;

/// Degrees covered by the visible map surface, per renderer.
const OPEN_MAP_CLICK_SPAN_DEG: f64 = codec::OPEN_MAP_SPAN_DEG;
const PRIMARY_CLICK_SPAN_DEG: f64 = 0.02;

/// Pixel size of the rendered map surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteOutcome {
    /// Coordinates, zoom and share URL were replaced.
    Updated,
    /// The link already matched the current share URL.
    Unchanged,
    /// Blank input; the location was cleared.
    Cleared,
}

#[derive(Debug, Clone)]
pub struct LocationReconciler {
    state: LocationState,
    options: PositionOptions,
    phase: AcquisitionPhase,
    generation: u64,
    permission: PermissionState,
    advisory: Option<Advisory>,
    acquisition_error: Option<AcquisitionError>,
    field_error: Option<ValidationError>,
}

impl Default for LocationReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: LocationState::default(),
            options: PositionOptions::default(),
            phase: AcquisitionPhase::Idle,
            generation: 0,
            permission: PermissionState::Prompt,
            advisory: None,
            acquisition_error: None,
            field_error: None,
        }
    }

    /// Start with `provider` as the display renderer.
    #[must_use]
    pub fn with_provider(mut self, provider: MapProvider) -> Self {
        self.state.provider = provider;
        self.state.rederive_share_url();
        self
    }

    #[must_use]
    pub fn with_position_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> &LocationState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> AcquisitionPhase {
        self.phase
    }

    #[must_use]
    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    #[must_use]
    pub fn advisory(&self) -> Option<Advisory> {
        self.advisory
    }

    #[must_use]
    pub fn acquisition_error(&self) -> Option<AcquisitionError> {
        self.acquisition_error
    }

    #[must_use]
    pub fn field_error(&self) -> Option<&ValidationError> {
        self.field_error.as_ref()
    }

    #[must_use]
    pub fn is_locating(&self) -> bool {
        self.phase == AcquisitionPhase::Locating
    }

    /// Whether the "use my location" trigger should be enabled.
    #[must_use]
    pub fn can_request_location(&self) -> bool {
        !self.is_locating()
            && !matches!(
                self.permission,
                PermissionState::Denied | PermissionState::Unsupported
            )
    }

    /// Primary-provider link for the current location, whatever renderer is
    /// on display. This is the value submitted with a request.
    #[must_use]
    pub fn primary_link(&self) -> Option<String> {
        self.state
            .coordinates
            .map(|coords| codec::encode(coords, self.state.zoom, MapProvider::Primary))
    }

    // -----------------------------------------------------------------------
    // Paste path
    // -----------------------------------------------------------------------

    /// Apply a link typed or pasted into the location field.
    ///
    /// An undecodable link records a field error and leaves the current
    /// location alone. A decodable link is only written when its primary
    /// encoding differs from the current share URL, so writing the derived
    /// URL back into the same field is a no-op rather than a new update.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMapLink`] when `input` is not a
    /// decodable primary-provider link.
    pub fn paste_link(&mut self, input: &str) -> Result<PasteOutcome, ValidationError> {
        if input.trim().is_empty() {
            self.supersede_acquisition();
            self.clear_location();
            return Ok(PasteOutcome::Cleared);
        }

        let Some(decoded) = codec::decode(input) else {
            tracing::debug!("pasted location link did not decode");
            return Err(self.reject(ValidationError::InvalidMapLink));
        };

        self.field_error = None;
        self.state.source = LocationSource::Manual;
        self.state.accuracy_m = None;

        let candidate = codec::encode(decoded.coordinates, decoded.zoom, MapProvider::Primary);
        if self.state.provider == MapProvider::Primary && candidate == self.state.share_url {
            return Ok(PasteOutcome::Unchanged);
        }

        self.supersede_acquisition();
        self.state.provider = MapProvider::Primary;
        self.state.coordinates = Some(decoded.coordinates);
        self.state.zoom = decoded.zoom;
        self.state.share_url = candidate;
        self.advisory = None;

        Ok(PasteOutcome::Updated)
    }

    // -----------------------------------------------------------------------
    // Sensor path
    // -----------------------------------------------------------------------

    /// Refresh the cached permission from the provider.
    pub fn refresh_permission<P: GeolocationProvider>(&mut self, provider: &P) {
        self.permission = if provider.is_supported() {
            provider.permission()
        } else {
            PermissionState::Unsupported
        };
    }

    /// Enter `Locating` and hand out a ticket for this attempt.
    ///
    /// Starting a new attempt supersedes any attempt still in flight: only
    /// the newest ticket can later be completed.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::Unsupported`] when the provider has no
    /// location capability; the phase becomes `Failed` and permission
    /// `Unsupported`.
    pub fn begin_acquisition<P: GeolocationProvider>(
        &mut self,
        provider: &P,
    ) -> Result<AcquisitionTicket, AcquisitionError> {
        if !provider.is_supported() {
            self.permission = PermissionState::Unsupported;
            self.fail(AcquisitionError::Unsupported);
            return Err(AcquisitionError::Unsupported);
        }

        self.generation += 1;
        self.phase = AcquisitionPhase::Locating;
        self.advisory = None;
        self.acquisition_error = None;

        Ok(AcquisitionTicket {
            generation: self.generation,
            options: self.options,
        })
    }

    /// Finish the attempt identified by `ticket` with the sensor's result.
    pub fn complete_acquisition(
        &mut self,
        ticket: AcquisitionTicket,
        result: Result<PositionReading, GeolocationError>,
    ) -> AcquisitionOutcome {
        // A ticket only counts while its attempt is the one still locating.
        if ticket.generation != self.generation || self.phase != AcquisitionPhase::Locating {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                phase = ?self.phase,
                "discarding stale location result"
            );
            return AcquisitionOutcome::Stale;
        }

        let reading = match result {
            Ok(reading) => reading,
            Err(err) => {
                let category = AcquisitionError::from(err);
                tracing::warn!(error = %category, "location acquisition failed");
                self.fail(category);
                return AcquisitionOutcome::Failed(category);
            }
        };

        let coordinates = Coordinates::new(reading.lat, reading.lng);
        let accuracy = Some(reading.accuracy_m).filter(|a| a.is_finite() && *a >= 0.0);
        let (Some(coordinates), Some(accuracy_m)) = (coordinates, accuracy) else {
            tracing::warn!(
                lat = reading.lat,
                lng = reading.lng,
                accuracy_m = reading.accuracy_m,
                "sensor returned an invalid reading"
            );
            self.fail(AcquisitionError::PositionUnavailable);
            return AcquisitionOutcome::Failed(AcquisitionError::PositionUnavailable);
        };

        self.state.coordinates = Some(coordinates);
        self.state.accuracy_m = Some(accuracy_m);
        self.state.source = LocationSource::Sensor;
        self.state.provider = MapProvider::Primary;
        self.state.zoom = recommended_zoom(accuracy_m);
        self.state.rederive_share_url();

        self.permission = PermissionState::Granted;
        self.phase = AcquisitionPhase::Resolved;
        self.acquisition_error = None;
        self.field_error = None;
        self.advisory = accuracy_advisory(accuracy_m);

        tracing::info!(
            accuracy_m,
            zoom = self.state.zoom.level(),
            "location resolved from sensor"
        );

        AcquisitionOutcome::Resolved {
            advisory: self.advisory,
        }
    }

    /// Run one full acquisition against `provider`, bounded by the
    /// configured timeout.
    pub async fn locate<P: GeolocationProvider>(&mut self, provider: &P) -> AcquisitionOutcome {
        let ticket = match self.begin_acquisition(provider) {
            Ok(ticket) => ticket,
            Err(err) => return AcquisitionOutcome::Failed(err),
        };

        let result = tokio::time::timeout(
            ticket.options.timeout,
            provider.current_position(&ticket.options),
        )
        .await
        .unwrap_or(Err(GeolocationError::Timeout));

        self.complete_acquisition(ticket, result)
    }

    // -----------------------------------------------------------------------
    // Manual map path
    // -----------------------------------------------------------------------

    /// Set coordinates and zoom from a map interaction.
    ///
    /// This is the only mutation point for click, zoom and numeric entry.
    ///
    /// # Errors
    ///
    /// Returns a range error if `lat` or `lng` is out of bounds; the current
    /// location is kept.
    pub fn update_location_from_map(
        &mut self,
        lat: f64,
        lng: f64,
        zoom: Zoom,
    ) -> Result<(), ValidationError> {
        if !is_valid_latitude(lat) {
            return Err(self.reject(ValidationError::LatitudeOutOfRange(lat)));
        }
        if !is_valid_longitude(lng) {
            return Err(self.reject(ValidationError::LongitudeOutOfRange(lng)));
        }
        let Some(coordinates) = Coordinates::new(lat, lng) else {
            return Err(self.reject(ValidationError::LatitudeOutOfRange(lat)));
        };

        self.apply_map_update(coordinates, zoom);
        Ok(())
    }

    /// Re-centre on a click at (`x`, `y`) pixels within `viewport`.
    ///
    /// Uses a flat linear offset over the renderer's fixed angular span; this
    /// is only sound at the small spans the embedded maps display.
    ///
    /// # Errors
    ///
    /// Fails with [`ValidationError::NoLocation`] before any location is set,
    /// [`ValidationError::InvalidViewport`] for a degenerate viewport, or a
    /// range error when the click lands past a pole or the antimeridian.
    pub fn click_map(&mut self, x: f64, y: f64, viewport: Viewport) -> Result<(), ValidationError> {
        let Some(center) = self.state.coordinates else {
            return Err(self.reject(ValidationError::NoLocation));
        };
        if !(viewport.width.is_finite()
            && viewport.height.is_finite()
            && viewport.width > 0.0
            && viewport.height > 0.0)
        {
            return Err(self.reject(ValidationError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            }));
        }

        let span = match self.state.provider {
            MapProvider::OpenMap => OPEN_MAP_CLICK_SPAN_DEG,
            MapProvider::Primary => PRIMARY_CLICK_SPAN_DEG,
        };
        let lat = center.lat() + (0.5 - y / viewport.height) * span;
        let lng = center.lng() + (x / viewport.width - 0.5) * span;

        self.update_location_from_map(lat, lng, self.state.zoom)
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.state.zoom.zoomed_in());
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.state.zoom.zoomed_out());
    }

    pub fn reset_view(&mut self) {
        self.set_zoom(Zoom::DEFAULT);
    }

    /// Numeric latitude entry; keeps the current longitude and zoom.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoLocation`] before a location exists, or a range
    /// error for an out-of-bounds value.
    pub fn set_latitude(&mut self, lat: f64) -> Result<(), ValidationError> {
        let Some(current) = self.state.coordinates else {
            return Err(self.reject(ValidationError::NoLocation));
        };
        self.update_location_from_map(lat, current.lng(), self.state.zoom)
    }

    /// Numeric longitude entry; keeps the current latitude and zoom.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoLocation`] before a location exists, or a range
    /// error for an out-of-bounds value.
    pub fn set_longitude(&mut self, lng: f64) -> Result<(), ValidationError> {
        let Some(current) = self.state.coordinates else {
            return Err(self.reject(ValidationError::NoLocation));
        };
        self.update_location_from_map(current.lat(), lng, self.state.zoom)
    }

    // -----------------------------------------------------------------------
    // Display and lifecycle
    // -----------------------------------------------------------------------

    /// Switch renderers. Coordinates are never touched.
    pub fn select_provider(&mut self, provider: MapProvider) {
        if self.state.provider == provider {
            return;
        }
        self.state.provider = provider;
        self.state.rederive_share_url();
        tracing::debug!(%provider, "map provider switched");
    }

    pub fn dismiss_advisory(&mut self) {
        self.advisory = None;
        self.acquisition_error = None;
    }

    /// Discard the location, e.g. after a successful submission.
    ///
    /// Any attempt still in flight becomes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = AcquisitionPhase::Idle;
        self.acquisition_error = None;
        self.clear_location();
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn set_zoom(&mut self, zoom: Zoom) {
        match self.state.coordinates {
            Some(coordinates) => self.apply_map_update(coordinates, zoom),
            None => self.state.zoom = zoom,
        }
    }

    fn apply_map_update(&mut self, coordinates: Coordinates, zoom: Zoom) {
        self.supersede_acquisition();
        self.state.coordinates = Some(coordinates);
        self.state.zoom = zoom;
        self.state.source = LocationSource::Manual;
        self.state.accuracy_m = Some(MANUAL_ACCURACY_M);
        self.state.rederive_share_url();
        self.field_error = None;
        self.advisory = None;
    }

    /// A manual edit wins over a sensor reading that has not arrived yet.
    fn supersede_acquisition(&mut self) {
        if self.phase == AcquisitionPhase::Locating {
            tracing::debug!(
                generation = self.generation,
                "manual edit supersedes location attempt in flight"
            );
            self.generation += 1;
            self.phase = AcquisitionPhase::Idle;
        }
    }

    fn clear_location(&mut self) {
        self.state = LocationState::empty(self.state.provider);
        self.field_error = None;
        self.advisory = None;
    }

    fn reject(&mut self, err: ValidationError) -> ValidationError {
        self.field_error = Some(err.clone());
        err
    }

    fn fail(&mut self, err: AcquisitionError) {
        self.phase = AcquisitionPhase::Failed(err);
        self.acquisition_error = Some(err);
        if err == AcquisitionError::PermissionDenied {
            self.permission = PermissionState::Denied;
        }
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;
