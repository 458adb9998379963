//! Device-location acquisition: provider seam, request options, and the
//! accuracy/error classification applied to each reading.
//!
//! The state transitions themselves live on [`crate::LocationReconciler`]
//! because a resolved reading has to be written into the location state in
//! the same step that ends the attempt.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::error::{AcquisitionError, Advisory};
use crate::types::{PermissionState, Zoom};

/// Readings worse than this (meters) resolve with a poor-accuracy advisory.
pub const POOR_ACCURACY_THRESHOLD_M: f64 = 100.0;

/// Options passed to the sensor for a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached reading the sensor may return instead of a fresh fix.
    pub max_cache_age: Duration,
}

impl PositionOptions {
    pub const MIN_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Default options with a custom timeout, raised to [`Self::MIN_TIMEOUT`]
    /// if shorter.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: timeout.max(Self::MIN_TIMEOUT),
            ..Self::default()
        }
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Self::DEFAULT_TIMEOUT,
            max_cache_age: Duration::ZERO,
        }
    }
}

/// A single fix reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReading {
    pub lat: f64,
    pub lng: f64,
    /// Radius of the 68% confidence circle, in meters.
    pub accuracy_m: f64,
}

/// Failure reported by a [`GeolocationProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out")]
    Timeout,
    #[error("geolocation failure: {0}")]
    Other(String),
}

impl From<GeolocationError> for AcquisitionError {
    fn from(err: GeolocationError) -> Self {
        match err {
            GeolocationError::PermissionDenied => AcquisitionError::PermissionDenied,
            GeolocationError::PositionUnavailable => AcquisitionError::PositionUnavailable,
            GeolocationError::Timeout => AcquisitionError::Timeout,
            GeolocationError::Other(_) => AcquisitionError::Unknown,
        }
    }
}

/// Source of device position fixes.
pub trait GeolocationProvider {
    /// `false` when the device has no location capability at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Permission as currently known to the platform, before any request.
    fn permission(&self) -> PermissionState {
        PermissionState::Prompt
    }

    /// Request one fresh fix.
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<PositionReading, GeolocationError>>;
}

/// Where the current acquisition attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionPhase {
    #[default]
    Idle,
    Locating,
    Resolved,
    Failed(AcquisitionError),
}

/// Handle for one started attempt; only the newest ticket may complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionTicket {
    pub(crate) generation: u64,
    pub(crate) options: PositionOptions,
}

impl AcquisitionTicket {
    #[must_use]
    pub fn options(&self) -> &PositionOptions {
        &self.options
    }
}

/// Result of completing an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// Location state was updated from the reading.
    Resolved { advisory: Option<Advisory> },
    Failed(AcquisitionError),
    /// A newer attempt started first; nothing was changed.
    Stale,
}

/// Initial display zoom for a reading of the given accuracy.
#[must_use]
pub fn recommended_zoom(accuracy_m: f64) -> Zoom {
    let level = if accuracy_m > 1000.0 {
        15
    } else if accuracy_m > 100.0 {
        16
    } else if accuracy_m > 50.0 {
        17
    } else if accuracy_m > 20.0 {
        18
    } else {
        19
    };
    Zoom::new(level)
}

/// Advisory to surface alongside a successful reading, if any.
#[must_use]
pub fn accuracy_advisory(accuracy_m: f64) -> Option<Advisory> {
    if accuracy_m > POOR_ACCURACY_THRESHOLD_M {
        // Accuracy is finite and positive here; truncation only matters past u32::MAX meters.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rounded = accuracy_m.round().min(f64::from(u32::MAX)) as u32;
        Some(Advisory::PoorAccuracy {
            accuracy_m: rounded,
        })
    } else {
        None
    }
}
