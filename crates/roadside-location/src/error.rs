use thiserror::Error;

/// Field-scoped input problem. Never clears previously valid state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("not a recognised map link with coordinates")]
    InvalidMapLink,

    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("no location is set yet")]
    NoLocation,

    #[error("viewport must have a positive width and height (got {width}x{height})")]
    InvalidViewport { width: f64, height: f64 },
}

impl ValidationError {
    /// Translation key shown next to the offending input.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationError::InvalidMapLink => "form.fields.location.invalidUrl",
            ValidationError::LatitudeOutOfRange(_) | ValidationError::LongitudeOutOfRange(_) => {
                "location.manualEntry.outOfRange"
            }
            ValidationError::NoLocation => "form.fields.location.error",
            ValidationError::InvalidViewport { .. } => "location.map.invalidViewport",
        }
    }
}

/// Why a sensor reading could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    PositionUnavailable,

    #[error("location request timed out")]
    Timeout,

    #[error("geolocation is not supported on this device")]
    Unsupported,

    #[error("unknown geolocation failure")]
    Unknown,
}

impl AcquisitionError {
    #[must_use]
    pub fn message_key(self) -> &'static str {
        match self {
            AcquisitionError::PermissionDenied => "location.locationError.permissionDenied",
            AcquisitionError::PositionUnavailable => "location.locationError.unavailable",
            AcquisitionError::Timeout => "location.locationError.timeout",
            AcquisitionError::Unsupported => "location.locationError.notSupported",
            AcquisitionError::Unknown => "location.locationError.unknown",
        }
    }
}

/// Non-blocking notice attached to an otherwise successful update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Sensor reading worse than 100 m; carries the rounded accuracy.
    PoorAccuracy { accuracy_m: u32 },
}

impl Advisory {
    #[must_use]
    pub fn message_key(self) -> &'static str {
        match self {
            Advisory::PoorAccuracy { .. } => "location.locationError.poorAccuracy",
        }
    }
}
