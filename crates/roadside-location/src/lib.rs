//! Location capture and reconciliation for a roadside-assistance request form.
//!
//! [`LocationReconciler`] owns one form's [`LocationState`] and accepts
//! writes from a pasted map link, a device sensor reading, or manual map
//! interaction, keeping the derived share URL in step with the coordinates.

pub mod acquisition;
pub mod codec;
pub mod error;
pub mod reconciler;
pub mod types;

pub use acquisition::{
    recommended_zoom, AcquisitionOutcome, AcquisitionPhase, AcquisitionTicket, GeolocationError,
    GeolocationProvider, PositionOptions, PositionReading,
};
pub use codec::{decode, encode, is_map_link, DecodedLink};
pub use error::{AcquisitionError, Advisory, ValidationError};
pub use reconciler::{LocationReconciler, PasteOutcome, Viewport, MANUAL_ACCURACY_M};
pub use types::{Coordinates, LocationSource, LocationState, MapProvider, PermissionState, Zoom};
