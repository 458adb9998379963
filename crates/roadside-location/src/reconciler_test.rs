use std::future::Future;

use super::*;

struct FixedProvider(Result<PositionReading, GeolocationError>);

impl GeolocationProvider for FixedProvider {
    fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> impl Future<Output = Result<PositionReading, GeolocationError>> {
        std::future::ready(self.0.clone())
    }
}

struct NoSensor;

impl GeolocationProvider for NoSensor {
    fn is_supported(&self) -> bool {
        false
    }

    fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> impl Future<Output = Result<PositionReading, GeolocationError>> {
        std::future::ready(Err(GeolocationError::PositionUnavailable))
    }
}

struct NeverAnswers;

impl GeolocationProvider for NeverAnswers {
    fn permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> impl Future<Output = Result<PositionReading, GeolocationError>> {
        std::future::pending()
    }
}

fn reading(lat: f64, lng: f64, accuracy_m: f64) -> PositionReading {
    PositionReading {
        lat,
        lng,
        accuracy_m,
    }
}

fn coords(lat: f64, lng: f64) -> Coordinates {
    Coordinates::new(lat, lng).expect("valid test coordinates")
}

const BEIRUT_LINK: &str = "https://maps.google.com/maps?q=33.8938,35.5018&z=14";

// ---------------------------------------------------------------------------
// Paste path
// ---------------------------------------------------------------------------

#[test]
fn paste_valid_link_sets_manual_location() {
    let mut r = LocationReconciler::new();
    assert_eq!(r.paste_link(BEIRUT_LINK), Ok(PasteOutcome::Updated));

    let state = r.state();
    assert_eq!(state.coordinates(), Some(coords(33.8938, 35.5018)));
    assert_eq!(state.zoom().level(), 14);
    assert_eq!(state.source(), LocationSource::Manual);
    assert_eq!(state.accuracy_m(), None);
    assert_eq!(state.provider(), MapProvider::Primary);
    assert_eq!(state.share_url(), BEIRUT_LINK);
    assert!(r.field_error().is_none());
}

#[test]
fn bad_paste_keeps_previous_location() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();

    let err = r
        .paste_link("https://maps.google.com/maps?q=200,35&z=10")
        .unwrap_err();
    assert_eq!(err, ValidationError::InvalidMapLink);
    assert_eq!(r.field_error(), Some(&ValidationError::InvalidMapLink));
    assert_eq!(r.state().coordinates(), Some(coords(33.8938, 35.5018)));
    assert_eq!(r.state().share_url(), BEIRUT_LINK);
}

#[test]
fn good_paste_clears_previous_field_error() {
    let mut r = LocationReconciler::new();
    r.paste_link("garbage").unwrap_err();
    assert!(r.field_error().is_some());

    r.paste_link(BEIRUT_LINK).unwrap();
    assert!(r.field_error().is_none());
}

#[test]
fn pasting_own_share_url_is_a_no_op() {
    let mut r = LocationReconciler::new();
    r.update_location_from_map(33.123_456_7, 35.765_432_1, Zoom::new(18))
        .unwrap();
    let before = r.state().coordinates();
    let own = r.state().share_url().to_owned();

    for _ in 0..3 {
        assert_eq!(r.paste_link(&own), Ok(PasteOutcome::Unchanged));
    }
    assert_eq!(r.state().coordinates(), before);
    assert_eq!(r.state().share_url(), own);
}

#[test]
fn pasting_share_form_of_current_point_is_unchanged() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();
    assert_eq!(
        r.paste_link("https://www.google.com/maps?q=33.8938,35.5018&z=14"),
        Ok(PasteOutcome::Unchanged)
    );
}

#[test]
fn pasting_same_point_at_new_zoom_updates() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();
    assert_eq!(
        r.paste_link("https://maps.google.com/maps?q=33.8938,35.5018&z=10"),
        Ok(PasteOutcome::Updated)
    );
    assert_eq!(r.state().zoom().level(), 10);
}

#[test]
fn paste_over_sensor_reading_drops_accuracy() {
    let mut r = LocationReconciler::new();
    let ticket = r.begin_acquisition(&NeverAnswers).unwrap();
    r.complete_acquisition(ticket, Ok(reading(33.9, 35.5, 12.0)));
    assert_eq!(r.state().source(), LocationSource::Sensor);

    let own = r.state().share_url().to_owned();
    assert_eq!(r.paste_link(&own), Ok(PasteOutcome::Unchanged));
    assert_eq!(r.state().source(), LocationSource::Manual);
    assert_eq!(r.state().accuracy_m(), None);
}

#[test]
fn paste_while_open_map_selected_switches_back_to_primary() {
    let mut r = LocationReconciler::new().with_provider(MapProvider::OpenMap);
    r.paste_link(BEIRUT_LINK).unwrap();
    assert_eq!(r.state().provider(), MapProvider::Primary);
    assert_eq!(r.state().share_url(), BEIRUT_LINK);
}

#[test]
fn blank_paste_clears_location() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();
    assert_eq!(r.paste_link("   "), Ok(PasteOutcome::Cleared));
    assert!(r.state().coordinates().is_none());
    assert_eq!(r.state().share_url(), "");
    assert_eq!(r.state().source(), LocationSource::Unset);
}

// ---------------------------------------------------------------------------
// Manual map path
// ---------------------------------------------------------------------------

#[test]
fn update_from_map_sets_all_fields_together() {
    let mut r = LocationReconciler::new();
    r.update_location_from_map(33.8938, 35.5018, Zoom::new(17))
        .unwrap();

    let state = r.state();
    assert_eq!(state.coordinates(), Some(coords(33.8938, 35.5018)));
    assert_eq!(state.zoom().level(), 17);
    assert_eq!(state.source(), LocationSource::Manual);
    assert_eq!(state.accuracy_m(), Some(MANUAL_ACCURACY_M));

    let decoded = codec::decode(state.share_url()).expect("share url decodes");
    assert_eq!(decoded.coordinates, coords(33.8938, 35.5018));
    assert_eq!(decoded.zoom.level(), 17);
}

#[test]
fn update_from_map_uses_active_provider() {
    let mut r = LocationReconciler::new().with_provider(MapProvider::OpenMap);
    r.update_location_from_map(33.8938, 35.5018, Zoom::new(17))
        .unwrap();
    assert!(r
        .state()
        .share_url()
        .starts_with("https://www.openstreetmap.org/export/embed.html?bbox="));
    assert_eq!(
        r.primary_link().as_deref(),
        Some("https://maps.google.com/maps?q=33.8938,35.5018&z=17")
    );
}

#[test]
fn out_of_range_map_update_keeps_state() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();
    let before = r.state().clone();

    assert_eq!(
        r.update_location_from_map(95.0, 35.0, Zoom::DEFAULT),
        Err(ValidationError::LatitudeOutOfRange(95.0))
    );
    assert_eq!(
        r.update_location_from_map(33.0, -200.0, Zoom::DEFAULT),
        Err(ValidationError::LongitudeOutOfRange(-200.0))
    );
    assert_eq!(r.state(), &before);
    assert!(r.field_error().is_some());
}

#[test]
fn click_at_centre_keeps_coordinates() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();
    let viewport = Viewport {
        width: 400.0,
        height: 200.0,
    };
    r.click_map(200.0, 100.0, viewport).unwrap();
    assert_eq!(r.state().coordinates(), Some(coords(33.8938, 35.5018)));
    assert_eq!(r.state().accuracy_m(), Some(MANUAL_ACCURACY_M));
}

#[test]
fn click_offsets_scale_with_provider_span() {
    let viewport = Viewport {
        width: 100.0,
        height: 100.0,
    };

    let mut primary = LocationReconciler::new();
    primary.update_location_from_map(10.0, 20.0, Zoom::DEFAULT).unwrap();
    // Top-right corner: half a span north and east.
    primary.click_map(100.0, 0.0, viewport).unwrap();
    let c = primary.state().coordinates().unwrap();
    assert!((c.lat() - 10.01).abs() < 1e-9);
    assert!((c.lng() - 20.01).abs() < 1e-9);

    let mut open = LocationReconciler::new().with_provider(MapProvider::OpenMap);
    open.update_location_from_map(10.0, 20.0, Zoom::DEFAULT).unwrap();
    // Bottom-left corner.
    open.click_map(0.0, 100.0, viewport).unwrap();
    let c = open.state().coordinates().unwrap();
    assert!((c.lat() - 9.95).abs() < 1e-9);
    assert!((c.lng() - 19.95).abs() < 1e-9);
}

#[test]
fn click_past_the_pole_is_rejected() {
    let mut r = LocationReconciler::new();
    r.paste_link("https://maps.google.com/maps?q=89.995,10&z=14")
        .unwrap();
    let viewport = Viewport {
        width: 400.0,
        height: 200.0,
    };

    let err = r.click_map(200.0, 0.0, viewport).unwrap_err();
    assert!(matches!(err, ValidationError::LatitudeOutOfRange(lat) if lat > 90.0));
    assert_eq!(r.state().coordinates(), Some(coords(89.995, 10.0)));
}

#[test]
fn click_requires_location_and_viewport() {
    let mut r = LocationReconciler::new();
    let viewport = Viewport {
        width: 10.0,
        height: 10.0,
    };
    assert_eq!(
        r.click_map(1.0, 1.0, viewport),
        Err(ValidationError::NoLocation)
    );

    r.paste_link(BEIRUT_LINK).unwrap();
    let flat = Viewport {
        width: 10.0,
        height: 0.0,
    };
    assert!(matches!(
        r.click_map(1.0, 1.0, flat),
        Err(ValidationError::InvalidViewport { .. })
    ));
}

#[test]
fn zoom_controls_clamp_and_rederive() {
    let mut r = LocationReconciler::new();
    r.paste_link("https://maps.google.com/maps?q=33.8938,35.5018&z=19")
        .unwrap();

    r.zoom_in();
    r.zoom_in();
    assert_eq!(r.state().zoom().level(), 20);
    assert!(r.state().share_url().ends_with("&z=20"));

    r.zoom_out();
    assert_eq!(r.state().zoom().level(), 19);

    r.reset_view();
    assert_eq!(r.state().zoom(), Zoom::DEFAULT);
    assert!(r.state().share_url().ends_with("&z=16"));
    assert_eq!(r.state().coordinates(), Some(coords(33.8938, 35.5018)));
}

#[test]
fn zoom_without_location_only_changes_zoom() {
    let mut r = LocationReconciler::new();
    r.zoom_out();
    assert_eq!(r.state().zoom().level(), 15);
    assert!(r.state().coordinates().is_none());
    assert_eq!(r.state().share_url(), "");
    assert_eq!(r.state().source(), LocationSource::Unset);
}

#[test]
fn numeric_entry_edits_one_axis() {
    let mut r = LocationReconciler::new();
    assert_eq!(r.set_latitude(33.0), Err(ValidationError::NoLocation));

    r.paste_link(BEIRUT_LINK).unwrap();
    r.set_latitude(34.1).unwrap();
    r.set_longitude(35.9).unwrap();
    assert_eq!(r.state().coordinates(), Some(coords(34.1, 35.9)));
    assert_eq!(r.state().zoom().level(), 14);

    assert!(r.set_longitude(181.0).is_err());
    assert_eq!(r.state().coordinates(), Some(coords(34.1, 35.9)));
}

// ---------------------------------------------------------------------------
// Provider toggle
// ---------------------------------------------------------------------------

#[test]
fn provider_toggle_never_moves_coordinates() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();

    r.select_provider(MapProvider::OpenMap);
    assert_eq!(r.state().coordinates(), Some(coords(33.8938, 35.5018)));
    assert_eq!(
        r.state().share_url(),
        codec::encode(coords(33.8938, 35.5018), Zoom::new(14), MapProvider::OpenMap)
    );

    r.select_provider(MapProvider::Primary);
    assert_eq!(r.state().share_url(), BEIRUT_LINK);
}

// ---------------------------------------------------------------------------
// Sensor path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn locate_success_sets_sensor_state() {
    let mut r = LocationReconciler::new().with_provider(MapProvider::OpenMap);
    let outcome = r
        .locate(&FixedProvider(Ok(reading(33.8938, 35.5018, 30.0))))
        .await;

    assert_eq!(outcome, AcquisitionOutcome::Resolved { advisory: None });
    let state = r.state();
    assert_eq!(state.source(), LocationSource::Sensor);
    assert_eq!(state.accuracy_m(), Some(30.0));
    assert_eq!(state.provider(), MapProvider::Primary);
    assert_eq!(state.zoom().level(), 18);
    assert_eq!(
        state.share_url(),
        "https://maps.google.com/maps?q=33.8938,35.5018&z=18"
    );
    assert_eq!(r.phase(), AcquisitionPhase::Resolved);
    assert_eq!(r.permission(), PermissionState::Granted);
}

#[tokio::test]
async fn poor_accuracy_resolves_with_advisory() {
    let mut r = LocationReconciler::new();
    let outcome = r
        .locate(&FixedProvider(Ok(reading(33.9, 35.5, 487.6))))
        .await;

    let expected = Advisory::PoorAccuracy { accuracy_m: 488 };
    assert_eq!(
        outcome,
        AcquisitionOutcome::Resolved {
            advisory: Some(expected)
        }
    );
    assert_eq!(r.advisory(), Some(expected));
    assert_eq!(r.state().zoom().level(), 16);
    assert!(r.state().coordinates().is_some());

    r.dismiss_advisory();
    assert!(r.advisory().is_none());
}

#[tokio::test]
async fn permission_denied_disables_trigger_and_keeps_location() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();

    let outcome = r
        .locate(&FixedProvider(Err(GeolocationError::PermissionDenied)))
        .await;

    assert_eq!(
        outcome,
        AcquisitionOutcome::Failed(AcquisitionError::PermissionDenied)
    );
    assert_eq!(r.permission(), PermissionState::Denied);
    assert!(!r.can_request_location());
    assert_eq!(
        r.acquisition_error().map(AcquisitionError::message_key),
        Some("location.locationError.permissionDenied")
    );
    assert_eq!(r.state().coordinates(), Some(coords(33.8938, 35.5018)));
}

#[tokio::test]
async fn other_failures_leave_permission_alone() {
    for (err, expected) in [
        (
            GeolocationError::PositionUnavailable,
            AcquisitionError::PositionUnavailable,
        ),
        (GeolocationError::Timeout, AcquisitionError::Timeout),
        (
            GeolocationError::Other("kaboom".into()),
            AcquisitionError::Unknown,
        ),
    ] {
        let mut r = LocationReconciler::new();
        let outcome = r.locate(&FixedProvider(Err(err))).await;
        assert_eq!(outcome, AcquisitionOutcome::Failed(expected));
        assert_eq!(r.phase(), AcquisitionPhase::Failed(expected));
        assert_eq!(r.permission(), PermissionState::Prompt);
        assert!(r.can_request_location());
    }
}

#[tokio::test]
async fn unsupported_sensor_fails_before_requesting() {
    let mut r = LocationReconciler::new();
    let outcome = r.locate(&NoSensor).await;
    assert_eq!(
        outcome,
        AcquisitionOutcome::Failed(AcquisitionError::Unsupported)
    );
    assert_eq!(r.permission(), PermissionState::Unsupported);
    assert!(!r.can_request_location());
}

#[tokio::test]
async fn invalid_reading_is_reported_as_unavailable() {
    let mut r = LocationReconciler::new();
    let outcome = r
        .locate(&FixedProvider(Ok(reading(123.0, 35.5, 10.0))))
        .await;
    assert_eq!(
        outcome,
        AcquisitionOutcome::Failed(AcquisitionError::PositionUnavailable)
    );
    assert!(r.state().coordinates().is_none());
}

#[tokio::test(start_paused = true)]
async fn silent_sensor_times_out() {
    let mut r = LocationReconciler::new();
    let outcome = r.locate(&NeverAnswers).await;
    assert_eq!(outcome, AcquisitionOutcome::Failed(AcquisitionError::Timeout));
    assert!(!r.is_locating());
}

#[test]
fn locating_disables_trigger() {
    let mut r = LocationReconciler::new();
    assert!(r.can_request_location());
    let _ticket = r.begin_acquisition(&NeverAnswers).unwrap();
    assert!(r.is_locating());
    assert!(!r.can_request_location());
}

#[test]
fn stale_result_is_discarded() {
    let mut r = LocationReconciler::new();
    let first = r.begin_acquisition(&NeverAnswers).unwrap();
    let second = r.begin_acquisition(&NeverAnswers).unwrap();

    let outcome = r.complete_acquisition(second, Ok(reading(34.0, 35.0, 8.0)));
    assert!(matches!(outcome, AcquisitionOutcome::Resolved { .. }));

    let late = r.complete_acquisition(first, Ok(reading(10.0, 10.0, 8.0)));
    assert_eq!(late, AcquisitionOutcome::Stale);
    assert_eq!(r.state().coordinates(), Some(coords(34.0, 35.0)));
}

#[test]
fn stale_failure_does_not_touch_permission() {
    let mut r = LocationReconciler::new();
    let first = r.begin_acquisition(&NeverAnswers).unwrap();
    let _second = r.begin_acquisition(&NeverAnswers).unwrap();

    let late = r.complete_acquisition(first, Err(GeolocationError::PermissionDenied));
    assert_eq!(late, AcquisitionOutcome::Stale);
    assert_eq!(r.permission(), PermissionState::Prompt);
    assert!(r.is_locating());
}

#[test]
fn finished_attempt_cannot_complete_twice() {
    let mut r = LocationReconciler::new();
    let ticket = r.begin_acquisition(&NeverAnswers).unwrap();
    let outcome = r.complete_acquisition(ticket, Ok(reading(33.0, 35.0, 8.0)));
    assert!(matches!(outcome, AcquisitionOutcome::Resolved { .. }));

    r.paste_link("https://maps.google.com/maps?q=34.1,35.9&z=14")
        .unwrap();

    let again = r.complete_acquisition(ticket, Ok(reading(33.0, 35.0, 8.0)));
    assert_eq!(again, AcquisitionOutcome::Stale);
    assert_eq!(r.state().coordinates(), Some(coords(34.1, 35.9)));
    assert_eq!(r.state().source(), LocationSource::Manual);
}

#[test]
fn failed_attempt_cannot_complete_later() {
    let mut r = LocationReconciler::new();
    let ticket = r.begin_acquisition(&NeverAnswers).unwrap();
    r.complete_acquisition(ticket, Err(GeolocationError::Timeout));
    assert_eq!(r.phase(), AcquisitionPhase::Failed(AcquisitionError::Timeout));

    let late = r.complete_acquisition(ticket, Ok(reading(33.0, 35.0, 8.0)));
    assert_eq!(late, AcquisitionOutcome::Stale);
    assert!(r.state().coordinates().is_none());
    assert_eq!(r.phase(), AcquisitionPhase::Failed(AcquisitionError::Timeout));
}

#[test]
fn paste_during_locating_wins_over_late_reading() {
    let mut r = LocationReconciler::new();
    let ticket = r.begin_acquisition(&NeverAnswers).unwrap();

    r.paste_link(BEIRUT_LINK).unwrap();
    assert_eq!(r.phase(), AcquisitionPhase::Idle);
    assert!(!r.is_locating());

    let late = r.complete_acquisition(ticket, Ok(reading(33.0, 35.0, 8.0)));
    assert_eq!(late, AcquisitionOutcome::Stale);
    assert_eq!(r.state().coordinates(), Some(coords(33.8938, 35.5018)));
    assert_eq!(r.state().source(), LocationSource::Manual);
}

#[test]
fn map_edit_during_locating_wins_over_late_reading() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();
    let ticket = r.begin_acquisition(&NeverAnswers).unwrap();

    r.set_latitude(34.2).unwrap();

    let late = r.complete_acquisition(ticket, Ok(reading(10.0, 10.0, 8.0)));
    assert_eq!(late, AcquisitionOutcome::Stale);
    assert_eq!(r.state().coordinates(), Some(coords(34.2, 35.5018)));
    assert_eq!(r.state().accuracy_m(), Some(MANUAL_ACCURACY_M));
}

#[test]
fn echoing_share_url_keeps_attempt_running() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();
    let ticket = r.begin_acquisition(&NeverAnswers).unwrap();

    let own = r.state().share_url().to_string();
    assert_eq!(r.paste_link(&own), Ok(PasteOutcome::Unchanged));
    assert!(r.is_locating());

    let outcome = r.complete_acquisition(ticket, Ok(reading(34.0, 35.0, 8.0)));
    assert!(matches!(outcome, AcquisitionOutcome::Resolved { .. }));
}

#[test]
fn reset_invalidates_in_flight_attempt() {
    let mut r = LocationReconciler::new();
    r.paste_link(BEIRUT_LINK).unwrap();
    let ticket = r.begin_acquisition(&NeverAnswers).unwrap();

    r.reset();
    assert!(r.state().coordinates().is_none());
    assert_eq!(r.phase(), AcquisitionPhase::Idle);

    let late = r.complete_acquisition(ticket, Ok(reading(34.0, 35.0, 8.0)));
    assert_eq!(late, AcquisitionOutcome::Stale);
    assert!(r.state().coordinates().is_none());
}

#[test]
fn refresh_permission_reads_provider() {
    let mut r = LocationReconciler::new();
    r.refresh_permission(&NeverAnswers);
    assert_eq!(r.permission(), PermissionState::Granted);

    r.refresh_permission(&NoSensor);
    assert_eq!(r.permission(), PermissionState::Unsupported);
}
