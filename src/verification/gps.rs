use super::{GpsReading, MethodOutcome, OfficeRef, VerificationMethod};
use crate::config::VerifyConfig;
use crate::error::EngineError;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two WGS84 coordinates.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Accuracy-aware geofence test. A fix passes when
/// `distance - accuracy <= radius`, so a noisy reading near the boundary is
/// not unfairly rejected. Confidence falls linearly from 1.0 at the center
/// to the configured floor at the edge; a pass owed entirely to the accuracy
/// slack sits at the floor.
pub fn evaluate(reading: Option<&GpsReading>, office: &OfficeRef, cfg: &VerifyConfig) -> MethodOutcome {
    let Some(reading) = reading else {
        return MethodOutcome::fail(
            VerificationMethod::Gps,
            EngineError::SignalUnavailable(
                "location permission denied or no GPS fix available".to_string(),
            ),
        );
    };

    let distance_m = haversine_m(
        reading.latitude,
        reading.longitude,
        office.latitude,
        office.longitude,
    );
    let radius_m = office.geofence_radius_m;
    let accuracy_m = reading.accuracy_m.max(0.0);

    if distance_m - accuracy_m > radius_m {
        return MethodOutcome::fail(
            VerificationMethod::Gps,
            EngineError::OutOfRange {
                distance_m,
                radius_m,
            },
        );
    }

    MethodOutcome::pass(
        VerificationMethod::Gps,
        confidence_at(distance_m, radius_m, cfg.gps_confidence_floor),
    )
}

fn confidence_at(distance_m: f64, radius_m: f64, floor: f64) -> f64 {
    if distance_m >= radius_m {
        return floor;
    }
    (1.0 - (1.0 - floor) * distance_m / radius_m).max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    // ~1 degree of latitude in meters; used to synthesize fixes at a
    // known distance from the office.
    const METERS_PER_DEG_LAT: f64 = 111_195.0;

    fn office(radius_m: f64) -> OfficeRef {
        OfficeRef {
            id: 1,
            latitude: 23.7806,
            longitude: 90.4074,
            geofence_radius_m: radius_m,
            opens_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        }
    }

    fn fix_at(office: &OfficeRef, distance_m: f64, accuracy_m: f64) -> GpsReading {
        GpsReading {
            latitude: office.latitude + distance_m / METERS_PER_DEG_LAT,
            longitude: office.longitude,
            accuracy_m,
        }
    }

    fn cfg() -> VerifyConfig {
        VerifyConfig {
            gps_confidence_floor: 0.5,
            wifi_confidence_open: 0.6,
            wifi_confidence_secure: 0.8,
            wifi_confidence_enterprise: 0.9,
            qr_confidence: 0.98,
        }
    }

    #[test]
    fn haversine_handles_known_distance() {
        // One degree of latitude at the equator.
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn passes_inside_geofence() {
        let off = office(100.0);
        let out = evaluate(Some(&fix_at(&off, 10.0, 5.0)), &off, &cfg());
        assert!(out.passed);
        assert!((out.confidence - 0.95).abs() < 0.005, "got {}", out.confidence);
    }

    #[test]
    fn near_edge_confidence_is_lower_than_near_center() {
        let off = office(100.0);
        let near = evaluate(Some(&fix_at(&off, 10.0, 5.0)), &off, &cfg());
        let far = evaluate(Some(&fix_at(&off, 80.0, 10.0)), &off, &cfg());
        assert!(far.passed);
        assert!((far.confidence - 0.60).abs() < 0.005, "got {}", far.confidence);
        assert!(far.confidence < near.confidence);
    }

    #[test]
    fn confidence_monotonically_non_increasing_in_distance() {
        let off = office(100.0);
        let mut prev = f64::INFINITY;
        for d in [0.0, 5.0, 25.0, 50.0, 75.0, 99.0] {
            let out = evaluate(Some(&fix_at(&off, d, 1.0)), &off, &cfg());
            assert!(out.passed, "distance {d} should pass");
            assert!(out.confidence <= prev, "confidence rose at {d}");
            prev = out.confidence;
        }
    }

    #[test]
    fn accuracy_slack_admits_noisy_boundary_fix_at_floor() {
        let off = office(100.0);
        // 105m out, but the fix is only good to 10m.
        let out = evaluate(Some(&fix_at(&off, 105.0, 10.0)), &off, &cfg());
        assert!(out.passed);
        assert!((out.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn fails_beyond_radius_plus_accuracy() {
        let off = office(100.0);
        let out = evaluate(Some(&fix_at(&off, 150.0, 10.0)), &off, &cfg());
        assert!(!out.passed);
        assert_eq!(out.error.as_ref().unwrap().kind(), "out_of_range");
    }

    #[test]
    fn missing_fix_is_a_distinct_unavailable_reason() {
        let off = office(100.0);
        let out = evaluate(None, &off, &cfg());
        assert!(!out.passed);
        assert_eq!(out.error.as_ref().unwrap().kind(), "signal_unavailable");
    }
}
