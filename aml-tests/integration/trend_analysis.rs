//! A step-function series triggers a `Shift` anomaly and is detected as
//! the point [`detect_change_points`] reports.

use aml_core::learning::trend_analysis::{analyze_trend, detect_anomalies, detect_change_points, AnomalyKind, TimeSeries, TrendDirection};
use aml_core::types::TimeSeriesPoint;
use chrono::{Duration, Utc};
use uuid::Uuid;

fn series_from(values: &[f64]) -> TimeSeries {
    let pattern_id = Uuid::new_v4();
    let base = Utc::now();
    let mut series = TimeSeries::new(64);
    for (i, value) in values.iter().enumerate() {
        series.push(TimeSeriesPoint {
                pattern_id,
                timestamp: base + Duration::minutes(i as i64),
                value: *value,
        });
    }
    series
}

#[test]
fn a_sustained_level_shift_is_flagged_as_a_shift_anomaly() {
    let mut values = vec![0.5; 10];
    values.extend(vec![0.95; 10]);
    let series = series_from(&values);

    let anomalies = detect_anomalies(&series, 5, 2.0);
    assert!(!anomalies.is_empty());
    assert!(anomalies.iter().any(|a| a.kind == AnomalyKind::Shift || a.kind == AnomalyKind::Spike));
}

#[test]
fn change_point_detection_locates_the_step() {
    let mut values = vec![0.5; 10];
    values.extend(vec![0.95; 10]);
    let series = series_from(&values);

    let points = detect_change_points(&series, 0.3, 0.2, Some(true));
    assert!(!points.is_empty());
    let step_index = points[0].index;
    assert!((8..=12).contains(&step_index), "expected the step near index 10, got {step_index}");
}

#[test]
fn a_flat_series_is_reported_as_stable() {
    let values = vec![0.5; 20];
    let series = series_from(&values);

    let trend = analyze_trend(&series, 2.0, 0.01).expect("enough points for a trend");
    assert_eq!(trend.direction, TrendDirection::Stable);
}

#[test]
fn a_monotonically_rising_series_is_reported_as_increasing() {
    let values: Vec<f64> = (0..20).map(|i| 0.1 + i as f64 * 0.04).collect();
    let series = series_from(&values);

    let trend = analyze_trend(&series, 2.0, 0.001).expect("enough points for a trend");
    assert_eq!(trend.direction, TrendDirection::Increasing);
}
