//! Trend Analysis throughput: anomaly detection, trend direction,
//! forecasting and change-point detection over a bounded time series.

use aml_core::learning::trend_analysis::{
    detect_anomalies, detect_change_points, forecast, ForecastMethod, TimeSeries,
};
use aml_core::types::TimeSeriesPoint;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

fn seeded_series(len: usize) -> TimeSeries {
    let mut series = TimeSeries::new(len.max(1));
    let pattern_id = Uuid::new_v4();
    let mut now = chrono::Utc::now();
    for i in 0..len {
        now += chrono::Duration::minutes(5);
        let base = 0.75 + 0.05 * ((i as f64) / 10.0).sin();
        let value = if i == len.saturating_sub(1) && len > 20 { 0.1 } else { base };
        series.push(TimeSeriesPoint { pattern_id, timestamp: now, value });
    }
    series
}

fn bench_detect_anomalies(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_anomalies");
    for &len in &[50usize, 500, 5000] {
        let series = seeded_series(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &series, |b, series| {
                b.iter(|| black_box(detect_anomalies(series, 20, 1.0)));
        });
    }
    group.finish();
}

fn bench_forecast(c: &mut Criterion) {
    let series = seeded_series(500);
    c.bench_function("forecast_linear_horizon_12", |b| {
            b.iter(|| black_box(forecast(&series, 12, ForecastMethod::Linear)));
    });
}

fn bench_change_points(c: &mut Criterion) {
    let series = seeded_series(500);
    c.bench_function("detect_change_points", |b| {
            b.iter(|| black_box(detect_change_points(&series, 4.0, 0.5, Some(true))));
    });
}

criterion_group!(benches, bench_detect_anomalies, bench_forecast, bench_change_points);
criterion_main!(benches);
