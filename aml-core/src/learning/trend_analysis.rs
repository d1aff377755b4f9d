//! Trend Analysis: bounded time-series history per pattern,
//! anomaly detection, linear-trend direction, forecasting and seasonality,
//! and CUSUM change-point detection.

use crate::error::{Error, Result};
use crate::types::TimeSeriesPoint;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// A bounded ring buffer of observations for a single pattern/solution
/// metric.
pub struct TimeSeries {
    points: VecDeque<TimeSeriesPoint>,
    capacity: usize,
}

impl TimeSeries {
    /// Builds an empty series bounded at `capacity` points.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Appends an observation, evicting the oldest point if at capacity.
    pub fn push(&mut self, point: TimeSeriesPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// All retained points, oldest first.
    #[must_use]
    pub fn points(&self) -> &VecDeque<TimeSeriesPoint> {
        &self.points
    }

    /// Number of retained points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stddev(values: &[f64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Kind of anomaly flagged by [`detect_anomalies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    /// Sudden upward deviation from the rolling window.
    Spike,
    /// Sudden downward deviation from the rolling window.
    Drop,
    /// A single point far outside the window's distribution, with
    /// neighbors unaffected.
    Outlier,
    /// A sustained change in the window's mean level.
    Shift,
}

/// One flagged anomaly.
#[derive(Debug, Clone, Copy)]
pub struct Anomaly {
    /// Index into the series at which the anomaly was detected.
    pub index: usize,
    /// Timestamp of the anomalous point.
    pub timestamp: DateTime<Utc>,
    /// Observed value.
    pub value: f64,
    /// Rolling-window mean at the time of detection.
    pub window_mean: f64,
    /// Number of standard deviations from the window mean.
    pub z_score: f64,
    /// Classification of the anomaly.
    pub kind: AnomalyKind,
}

/// Flags points that deviate from a trailing rolling window by more than
/// `sensitivity` standard deviations. A `shift` is
/// reported when at least half of the following `window` points remain past
/// the threshold on the same side, otherwise the point is an `outlier`.
#[must_use]
pub fn detect_anomalies(series: &TimeSeries, window: usize, sensitivity: f64) -> Vec<Anomaly> {
    let points: Vec<&TimeSeriesPoint> = series.points.iter().collect();
    let mut anomalies = Vec::new();
    if points.len() <= window {
        return anomalies;
    }
    for i in window..points.len() {
        let trailing: Vec<f64> = points[i - window..i].iter().map(|p| p.value).collect();
        let window_mean = mean(&trailing);
        let window_std = stddev(&trailing, window_mean);
        if window_std <= f64::EPSILON {
            continue;
        }
        let value = points[i].value;
        let z = (value - window_mean) / window_std;
        if z.abs() < sensitivity {
            continue;
        }
        let lookahead_end = (i + window).min(points.len());
        let sustained = points[i..lookahead_end]
        .iter()
        .filter(|p| ((p.value - window_mean) / window_std).signum() == z.signum() && ((p.value - window_mean) / window_std).abs() >= sensitivity)
        .count();
        let kind = if sustained * 2 >= (lookahead_end - i).max(1) && lookahead_end - i > 1 {
            AnomalyKind::Shift
        } else if z > 0.0 {
            AnomalyKind::Spike
        } else {
            AnomalyKind::Drop
        };
        let kind = if kind == AnomalyKind::Spike && sustained <= 1 {
            AnomalyKind::Outlier
        } else {
            kind
        };
        anomalies.push(Anomaly {
                index: i,
                timestamp: points[i].timestamp,
                value,
                window_mean,
                z_score: z,
                kind,
        });
    }
    anomalies
}

/// Direction of a fitted linear trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    /// Slope is reliably positive.
    Increasing,
    /// Slope is reliably negative.
    Decreasing,
    /// Slope is near zero relative to the data's variance.
    Stable,
    /// Variance is too high relative to slope magnitude to call a
    /// direction (overrides increasing/decreasing).
    Volatile,
}

/// Result of an ordinary-least-squares fit over a series' values against
/// their index.
#[derive(Debug, Clone, Copy)]
pub struct TrendResult {
    /// OLS slope (change in value per point).
    pub slope: f64,
    /// OLS intercept.
    pub intercept: f64,
    /// Coefficient of determination, in `[0, 1]`.
    pub r_squared: f64,
    /// Classified direction.
    pub direction: TrendDirection,
}

/// Fits an OLS line to `series` and classifies its direction. A fit is
/// `Volatile` when the residual standard deviation exceeds
/// `volatility_ratio` times the slope's magnitude over the series span,
/// regardless of sign.
pub fn analyze_trend(series: &TimeSeries, volatility_ratio: f64, stable_slope_epsilon: f64) -> Result<TrendResult> {
    let n = series.len();
    if n < 2 {
        return Err(Error::InsufficientEvidence(format!(
                    "need at least 2 points for trend analysis, have {n}"
        )));
    }
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let ys: Vec<f64> = series.points.iter().map(|p| p.value).collect();
    let x_mean = mean(&xs);
    let y_mean = mean(&ys);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    for i in 0..n {
        cov += (xs[i] - x_mean) * (ys[i] - y_mean);
        var_x += (xs[i] - x_mean).powi(2);
    }
    let slope = if var_x.abs() < f64::EPSILON { 0.0 } else { cov / var_x };
    let intercept = y_mean - slope * x_mean;

    let predicted: Vec<f64> = xs.iter().map(|x| intercept + slope * x).collect();
    let ss_res: f64 = ys.iter().zip(&predicted).map(|(y, p)| (y - p).powi(2)).sum();
    let ss_tot: f64 = ys.iter().map(|y| (y - y_mean).powi(2)).sum();
    let r_squared = if ss_tot.abs() < f64::EPSILON { 1.0 } else { (1.0 - ss_res / ss_tot).clamp(0.0, 1.0) };

    let residual_std = stddev(&ys.iter().zip(&predicted).map(|(y, p)| y - p).collect::<Vec<_>>(), 0.0);
    let span = (n as f64 - 1.0).max(1.0);
    let slope_over_span = slope * span;

    let direction = if residual_std > volatility_ratio * slope_over_span.abs().max(f64::EPSILON) {
        TrendDirection::Volatile
    } else if slope.abs() < stable_slope_epsilon {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    Ok(TrendResult {
            slope,
            intercept,
            r_squared,
            direction,
    })
}

/// Forecasting method selectable in [`forecast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastMethod {
    /// Extend the OLS fit linearly.
    Linear,
    /// Exponential smoothing: each future point blends the last smoothed
    /// level forward, weighted by `alpha`.
    Exponential,
    /// Average of the trailing window, held constant across the horizon.
    MovingAverage,
    /// Hold the last observed value constant.
    Naive,
}

/// Auto-selects a forecast method: exponential when the series'
/// inter-step ratios are low-variance (a roughly multiplicative series),
/// moving-average when volatility exceeds `volatility_threshold`
/// (default 0.3), otherwise linear.
#[must_use]
pub fn select_forecast_method(series: &TimeSeries, volatility_threshold: f64) -> ForecastMethod {
    let ys: Vec<f64> = series.points.iter().map(|p| p.value).collect();
    if ys.len() < 3 {
        return ForecastMethod::Naive;
    }
    let series_mean = mean(&ys);
    let series_std = stddev(&ys, 0.0);
    let volatility = if series_mean.abs() < f64::EPSILON { 0.0 } else { (series_std / series_mean).abs() };
    if volatility > volatility_threshold {
        return ForecastMethod::MovingAverage;
    }

    let ratios: Vec<f64> = ys
    .windows(2)
    .filter_map(|w| (w[0].abs() > f64::EPSILON).then(|| w[1] / w[0]))
    .collect();
    if ratios.len() >= 2 {
        let ratio_std = stddev(&ratios, 0.0);
        if ratio_std < 0.1 {
            return ForecastMethod::Exponential;
        }
    }
    ForecastMethod::Linear
}

/// A single forecast point with a 95% confidence interval.
#[derive(Debug, Clone, Copy)]
pub struct ForecastPoint {
    /// Steps ahead of the last observed point.
    pub steps_ahead: u32,
    /// Point forecast.
    pub value: f64,
    /// Lower 95% bound.
    pub lower: f64,
    /// Upper 95% bound.
    pub upper: f64,
}

const FORECAST_Z: f64 = 1.96;

/// Forecasts `horizon` future points using `method`. The caller is expected
/// to cache the result for up to an hour and invalidate it on new data;
/// this function itself is a pure computation with no cache.
pub fn forecast(series: &TimeSeries, horizon: u32, method: ForecastMethod) -> Result<Vec<ForecastPoint>> {
    let n = series.len();
    if n < 2 {
        return Err(Error::InsufficientEvidence(format!(
                    "need at least 2 points to forecast, have {n}"
        )));
    }
    let ys: Vec<f64> = series.points.iter().map(|p| p.value).collect();
    let trend = analyze_trend(series, f64::INFINITY, 0.0)?;
    let residual_std = {
        let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let predicted: Vec<f64> = xs.iter().map(|x| trend.intercept + trend.slope * x).collect();
        stddev(&ys.iter().zip(&predicted).map(|(y, p)| y - p).collect::<Vec<_>>(), 0.0)
    };
    let last_value = ys[n - 1];
    const SMOOTHING_ALPHA: f64 = 0.3;
    const MOVING_AVERAGE_WINDOW: usize = 5;

    let smoothed_level = {
        let mut level = ys[0];
        for &y in &ys[1..] {
            level = SMOOTHING_ALPHA * y + (1.0 - SMOOTHING_ALPHA) * level;
        }
        level
    };
    let moving_average = {
        let window = MOVING_AVERAGE_WINDOW.min(n);
        mean(&ys[n - window..])
    };

    let mut out = Vec::with_capacity(horizon as usize);
    for step in 1..=horizon {
        let x = (n - 1 + step as usize) as f64;
        let point = match method {
            ForecastMethod::Linear => trend.intercept + trend.slope * x,
            ForecastMethod::Exponential => smoothed_level,
            ForecastMethod::MovingAverage => moving_average,
            ForecastMethod::Naive => last_value,
        };
        let margin = FORECAST_Z * residual_std * (1.0 + step as f64 * 0.1).sqrt();
        out.push(ForecastPoint {
                steps_ahead: step,
                value: point,
                lower: point - margin,
                upper: point + margin,
        });
    }
    Ok(out)
}

/// Outcome of [`detect_seasonality`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonalityResult {
    /// Whether a seasonal pattern cleared `min_correlation`.
    pub detected: bool,
    /// The lag, in points, of the detected period (0 if undetected).
    pub period: usize,
    /// Half the peak-to-trough range of the per-phase means: how big the
    /// seasonal swing is, in the series' own units.
    pub amplitude: f64,
    /// Index within one period at which the per-phase mean peaks.
    pub phase: usize,
    /// Autocorrelation at `period` (0 if undetected).
    pub confidence: f64,
}

const UNDETECTED_SEASONALITY: SeasonalityResult =
SeasonalityResult { detected: false, period: 0, amplitude: 0.0, phase: 0, confidence: 0.0 };

/// Detects seasonality via the lag with the strongest autocorrelation over
/// `max_lag` candidates, reporting it only if the autocorrelation clears
/// `min_correlation`, along with the swing's amplitude and phase.
#[must_use]
pub fn detect_seasonality(series: &TimeSeries, max_lag: usize, min_correlation: f64) -> SeasonalityResult {
    let ys: Vec<f64> = series.points.iter().map(|p| p.value).collect();
    let n = ys.len();
    if n < 4 {
        return UNDETECTED_SEASONALITY;
    }
    let y_mean = mean(&ys);
    let variance: f64 = ys.iter().map(|y| (y - y_mean).powi(2)).sum();
    if variance.abs() < f64::EPSILON {
        return UNDETECTED_SEASONALITY;
    }

    let mut best: Option<(usize, f64)> = None;
    for lag in 1..=max_lag.min(n - 1) {
        let covariance: f64 = (0..n - lag).map(|i| (ys[i] - y_mean) * (ys[i + lag] - y_mean)).sum();
        let autocorr = covariance / variance;
        if autocorr >= min_correlation && best.map_or(true, |(_, best_corr)| autocorr > best_corr) {
            best = Some((lag, autocorr));
        }
    }
    let Some((period, confidence)) = best else {
        return UNDETECTED_SEASONALITY;
    };

    let mut phase_sums = vec![0.0; period];
    let mut phase_counts = vec![0usize; period];
    for (i, &y) in ys.iter().enumerate() {
        phase_sums[i % period] += y;
        phase_counts[i % period] += 1;
    }
    let phase_means: Vec<f64> = phase_sums
    .iter()
    .zip(&phase_counts)
    .map(|(sum, count)| if *count == 0 { 0.0 } else { sum / *count as f64 })
    .collect();
    let max_mean = phase_means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_mean = phase_means.iter().copied().fold(f64::INFINITY, f64::min);
    let phase = phase_means
    .iter()
    .enumerate()
    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
    .map_or(0, |(idx, _)| idx);

    SeasonalityResult {
        detected: true,
        period,
        amplitude: (max_mean - min_mean) / 2.0,
        phase,
        confidence,
    }
}

/// Classification of a [`ChangePoint`]'s direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePointClass {
    /// The mean moved in the favorable direction for the metric.
    Improvement,
    /// The mean moved in the unfavorable direction for the metric.
    Degradation,
    /// The metric has no polarity (no `higher_is_better` was supplied), so
    /// the change is reported as a neutral shift.
    Shift,
}

/// One detected change point.
#[derive(Debug, Clone, Copy)]
pub struct ChangePoint {
    /// Index in the series where the shift was detected.
    pub index: usize,
    /// Timestamp of the detected point.
    pub timestamp: DateTime<Utc>,
    /// Mean level before the change point.
    pub mean_before: f64,
    /// Mean level after the change point.
    pub mean_after: f64,
    /// Whether the shift is an improvement, a degradation, or (absent
    /// polarity information) a neutral shift.
    pub classification: ChangePointClass,
}

/// CUSUM change-point detection: accumulates signed deviations from the
/// running mean and flags a change point whenever the cumulative sum
/// exceeds `threshold` standard deviations, resetting afterward. A
/// candidate is only reported if the before/after means differ by more than
/// `min_effect_size` pooled standard deviations, to suppress noise-level
/// shifts. `higher_is_better` classifies the direction of each change point;
/// pass `None` for metrics with no inherent polarity.
#[must_use]
pub fn detect_change_points(
    series: &TimeSeries,
    threshold: f64,
    min_effect_size: f64,
    higher_is_better: Option<bool>,
) -> Vec<ChangePoint> {
    let points: Vec<&TimeSeriesPoint> = series.points.iter().collect();
    let n = points.len();
    if n < 4 {
        return Vec::new();
    }
    let ys: Vec<f64> = points.iter().map(|p| p.value).collect();
    let overall_mean = mean(&ys);
    let overall_std = stddev(&ys, overall_mean).max(f64::EPSILON);

    let mut cusum_pos = 0.0;
    let mut cusum_neg = 0.0;
    let mut change_points = Vec::new();
    let mut segment_start = 0usize;

    for i in 0..n {
        let deviation = (ys[i] - overall_mean) / overall_std;
        cusum_pos = (cusum_pos + deviation).max(0.0);
        cusum_neg = (cusum_neg + deviation).min(0.0);

        if cusum_pos > threshold || cusum_neg < -threshold {
            let before = &ys[segment_start..i.max(segment_start + 1)];
            let after = &ys[i.min(n - 1)..n];
            let mean_before = mean(before);
            let mean_after = mean(after);
            let pooled_std = {
                let b = stddev(before, mean_before);
                let a = stddev(after, mean_after);
                ((b * b + a * a) / 2.0).sqrt().max(f64::EPSILON)
            };
            if (mean_after - mean_before).abs() / pooled_std >= min_effect_size {
                let classification = match higher_is_better {
                    Some(true) => {
                        if mean_after > mean_before {
                            ChangePointClass::Improvement
                        } else {
                            ChangePointClass::Degradation
                        }
                    }
                    Some(false) => {
                        if mean_after < mean_before {
                            ChangePointClass::Improvement
                        } else {
                            ChangePointClass::Degradation
                        }
                    }
                    None => ChangePointClass::Shift,
                };
                change_points.push(ChangePoint {
                        index: i,
                        timestamp: points[i].timestamp,
                        mean_before,
                        mean_after,
                        classification,
                });
                segment_start = i;
            }
            cusum_pos = 0.0;
            cusum_neg = 0.0;
        }
    }
    change_points
}

/// Recommends a new `learning_rate` from the trend in a metric's recent
/// values: accelerate learning while volatile or trending adversely, slow
/// down once a metric has stabilized favorably.
#[must_use]
pub fn recommend_learning_rate(current_rate: f64, trend: &TrendResult, min_rate: f64, max_rate: f64) -> f64 {
    let adjusted = match trend.direction {
        TrendDirection::Volatile => current_rate * 1.2,
        TrendDirection::Decreasing => current_rate * 1.1,
        TrendDirection::Stable => current_rate * 0.95,
        TrendDirection::Increasing => current_rate * 0.9,
    };
    adjusted.clamp(min_rate, max_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series_from(values: &[f64]) -> TimeSeries {
        let mut series = TimeSeries::new(values.len().max(1));
        let base = Utc::now();
        let pattern_id = uuid::Uuid::new_v4();
        for (i, v) in values.iter().enumerate() {
            series.push(TimeSeriesPoint {
                    pattern_id,
                    timestamp: base + Duration::hours(i as i64),
                    value: *v,
            });
        }
        series
    }

    #[test]
    fn detect_anomalies_flags_a_spike() {
        let mut values = vec![1.0; 20];
        values[15] = 50.0;
        let series = series_from(&values);
        let anomalies = detect_anomalies(&series, 5, 3.0);
        assert!(anomalies.iter().any(|a| a.index == 15));
    }

    #[test]
    fn analyze_trend_detects_increasing_slope() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let series = series_from(&values);
        let trend = analyze_trend(&series, 5.0, 0.01).expect("trend");
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!(trend.slope > 0.0);
        assert!(trend.r_squared > 0.9);
    }

    #[test]
    fn analyze_trend_detects_volatility() {
        let values = vec![1.0, 100.0, 2.0, 90.0, 3.0, 95.0, 1.0, 99.0];
        let series = series_from(&values);
        let trend = analyze_trend(&series, 0.5, 0.01).expect("trend");
        assert_eq!(trend.direction, TrendDirection::Volatile);
    }

    #[test]
    fn forecast_linear_extends_the_fitted_line() {
        let values: Vec<f64> = (0..10).map(|i| i as f64 * 2.0).collect();
        let series = series_from(&values);
        let forecasted = forecast(&series, 3, ForecastMethod::Linear).expect("forecast");
        assert_eq!(forecasted.len(), 3);
        assert!(forecasted[0].value > values[values.len() - 1]);
        assert!(forecasted[0].lower <= forecasted[0].value);
        assert!(forecasted[0].upper >= forecasted[0].value);
    }

    #[test]
    fn forecast_moving_average_holds_trailing_mean() {
        let values = vec![2.0, 4.0, 6.0, 8.0, 10.0, 1.0, 100.0, 1.0, 100.0, 1.0];
        let series = series_from(&values);
        let forecasted = forecast(&series, 2, ForecastMethod::MovingAverage).expect("forecast");
        assert_eq!(forecasted[0].value, forecasted[1].value);
    }

    #[test]
    fn select_forecast_method_picks_moving_average_for_volatile_series() {
        let values = vec![1.0, 100.0, 2.0, 90.0, 3.0, 95.0, 1.0, 99.0];
        let series = series_from(&values);
        assert_eq!(select_forecast_method(&series, 0.3), ForecastMethod::MovingAverage);
    }

    #[test]
    fn select_forecast_method_picks_linear_for_a_steady_trend() {
        let values: Vec<f64> = (0..20).map(|i| 10.0 + i as f64 * 0.5).collect();
        let series = series_from(&values);
        assert_eq!(select_forecast_method(&series, 0.3), ForecastMethod::Linear);
    }

    #[test]
    fn detect_seasonality_finds_period() {
        let values: Vec<f64> = (0..24).map(|i| (i % 4) as f64).collect();
        let series = series_from(&values);
        let seasonality = detect_seasonality(&series, 8, 0.5);
        assert!(seasonality.detected);
        assert_eq!(seasonality.period, 4);
        assert!(seasonality.amplitude > 0.0);
    }

    #[test]
    fn detect_seasonality_reports_undetected_for_flat_series() {
        let series = series_from(&[1.0; 10]);
        let seasonality = detect_seasonality(&series, 4, 0.5);
        assert!(!seasonality.detected);
    }

    #[test]
    fn detect_change_points_finds_level_shift() {
        let mut values = vec![1.0; 10];
        values.extend(vec![10.0; 10]);
        let series = series_from(&values);
        let changes = detect_change_points(&series, 3.0, 1.0, Some(true));
        assert!(!changes.is_empty());
        assert_eq!(changes[0].classification, ChangePointClass::Improvement);
    }

    #[test]
    fn detect_change_points_reports_shift_without_polarity() {
        let mut values = vec![1.0; 10];
        values.extend(vec![10.0; 10]);
        let series = series_from(&values);
        let changes = detect_change_points(&series, 3.0, 1.0, None);
        assert!(!changes.is_empty());
        assert_eq!(changes[0].classification, ChangePointClass::Shift);
    }

    #[test]
    fn recommend_learning_rate_respects_clamp() {
        let trend = TrendResult {
            slope: 0.0,
            intercept: 0.0,
            r_squared: 1.0,
            direction: TrendDirection::Volatile,
        };
        let rate = recommend_learning_rate(0.5, &trend, 0.01, 0.5);
        assert!((rate - 0.5).abs() < 1e-9);
    }
}
