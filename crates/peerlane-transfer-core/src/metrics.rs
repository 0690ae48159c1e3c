//! Derived transfer metrics tolerant of missing instrumentation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Progress;

/// Remaining-time sentinel for transfers whose completion cannot be estimated.
pub const UNKNOWN_TIME: u64 = u64::MAX;

const BYTES_PER_KIB: u64 = 1_024;

/// Signal from an engine that not enough samples exist to report bandwidth yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
#[error("insufficient data to measure bandwidth")]
pub struct InsufficientData;

/// Bandwidth reading as reported by an engine, in KiB/s.
pub type Bandwidth = Result<f32, InsufficientData>;

/// Percentage of `current` over `total`, clamped to `0..=100`.
///
/// Unknown or zero totals read as 0.
#[must_use]
pub fn percent_complete(current: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => {
            let percent = (u128::from(current) * 100 / u128::from(total)).min(100);
            u8::try_from(percent).unwrap_or(100)
        }
        _ => 0,
    }
}

/// Speed in KiB/s; insufficient, negative, or non-finite readings become 0.
#[must_use]
pub fn speed(bandwidth: Bandwidth) -> f32 {
    match bandwidth {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

/// Seconds until `progress` reaches `total` at `speed` KiB/s.
///
/// Returns [`UNKNOWN_TIME`] unless the speed is positive and finite, the total
/// is known, and progress does not exceed it. Whole-number speeds are divided
/// exactly in integer arithmetic so near-maximum sizes do not round up.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
pub fn remaining_time(total: Option<u64>, progress: u64, speed: f32) -> u64 {
    let Some(total) = total else {
        return UNKNOWN_TIME;
    };
    if !speed.is_finite() || speed <= 0.0 || progress > total {
        return UNKNOWN_TIME;
    }
    let remaining = total - progress;

    if speed.fract() == 0.0 {
        let divisor = (speed as u128).saturating_mul(u128::from(BYTES_PER_KIB));
        return u64::try_from(u128::from(remaining) / divisor).unwrap_or(UNKNOWN_TIME);
    }

    let seconds = (remaining as f64 / BYTES_PER_KIB as f64 / f64::from(speed)).floor();
    if !seconds.is_finite() || seconds >= u64::MAX as f64 {
        UNKNOWN_TIME
    } else {
        seconds as u64
    }
}

/// Point-in-time metrics for one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Completion percentage in `0..=100`.
    pub percent_complete: u8,
    /// Measured speed in KiB/s, 0 when unmeasurable.
    pub speed: f32,
    /// Remaining seconds or [`UNKNOWN_TIME`].
    pub remaining_time: u64,
}

impl MetricsSnapshot {
    /// Snapshot for an idle or absent transfer.
    pub const ZERO: Self = Self {
        percent_complete: 0,
        speed: 0.0,
        remaining_time: UNKNOWN_TIME,
    };

    /// Compute every metric from one progress sample and bandwidth reading.
    #[must_use]
    pub fn compute(progress: Progress, bandwidth: Bandwidth) -> Self {
        let speed = speed(bandwidth);
        Self {
            percent_complete: percent_complete(progress.current, progress.total),
            speed,
            remaining_time: remaining_time(progress.total, progress.current, speed),
        }
    }
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_clamped_and_zero_for_unknown_totals() {
        assert_eq!(percent_complete(0, Some(0)), 0);
        assert_eq!(percent_complete(10, None), 0);
        assert_eq!(percent_complete(50, Some(200)), 25);
        assert_eq!(percent_complete(300, Some(200)), 100);
        assert_eq!(percent_complete(u64::MAX, Some(u64::MAX)), 100);
        assert_eq!(percent_complete(u64::MAX, Some(1)), 100);
    }

    #[test]
    fn insufficient_bandwidth_reads_as_zero() {
        assert!(speed(Err(InsufficientData)).abs() < f32::EPSILON);
        assert!(speed(Ok(f32::NAN)).abs() < f32::EPSILON);
        assert!(speed(Ok(-3.0)).abs() < f32::EPSILON);
        assert!((speed(Ok(12.5)) - 12.5).abs() < f32::EPSILON);
    }

    #[test]
    fn remaining_time_is_unknown_without_speed_or_size() {
        assert_eq!(remaining_time(Some(1_024), 0, 0.0), UNKNOWN_TIME);
        assert_eq!(remaining_time(Some(1_024), 0, f32::INFINITY), UNKNOWN_TIME);
        assert_eq!(remaining_time(None, 0, 4.0), UNKNOWN_TIME);
        assert_eq!(remaining_time(Some(10), 11, 4.0), UNKNOWN_TIME);
    }

    #[test]
    fn remaining_time_matches_formula_at_boundaries() {
        assert_eq!(remaining_time(Some(10_240), 0, 1.0), 10);
        assert_eq!(remaining_time(Some(10_240), 10_240, 1.0), 0);
        assert_eq!(remaining_time(Some(10_240), 0, 4.0), 2);
        assert_eq!(remaining_time(Some(10_240), 0, 0.5), 20);
        assert_eq!(remaining_time(Some(u64::MAX), 0, 1.0), u64::MAX / 1_024);
        assert_eq!(remaining_time(Some(u64::MAX), u64::MAX, 1.0), 0);
        assert_eq!(remaining_time(Some(u64::MAX), 0, 1e-30), UNKNOWN_TIME);
    }

    #[test]
    fn snapshot_combines_metrics() {
        let snapshot = MetricsSnapshot::compute(
            Progress {
                current: 1_024,
                total: Some(4_096),
            },
            Ok(1.0),
        );
        assert_eq!(snapshot.percent_complete, 25);
        assert_eq!(snapshot.remaining_time, 3);

        let idle = MetricsSnapshot::compute(Progress::default(), Err(InsufficientData));
        assert_eq!(idle, MetricsSnapshot::ZERO);
    }
}
