// src/analytics/time.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::attempt::AttemptRecord;

/// Elapsed seconds for an attempt.
///
/// Timestamps are often partial, so the first usable signal wins:
/// 1. `end_time - start_time`
/// 2. an explicit positive `time_spent`
/// 3. `updated_at - created_at`
/// 4. zero
pub fn resolve_elapsed_seconds(attempt: &AttemptRecord) -> i64 {
    if let (Some(start), Some(end)) = (attempt.start_time, attempt.end_time) {
        return seconds_between(start, end);
    }

    if let Some(spent) = attempt.time_spent.filter(|s| *s > 0) {
        return spent;
    }

    if let (Some(created), Some(updated)) = (attempt.created_at, attempt.updated_at) {
        return seconds_between(created, updated);
    }

    0
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    // Floor of the millisecond difference, clamped at zero.
    (to - from).num_milliseconds().div_euclid(1000).max(0)
}

/// Timing summary over completed attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAnalytics {
    pub average_seconds: i64,
    pub median_seconds: f64,
    pub fastest_seconds: i64,
    pub slowest_seconds: i64,
    /// Population standard deviation, in minutes.
    pub std_dev_minutes: f64,
}

pub fn time_analytics(elapsed: &[i64]) -> TimeAnalytics {
    if elapsed.is_empty() {
        return TimeAnalytics::default();
    }

    let mut sorted = elapsed.to_vec();
    sorted.sort_unstable();

    let as_f64: Vec<f64> = sorted.iter().map(|s| *s as f64).collect();
    let minutes: Vec<f64> = as_f64.iter().map(|s| s / 60.0).collect();

    TimeAnalytics {
        average_seconds: super::stats::mean(&as_f64).round() as i64,
        median_seconds: super::stats::median(&as_f64),
        fastest_seconds: sorted[0],
        slowest_seconds: sorted[sorted.len() - 1],
        std_dev_minutes: super::stats::std_dev(&minutes),
    }
}
