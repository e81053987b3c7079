// src/analytics/basic.rs

use serde::{Deserialize, Serialize};

use super::{stats, time::resolve_elapsed_seconds};
use crate::models::attempt::AttemptRecord;

/// Headline numbers for an assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicStats {
    pub total_attempts: usize,
    pub completed_attempts: usize,
    pub in_progress_attempts: usize,
    pub completion_rate: f64,
    pub average_score: f64,
    pub average_percentage: f64,
    pub median_score: f64,
    pub top_score: f64,
    pub lowest_score: f64,
    /// Mean resolved elapsed time, rounded to whole seconds.
    pub average_time_seconds: i64,
}

/// Computes the basic statistics over every attempt of an assessment.
/// Only completed attempts contribute to score and time aggregates.
pub fn basic_stats(attempts: &[AttemptRecord]) -> BasicStats {
    let completed: Vec<&AttemptRecord> = attempts.iter().filter(|a| a.is_completed()).collect();

    let total_attempts = attempts.len();
    let completed_attempts = completed.len();

    let scores: Vec<f64> = completed.iter().map(|a| a.score.obtained).collect();
    let percentages: Vec<f64> = completed.iter().map(|a| a.score.percentage).collect();
    let elapsed: Vec<f64> = completed
        .iter()
        .map(|a| resolve_elapsed_seconds(a) as f64)
        .collect();

    let top_score = scores.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let lowest_score = scores.iter().copied().reduce(f64::min).unwrap_or(0.0);

    BasicStats {
        total_attempts,
        completed_attempts,
        in_progress_attempts: total_attempts - completed_attempts,
        completion_rate: stats::percent(completed_attempts as f64, total_attempts as f64),
        average_score: stats::mean(&scores),
        average_percentage: stats::mean(&percentages),
        median_score: stats::median(&scores),
        top_score,
        lowest_score,
        average_time_seconds: stats::mean(&elapsed).round() as i64,
    }
}
