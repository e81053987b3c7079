// src/analytics/ranking.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    stats,
    subject_marks::{SubjectMarksMap, extract_subject_marks},
    time::resolve_elapsed_seconds,
};
use crate::models::{assessment::Assessment, attempt::AttemptRecord};

/// One row of an assessment leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub participant_id: String,
    pub participant_name: Option<String>,
    pub attempt_id: String,
    pub score: f64,
    pub percentage: f64,
    /// 1-based, strictly sequential.
    pub rank: usize,
    pub percentile: f64,
    pub accuracy: f64,
    pub elapsed_seconds: i64,
    pub subject_marks: SubjectMarksMap,
}

/// Ranks participants by their most recent completed attempt.
///
/// Equal scores keep their relative input order. Percentiles are taken
/// against every completed attempt, not just the deduplicated rows.
pub fn rank_participants(
    completed: &[&AttemptRecord],
    assessment: Option<&Assessment>,
    names: &HashMap<String, String>,
) -> Vec<RankingRow> {
    let mut latest = latest_attempt_per_participant(completed);
    latest.sort_by(|a, b| b.score.obtained.total_cmp(&a.score.obtained));

    let total_attempts = completed.len();
    latest
        .into_iter()
        .enumerate()
        .map(|(position, attempt)| {
            let rank = position + 1;
            RankingRow {
                participant_id: attempt.participant_id.clone(),
                participant_name: names.get(&attempt.participant_id).cloned(),
                attempt_id: attempt.id.clone(),
                score: attempt.score.obtained,
                percentage: attempt.score.percentage,
                rank,
                percentile: percentile(rank, total_attempts),
                accuracy: participant_accuracy(attempt),
                elapsed_seconds: resolve_elapsed_seconds(attempt),
                subject_marks: extract_subject_marks(attempt, assessment),
            }
        })
        .collect()
}

/// Keeps one attempt per participant: the one with the latest `created_at`
/// (the later input wins a tie). The result preserves input order.
pub fn latest_attempt_per_participant<'a>(completed: &[&'a AttemptRecord]) -> Vec<&'a AttemptRecord> {
    let mut best: HashMap<&str, usize> = HashMap::new();
    for (index, attempt) in completed.iter().enumerate() {
        best.entry(attempt.participant_id.as_str())
            .and_modify(|current| {
                if attempt.created_at >= completed[*current].created_at {
                    *current = index;
                }
            })
            .or_insert(index);
    }

    let mut kept: Vec<usize> = best.into_values().collect();
    kept.sort_unstable();
    kept.into_iter().map(|index| completed[index]).collect()
}

/// Position of one attempt among all completed attempts (stable, score
/// descending) together with the number of attempts ranked.
pub fn attempt_rank(completed: &[&AttemptRecord], attempt_id: &str) -> Option<(usize, usize)> {
    let mut ranked: Vec<&AttemptRecord> = completed.to_vec();
    ranked.sort_by(|a, b| b.score.obtained.total_cmp(&a.score.obtained));
    ranked
        .iter()
        .position(|a| a.id == attempt_id)
        .map(|position| (position + 1, ranked.len()))
}

/// `round((N - rank) / N * 100)`, 0 for an empty field.
pub fn percentile(rank: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (total.saturating_sub(rank) as f64 / total as f64 * 100.0).round()
}

/// Correct over attempted answers, capped at 100 to absorb malformed records.
pub fn participant_accuracy(attempt: &AttemptRecord) -> f64 {
    let attempted = attempt.answers.iter().filter(|a| a.is_attempted()).count();
    let correct = attempt.answers.iter().filter(|a| a.is_correct_attempt()).count();
    stats::percent(correct as f64, attempted as f64).min(100.0)
}
