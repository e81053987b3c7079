// src/analytics/items.rs

use serde::{Deserialize, Serialize};

use super::{distribution::GroupBy, stats};
use crate::models::{assessment::Assessment, attempt::AttemptRecord};

/// Per-question statistics over completed attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalytics {
    pub question_index: usize,
    pub subject: String,
    pub chapter: String,
    pub difficulty: String,
    pub total_attempts: usize,
    pub correct_answers: usize,
    pub accuracy: f64,
    pub average_time: f64,
    /// (top-third correct - bottom-third correct) / third size.
    pub discrimination_index: f64,
    /// Negative discrimination: weaker participants outperform stronger ones.
    pub flagged: bool,
}

/// Computes item statistics for every question of the assessment.
///
/// Answers are aligned by position (`answers[i]` belongs to `questions[i]`).
/// For the discrimination index, attempts are stably sorted by obtained score
/// (descending) and the top and bottom thirds compared; with fewer than three
/// attempts the index is 0.
pub fn question_analytics(assessment: &Assessment, completed: &[&AttemptRecord]) -> Vec<QuestionAnalytics> {
    let mut ranked: Vec<&AttemptRecord> = completed.to_vec();
    ranked.sort_by(|a, b| b.score.obtained.total_cmp(&a.score.obtained));

    let third = ranked.len() / 3;
    let top = &ranked[..third];
    let bottom = &ranked[ranked.len() - third..];

    assessment
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let mut total_attempts = 0;
            let mut correct_answers = 0;
            let mut total_time = 0.0;

            for answer in completed
                .iter()
                .filter_map(|a| a.answer_at(index))
                .filter(|a| a.is_attempted())
            {
                total_attempts += 1;
                total_time += answer.time_taken.max(0.0);
                if answer.is_correct {
                    correct_answers += 1;
                }
            }

            let discrimination_index = discrimination(top, bottom, index);

            QuestionAnalytics {
                question_index: index,
                subject: GroupBy::Subject.key(question),
                chapter: GroupBy::Chapter.key(question),
                difficulty: GroupBy::Difficulty.key(question),
                total_attempts,
                correct_answers,
                accuracy: stats::percent(correct_answers as f64, total_attempts as f64),
                average_time: if total_attempts == 0 {
                    0.0
                } else {
                    total_time / total_attempts as f64
                },
                discrimination_index,
                flagged: discrimination_index < 0.0,
            }
        })
        .collect()
}

fn discrimination(top: &[&AttemptRecord], bottom: &[&AttemptRecord], index: usize) -> f64 {
    if top.is_empty() {
        return 0.0;
    }
    let correct_in = |group: &[&AttemptRecord]| {
        group
            .iter()
            .filter(|a| a.answer_at(index).is_some_and(|ans| ans.is_correct_attempt()))
            .count() as f64
    };
    (correct_in(top) - correct_in(bottom)) / top.len() as f64
}
