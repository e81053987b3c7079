// src/analytics/distribution.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::stats;
use crate::models::{
    assessment::{Assessment, QuestionSpec},
    attempt::{AnswerRecord, AttemptRecord},
};

/// Fallback group key for questions that lack the grouping field.
pub const OTHER_GROUP: &str = "Other";

/// Inclusive percentage bounds of the score histogram.
const SCORE_BUCKETS: [(u32, u32); 5] = [(0, 20), (21, 40), (41, 60), (61, 80), (81, 100)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBucket {
    pub range: String,
    pub min: u32,
    pub max: u32,
    pub count: usize,
    pub percentage: f64,
}

/// Buckets completed attempts by score percentage.
///
/// Percentages are clamped into [0, 100] first (negative marking can push
/// them below zero) and a value belongs to the first bucket whose upper bound
/// it does not exceed, so fractional values such as 20.5 land in 21-40 and
/// the buckets cover the whole range.
pub fn score_distribution(completed: &[&AttemptRecord]) -> Vec<ScoreBucket> {
    let mut counts = [0usize; SCORE_BUCKETS.len()];
    for attempt in completed {
        counts[bucket_index(attempt.score.percentage)] += 1;
    }

    let total = completed.len() as f64;
    SCORE_BUCKETS
        .iter()
        .zip(counts)
        .map(|(&(min, max), count)| ScoreBucket {
            range: format!("{}-{}", min, max),
            min,
            max,
            count,
            percentage: stats::percent(count as f64, total),
        })
        .collect()
}

fn bucket_index(percentage: f64) -> usize {
    let p = if percentage.is_nan() { 0.0 } else { percentage.clamp(0.0, 100.0) };
    SCORE_BUCKETS
        .iter()
        .position(|&(_, max)| p <= max as f64)
        .unwrap_or(SCORE_BUCKETS.len() - 1)
}

/// Which question field a breakdown groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Subject,
    Chapter,
    Difficulty,
}

impl GroupBy {
    pub fn key(&self, question: &QuestionSpec) -> String {
        let field = match self {
            GroupBy::Subject => question.subject.as_deref(),
            GroupBy::Chapter => question.chapter.as_deref(),
            GroupBy::Difficulty => question.difficulty.as_deref(),
        };
        match field.map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => OTHER_GROUP.to_string(),
        }
    }
}

/// Accuracy and timing totals for one subject, chapter or difficulty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBreakdown {
    pub total_questions: usize,
    pub attempted: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unattempted: usize,
    pub total_time: f64,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub accuracy: f64,
    pub attempt_rate: f64,
    pub average_time: f64,
}

impl GroupBreakdown {
    fn record(&mut self, question: &QuestionSpec, answer: Option<&AnswerRecord>) {
        self.total_questions += 1;
        self.max_marks += super::subject_marks::positive_marks(question);

        match answer.filter(|a| a.is_attempted()) {
            Some(answer) => {
                self.attempted += 1;
                self.total_time += answer.time_taken.max(0.0);
                self.marks_obtained += super::subject_marks::awarded_marks(question, answer);
                if answer.is_correct {
                    self.correct += 1;
                } else {
                    self.incorrect += 1;
                }
            }
            None => self.unattempted += 1,
        }
    }

    fn finalize(&mut self) {
        self.accuracy = stats::percent(self.correct as f64, self.attempted as f64);
        self.attempt_rate = stats::percent(self.attempted as f64, self.total_questions as f64);
        self.average_time = if self.attempted == 0 {
            0.0
        } else {
            self.total_time / self.attempted as f64
        };
    }
}

/// Aligns `answers[i]` with `questions[i]` for every attempt and accumulates
/// the totals per group.
pub fn group_breakdown(
    assessment: &Assessment,
    attempts: &[&AttemptRecord],
    by: GroupBy,
) -> BTreeMap<String, GroupBreakdown> {
    let mut groups: BTreeMap<String, GroupBreakdown> = BTreeMap::new();

    for attempt in attempts {
        for (index, question) in assessment.questions.iter().enumerate() {
            groups
                .entry(by.key(question))
                .or_default()
                .record(question, attempt.answer_at(index));
        }
    }

    groups.values_mut().for_each(GroupBreakdown::finalize);
    groups
}

/// Correct / incorrect / unattempted counts of a single attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    pub total_questions: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unattempted: usize,
}

impl AttemptOutcome {
    pub fn attempted(&self) -> usize {
        self.correct + self.incorrect
    }
}

pub fn attempt_outcome(assessment: &Assessment, attempt: &AttemptRecord) -> AttemptOutcome {
    let mut outcome = AttemptOutcome {
        total_questions: assessment.question_count(),
        ..Default::default()
    };

    for index in 0..assessment.question_count() {
        match attempt.answer_at(index).filter(|a| a.is_attempted()) {
            Some(answer) if answer.is_correct => outcome.correct += 1,
            Some(_) => outcome.incorrect += 1,
            None => outcome.unattempted += 1,
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::{AttemptScore, AttemptStatus};

    fn scored(percentage: f64) -> AttemptRecord {
        AttemptRecord {
            status: AttemptStatus::Completed,
            score: AttemptScore {
                obtained: percentage,
                percentage,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn question(subject: Option<&str>, chapter: Option<&str>, difficulty: &str) -> QuestionSpec {
        QuestionSpec {
            subject: subject.map(str::to_string),
            chapter: chapter.map(str::to_string),
            difficulty: Some(difficulty.to_string()),
            ..Default::default()
        }
    }

    fn answered(correct: bool, time: f64) -> AnswerRecord {
        AnswerRecord {
            selected_answer: Some(1),
            is_correct: correct,
            time_taken: time,
            ..Default::default()
        }
    }

    #[test]
    fn buckets_partition_the_range() {
        let attempts: Vec<AttemptRecord> = [0.0, 20.0, 20.5, 21.0, 40.0, 60.0, 61.0, 80.0, 100.0, -12.0, 104.0]
            .into_iter()
            .map(scored)
            .collect();
        let refs: Vec<&AttemptRecord> = attempts.iter().collect();

        let buckets = score_distribution(&refs);
        let counts: Vec<usize> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![3, 3, 1, 2, 2]);
        assert_eq!(counts.iter().sum::<usize>(), attempts.len());
        assert_eq!(buckets[0].range, "0-20");
        assert_eq!(buckets[4].range, "81-100");
    }

    #[test]
    fn empty_distribution_has_zero_counts() {
        let buckets = score_distribution(&[]);
        assert_eq!(buckets.len(), 5);
        assert!(buckets.iter().all(|b| b.count == 0 && b.percentage == 0.0));
    }

    #[test]
    fn subject_breakdown_aligns_answers_by_position() {
        let assessment = Assessment {
            questions: vec![
                question(Some("Physics"), Some("Optics"), "Easy"),
                question(Some("Physics"), Some("Kinematics"), "Hard"),
                question(Some("Chemistry"), None, "Medium"),
                question(None, None, "Medium"),
            ],
            ..Default::default()
        };
        let attempt = AttemptRecord {
            status: AttemptStatus::Completed,
            answers: vec![answered(true, 40.0), answered(false, 80.0), AnswerRecord::default()],
            ..Default::default()
        };

        let subjects = group_breakdown(&assessment, &[&attempt], GroupBy::Subject);
        let physics = &subjects["Physics"];
        assert_eq!(physics.total_questions, 2);
        assert_eq!(physics.attempted, 2);
        assert_eq!(physics.correct, 1);
        assert_eq!(physics.accuracy, 50.0);
        assert_eq!(physics.attempt_rate, 100.0);
        assert_eq!(physics.average_time, 60.0);

        let chemistry = &subjects["Chemistry"];
        assert_eq!(chemistry.attempted, 0);
        assert_eq!(chemistry.accuracy, 0.0);
        assert_eq!(chemistry.attempt_rate, 0.0);

        // The fourth question has no subject and no aligned answer.
        assert_eq!(subjects[OTHER_GROUP].unattempted, 1);

        let total: usize = subjects.values().map(|g| g.total_questions).sum();
        assert_eq!(total, assessment.question_count());

        let chapters = group_breakdown(&assessment, &[&attempt], GroupBy::Chapter);
        assert_eq!(chapters[OTHER_GROUP].total_questions, 2);
        let difficulty = group_breakdown(&assessment, &[&attempt], GroupBy::Difficulty);
        assert_eq!(difficulty["Hard"].incorrect, 1);
    }

    #[test]
    fn outcome_counts_cover_every_question() {
        let assessment = Assessment {
            questions: vec![QuestionSpec::default(); 5],
            ..Default::default()
        };
        let attempt = AttemptRecord {
            answers: vec![answered(true, 1.0), answered(false, 1.0), AnswerRecord::default()],
            ..Default::default()
        };
        let outcome = attempt_outcome(&assessment, &attempt);
        assert_eq!(outcome.correct, 1);
        assert_eq!(outcome.incorrect, 1);
        assert_eq!(outcome.unattempted, 3);
        assert_eq!(
            outcome.correct + outcome.incorrect + outcome.unattempted,
            outcome.total_questions
        );
    }

    #[test]
    fn correct_flag_without_answer_is_unattempted() {
        let assessment = Assessment {
            questions: vec![QuestionSpec::default()],
            ..Default::default()
        };
        let attempt = AttemptRecord {
            answers: vec![AnswerRecord {
                is_correct: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        let outcome = attempt_outcome(&assessment, &attempt);
        assert_eq!(outcome.correct, 0);
        assert_eq!(outcome.unattempted, 1);
    }
}
