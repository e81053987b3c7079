// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle of an attempt. Only completed attempts feed the analytics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptStatus {
    #[default]
    InProgress,
    Completed,
}

impl AttemptStatus {
    /// Unknown values are treated as in-progress so they never count as completed.
    pub fn parse(value: &str) -> Self {
        match value {
            "completed" => AttemptStatus::Completed,
            _ => AttemptStatus::InProgress,
        }
    }
}

/// One participant's run of one assessment.
///
/// Upstream attempt documents are not uniform: besides the typed fields,
/// legacy shapes may carry a subject analysis map, a subject-wise score map,
/// or flat per-subject mark fields. The loosely typed parts are kept as JSON
/// and interpreted by `analytics::subject_marks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: String,
    pub assessment_id: String,
    pub participant_id: String,

    #[serde(default = "first_attempt")]
    pub attempt_number: i32,

    #[serde(default)]
    pub status: AttemptStatus,

    /// Index-aligned with the assessment's question sequence.
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,

    #[serde(default)]
    pub score: AttemptScore,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,

    /// Explicit elapsed time in seconds, when the client reported one.
    pub time_spent: Option<i64>,

    /// Legacy `{ "<subject>": { "marks": .., "total": .. } }` map.
    pub subject_analysis: Option<Value>,

    /// Any other fields present on the stored document.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn first_attempt() -> i32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptScore {
    #[serde(default)]
    pub obtained: f64,
    #[serde(default)]
    pub percentage: f64,
    pub total: Option<f64>,
    /// Legacy `{ "<subject>": number | { "obtained": .., "total": .. } }` map.
    pub subject_wise: Option<Value>,
}

/// One answer within an attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub selected_answer: Option<i64>,
    pub numerical_answer: Option<f64>,
    #[serde(default)]
    pub is_correct: bool,
    /// Seconds spent on the question.
    #[serde(default)]
    pub time_taken: f64,
    pub marks_awarded: Option<f64>,
}

impl AnswerRecord {
    /// An answer is unattempted exactly when neither answer form is present.
    pub fn is_attempted(&self) -> bool {
        self.selected_answer.is_some() || self.numerical_answer.is_some()
    }

    pub fn is_correct_attempt(&self) -> bool {
        self.is_attempted() && self.is_correct
    }
}

impl AttemptRecord {
    pub fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }

    /// Answer aligned with question `index`, if the attempt recorded one.
    pub fn answer_at(&self, index: usize) -> Option<&AnswerRecord> {
        self.answers.get(index)
    }
}
