// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'assessments' table in the database.
/// An ordered question sequence plus the metadata used to find similar assessments.
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,

    pub title: String,

    /// Primary subject, e.g. "Physics" or "Mixed".
    pub subject: Option<String>,

    /// Class / grade the assessment targets.
    #[sqlx(rename = "class")]
    #[serde(rename = "class")]
    pub class_name: Option<String>,

    /// Allotted duration in minutes.
    pub duration_minutes: Option<i32>,

    /// Stored as a JSON array; answers are aligned to it by position.
    #[sqlx(json)]
    pub questions: Vec<QuestionSpec>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One question of an assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpec {
    pub subject: Option<String>,
    pub chapter: Option<String>,
    pub difficulty: Option<String>,
    pub marks: Option<Marks>,
    pub correct_answer: Option<i64>,
    pub numerical_answer: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Marking scheme for a single question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Marks {
    pub positive: Option<f64>,
    pub negative: Option<f64>,
}

/// Represents the 'participants' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

impl Assessment {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

impl QuestionSpec {
    pub fn is_hard(&self) -> bool {
        self.difficulty
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case("hard"))
    }
}
