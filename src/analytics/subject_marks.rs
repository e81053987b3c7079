// src/analytics/subject_marks.rs

//! Per-subject marks for a ranking row.
//!
//! Attempt documents written by different client generations store subject
//! marks in different places. Each strategy below understands one shape and
//! returns `None` when the shape is absent; `extract_subject_marks` walks them
//! in priority order and keeps the first non-empty result.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::distribution::GroupBy;
use crate::{
    config::DEFAULT_QUESTION_MARKS,
    models::{
        assessment::{Assessment, QuestionSpec},
        attempt::{AnswerRecord, AttemptRecord},
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectMarks {
    pub obtained: f64,
    pub total: Option<f64>,
}

pub type SubjectMarksMap = BTreeMap<String, SubjectMarks>;

type Strategy = fn(&AttemptRecord, Option<&Assessment>) -> Option<SubjectMarksMap>;

const STRATEGIES: [(&str, Strategy); 5] = [
    ("subject_analysis", from_subject_analysis),
    ("subject_wise_score", from_subject_wise_score),
    ("answers", from_answers),
    ("flat_fields", from_flat_fields),
    ("nested_scan", from_nested_scan),
];

/// Runs the strategies in priority order. An attempt none of them understands
/// yields an empty map.
pub fn extract_subject_marks(attempt: &AttemptRecord, assessment: Option<&Assessment>) -> SubjectMarksMap {
    for (name, strategy) in STRATEGIES {
        if let Some(marks) = strategy(attempt, assessment).filter(|m| !m.is_empty()) {
            tracing::trace!(attempt_id = %attempt.id, strategy = name, "Resolved subject marks");
            return marks;
        }
    }

    tracing::debug!(attempt_id = %attempt.id, "No subject marks found on attempt");
    SubjectMarksMap::new()
}

/// Marks credited for a correct answer.
pub fn positive_marks(question: &QuestionSpec) -> f64 {
    question
        .marks
        .and_then(|m| m.positive)
        .unwrap_or(DEFAULT_QUESTION_MARKS)
}

/// Marks for an attempted answer: the recorded award when present, otherwise
/// derived from the question's marking scheme.
pub fn awarded_marks(question: &QuestionSpec, answer: &AnswerRecord) -> f64 {
    if let Some(awarded) = answer.marks_awarded {
        return awarded;
    }
    if answer.is_correct {
        positive_marks(question)
    } else {
        -question.marks.and_then(|m| m.negative).unwrap_or(0.0).abs()
    }
}

/// (a) `subjectAnalysis: { "Physics": { "marks": 40, "total": 100 } }`
pub fn from_subject_analysis(attempt: &AttemptRecord, _: Option<&Assessment>) -> Option<SubjectMarksMap> {
    let map = attempt.subject_analysis.as_ref()?.as_object()?;
    Some(
        map.iter()
            .filter_map(|(subject, entry)| {
                // Only entries that actually carry marks count for this shape.
                let entry = entry.as_object()?;
                let obtained = first_number(entry, &["marks", "marksObtained", "obtained"])?;
                let total = first_number(entry, &["total", "totalMarks", "maxMarks"]);
                Some((subject.clone(), SubjectMarks { obtained, total }))
            })
            .collect(),
    )
}

/// (b) `score.subjectWise: { "Physics": 40 }` or `{ "Physics": { "obtained": 40, "total": 100 } }`
pub fn from_subject_wise_score(attempt: &AttemptRecord, _: Option<&Assessment>) -> Option<SubjectMarksMap> {
    let map = attempt.score.subject_wise.as_ref()?.as_object()?;
    Some(
        map.iter()
            .filter_map(|(subject, entry)| Some((subject.clone(), marks_from_value(entry)?)))
            .collect(),
    )
}

/// (c) Recomputed from the aligned answers and the questions' marking schemes.
pub fn from_answers(attempt: &AttemptRecord, assessment: Option<&Assessment>) -> Option<SubjectMarksMap> {
    let assessment = assessment?;
    if attempt.answers.is_empty() || assessment.questions.is_empty() {
        return None;
    }

    let mut marks = SubjectMarksMap::new();
    for (index, question) in assessment.questions.iter().enumerate() {
        let entry = marks.entry(GroupBy::Subject.key(question)).or_default();
        *entry.total.get_or_insert(0.0) += positive_marks(question);

        if let Some(answer) = attempt.answer_at(index).filter(|a| a.is_attempted()) {
            entry.obtained += awarded_marks(question, answer);
        }
    }
    Some(marks)
}

static FLAT_MARKS_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)([a-z]+?)_?marks$").expect("flat marks pattern is valid")
});

const NON_SUBJECT_PREFIXES: [&str; 8] = [
    "total", "obtained", "max", "negative", "positive", "bonus", "min", "awarded",
];

/// (d) Flat fields named after the subject, e.g. `physicsMarks` or `chemistry_marks`.
pub fn from_flat_fields(attempt: &AttemptRecord, _: Option<&Assessment>) -> Option<SubjectMarksMap> {
    let marks: SubjectMarksMap = attempt
        .extra
        .iter()
        .filter_map(|(key, value)| {
            let prefix = FLAT_MARKS_FIELD.captures(key)?.get(1)?.as_str().to_ascii_lowercase();
            if NON_SUBJECT_PREFIXES.contains(&prefix.as_str()) {
                return None;
            }
            let obtained = number(value)?;
            Some((display_subject(&prefix), SubjectMarks { obtained, total: None }))
        })
        .collect();
    Some(marks)
}

const MAX_SCAN_DEPTH: usize = 4;

/// (e) Walks nested objects looking for keys that name a known subject.
pub fn from_nested_scan(attempt: &AttemptRecord, _: Option<&Assessment>) -> Option<SubjectMarksMap> {
    let mut marks = SubjectMarksMap::new();
    scan_object(&attempt.extra, 0, &mut marks);
    Some(marks)
}

fn scan_object(object: &Map<String, Value>, depth: usize, found: &mut SubjectMarksMap) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }
    for (key, value) in object {
        if let Some(subject) = canonical_subject(key) {
            if let Some(marks) = marks_from_value(value) {
                found.entry(subject.to_string()).or_insert(marks);
                continue;
            }
        }
        match value {
            Value::Object(inner) => scan_object(inner, depth + 1, found),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_object)
                .for_each(|inner| scan_object(inner, depth + 1, found)),
            _ => {}
        }
    }
}

fn canonical_subject(key: &str) -> Option<&'static str> {
    let subject = match key.to_ascii_lowercase().as_str() {
        "physics" => "Physics",
        "chemistry" => "Chemistry",
        "mathematics" | "maths" | "math" => "Mathematics",
        "biology" => "Biology",
        "botany" => "Botany",
        "zoology" => "Zoology",
        "english" => "English",
        "science" => "Science",
        "history" => "History",
        "geography" => "Geography",
        "economics" => "Economics",
        _ => return None,
    };
    Some(subject)
}

fn display_subject(prefix: &str) -> String {
    canonical_subject(prefix).map(str::to_string).unwrap_or_else(|| {
        let mut chars = prefix.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    })
}

fn marks_from_value(value: &Value) -> Option<SubjectMarks> {
    if let Some(obtained) = number(value) {
        return Some(SubjectMarks { obtained, total: None });
    }
    let object = value.as_object()?;
    let obtained = first_number(object, &["obtained", "marks", "score", "marksObtained"])?;
    let total = first_number(object, &["total", "totalMarks", "maxMarks", "outOf"]);
    Some(SubjectMarks { obtained, total })
}

fn first_number(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| object.get(*key).and_then(number))
}

/// Numbers and numeric strings; anything else is not a mark.
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}
