// src/analytics/recommendations.rs

//! Per-participant diagnosis: strength levels, a study plan, and a coarse
//! classification of wrong answers.
//!
//! The error types are heuristics based on answer time and question
//! difficulty. They are a best-effort label to guide revision, not a verified
//! diagnosis of why an answer was wrong.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    distribution::{GroupBreakdown, GroupBy},
    stats,
};
use crate::{
    config::{
        AVERAGE_ACCURACY, CARELESS_ANSWER_SECONDS, EXCELLENT_ACCURACY, READINESS_ACCURACY,
        READINESS_TIME_EFFICIENCY, STRONG_ACCURACY, TIME_PRESSURE_ANSWER_SECONDS,
    },
    models::{
        assessment::{Assessment, QuestionSpec},
        attempt::{AnswerRecord, AttemptRecord},
    },
};

/// Chapters suggested per subject in the study plan.
const FOCUS_CHAPTERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrengthLevel {
    Weak,
    Average,
    Strong,
    Excellent,
}

impl StrengthLevel {
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= EXCELLENT_ACCURACY {
            StrengthLevel::Excellent
        } else if accuracy >= STRONG_ACCURACY {
            StrengthLevel::Strong
        } else if accuracy >= AVERAGE_ACCURACY {
            StrengthLevel::Average
        } else {
            StrengthLevel::Weak
        }
    }

    pub fn is_strength(&self) -> bool {
        *self >= StrengthLevel::Strong
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPerformance {
    #[serde(flatten)]
    pub breakdown: GroupBreakdown,
    pub strength_level: StrengthLevel,
}

pub fn subject_performance(
    subjects: &BTreeMap<String, GroupBreakdown>,
) -> BTreeMap<String, SubjectPerformance> {
    subjects
        .iter()
        .map(|(subject, breakdown)| {
            (
                subject.clone(),
                SubjectPerformance {
                    breakdown: breakdown.clone(),
                    strength_level: StrengthLevel::from_accuracy(breakdown.accuracy),
                },
            )
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyRecommendation {
    pub subject: String,
    pub priority: Priority,
    pub strength_level: StrengthLevel,
    pub accuracy: f64,
    /// Weakest chapters of the subject in this attempt, weakest first.
    pub focus_chapters: Vec<String>,
    pub message: String,
}

/// Study plan for every subject below "strong", weakest subject first.
pub fn study_plan(
    assessment: &Assessment,
    attempt: &AttemptRecord,
    subjects: &BTreeMap<String, SubjectPerformance>,
) -> Vec<StudyRecommendation> {
    let chapters = chapter_accuracy_by_subject(assessment, attempt);

    let mut plan: Vec<StudyRecommendation> = subjects
        .iter()
        .filter(|(_, perf)| !perf.strength_level.is_strength())
        .map(|(subject, perf)| {
            let priority = match perf.strength_level {
                StrengthLevel::Weak => Priority::High,
                _ => Priority::Medium,
            };
            let focus_chapters = chapters
                .get(subject)
                .map(|list| {
                    list.iter()
                        .filter(|(_, accuracy)| *accuracy < STRONG_ACCURACY)
                        .take(FOCUS_CHAPTERS)
                        .map(|(chapter, _)| chapter.clone())
                        .collect()
                })
                .unwrap_or_default();

            let message = match priority {
                Priority::High => format!(
                    "Rebuild fundamentals in {} (accuracy {:.1}%). Work through concept notes before timed practice.",
                    subject, perf.breakdown.accuracy
                ),
                Priority::Medium => format!(
                    "Consolidate {} (accuracy {:.1}%) with targeted practice sets.",
                    subject, perf.breakdown.accuracy
                ),
            };

            StudyRecommendation {
                subject: subject.clone(),
                priority,
                strength_level: perf.strength_level,
                accuracy: perf.breakdown.accuracy,
                focus_chapters,
                message,
            }
        })
        .collect();

    plan.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy).then_with(|| a.subject.cmp(&b.subject)));
    plan
}

/// Chapter accuracies per subject for one attempt, ascending by accuracy.
fn chapter_accuracy_by_subject(
    assessment: &Assessment,
    attempt: &AttemptRecord,
) -> BTreeMap<String, Vec<(String, f64)>> {
    // (attempted, correct) per subject and chapter
    let mut counts: BTreeMap<(String, String), (usize, usize)> = BTreeMap::new();
    for (index, question) in assessment.questions.iter().enumerate() {
        let entry = counts
            .entry((GroupBy::Subject.key(question), GroupBy::Chapter.key(question)))
            .or_default();
        if let Some(answer) = attempt.answer_at(index).filter(|a| a.is_attempted()) {
            entry.0 += 1;
            if answer.is_correct {
                entry.1 += 1;
            }
        }
    }

    let mut by_subject: BTreeMap<String, Vec<(String, f64)>> = BTreeMap::new();
    for ((subject, chapter), (attempted, correct)) in counts {
        by_subject
            .entry(subject)
            .or_default()
            .push((chapter, stats::percent(correct as f64, attempted as f64)));
    }
    for chapters in by_subject.values_mut() {
        chapters.sort_by(|a, b| a.1.total_cmp(&b.1));
    }
    by_subject
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorType {
    Careless,
    TimePressure,
    Conceptual,
    Calculation,
}

/// Heuristic label for a wrong answer: very fast answers look careless, very
/// slow ones look time-pressured, wrong answers on hard questions look
/// conceptual, and everything else is counted as a calculation slip.
pub fn classify_error(question: &QuestionSpec, answer: &AnswerRecord) -> ErrorType {
    if answer.time_taken < CARELESS_ANSWER_SECONDS {
        ErrorType::Careless
    } else if answer.time_taken > TIME_PRESSURE_ANSWER_SECONDS {
        ErrorType::TimePressure
    } else if question.is_hard() {
        ErrorType::Conceptual
    } else {
        ErrorType::Calculation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    pub question_index: usize,
    pub subject: String,
    pub chapter: String,
    pub difficulty: String,
    pub time_taken: f64,
    pub error_type: ErrorType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCounts {
    pub careless: usize,
    pub time_pressure: usize,
    pub conceptual: usize,
    pub calculation: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    pub errors: Vec<ClassifiedError>,
    pub counts: ErrorCounts,
}

pub fn error_analysis(assessment: &Assessment, attempt: &AttemptRecord) -> ErrorAnalysis {
    let mut analysis = ErrorAnalysis::default();

    for (index, question) in assessment.questions.iter().enumerate() {
        let Some(answer) = attempt.answer_at(index) else {
            continue;
        };
        if !answer.is_attempted() || answer.is_correct {
            continue;
        }

        let error_type = classify_error(question, answer);
        match error_type {
            ErrorType::Careless => analysis.counts.careless += 1,
            ErrorType::TimePressure => analysis.counts.time_pressure += 1,
            ErrorType::Conceptual => analysis.counts.conceptual += 1,
            ErrorType::Calculation => analysis.counts.calculation += 1,
        }
        analysis.errors.push(ClassifiedError {
            question_index: index,
            subject: GroupBy::Subject.key(question),
            chapter: GroupBy::Chapter.key(question),
            difficulty: GroupBy::Difficulty.key(question),
            time_taken: answer.time_taken,
            error_type,
        });
    }
    analysis
}

/// Share of answering time that went into correctly answered questions.
pub fn time_efficiency(attempt: &AttemptRecord) -> f64 {
    let attempted = attempt.answers.iter().filter(|a| a.is_attempted());
    let (useful, total) = attempted.fold((0.0, 0.0), |(useful, total), a| {
        let t = a.time_taken.max(0.0);
        (if a.is_correct { useful + t } else { useful }, total + t)
    });
    stats::percent(useful, total)
}

/// Mean accuracy across subjects, including subjects left unattempted.
pub fn average_accuracy(subjects: &BTreeMap<String, SubjectPerformance>) -> f64 {
    let accuracies: Vec<f64> = subjects.values().map(|s| s.breakdown.accuracy).collect();
    stats::mean(&accuracies)
}

pub fn exam_readiness(average_accuracy: f64, time_efficiency: f64) -> bool {
    average_accuracy > READINESS_ACCURACY && time_efficiency > READINESS_TIME_EFFICIENCY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::distribution::group_breakdown;

    fn question(subject: &str, chapter: &str, difficulty: &str) -> QuestionSpec {
        QuestionSpec {
            subject: Some(subject.to_string()),
            chapter: Some(chapter.to_string()),
            difficulty: Some(difficulty.to_string()),
            ..Default::default()
        }
    }

    fn answer(correct: bool, time: f64) -> AnswerRecord {
        AnswerRecord {
            selected_answer: Some(0),
            is_correct: correct,
            time_taken: time,
            ..Default::default()
        }
    }

    #[test]
    fn strength_level_thresholds() {
        assert_eq!(StrengthLevel::from_accuracy(85.0), StrengthLevel::Excellent);
        assert_eq!(StrengthLevel::from_accuracy(84.9), StrengthLevel::Strong);
        assert_eq!(StrengthLevel::from_accuracy(70.0), StrengthLevel::Strong);
        assert_eq!(StrengthLevel::from_accuracy(50.0), StrengthLevel::Average);
        assert_eq!(StrengthLevel::from_accuracy(49.99), StrengthLevel::Weak);
        assert!(StrengthLevel::Strong.is_strength());
        assert!(!StrengthLevel::Average.is_strength());
    }

    #[test]
    fn error_classification_rules() {
        let easy = question("Physics", "Optics", "Easy");
        let hard = question("Physics", "Optics", "Hard");
        assert_eq!(classify_error(&hard, &answer(false, 10.0)), ErrorType::Careless);
        assert_eq!(classify_error(&easy, &answer(false, 301.0)), ErrorType::TimePressure);
        assert_eq!(classify_error(&hard, &answer(false, 120.0)), ErrorType::Conceptual);
        assert_eq!(classify_error(&easy, &answer(false, 120.0)), ErrorType::Calculation);
        assert_eq!(classify_error(&easy, &answer(false, 30.0)), ErrorType::Calculation);
        assert_eq!(classify_error(&easy, &answer(false, 300.0)), ErrorType::Calculation);
    }

    #[test]
    fn error_analysis_skips_correct_and_unattempted() {
        let assessment = Assessment {
            questions: vec![
                question("Physics", "Optics", "Hard"),
                question("Physics", "Optics", "Easy"),
                question("Chemistry", "Bonding", "Easy"),
                question("Chemistry", "Bonding", "Easy"),
            ],
            ..Default::default()
        };
        let attempt = AttemptRecord {
            answers: vec![answer(false, 100.0), answer(true, 5.0), AnswerRecord::default(), answer(false, 5.0)],
            ..Default::default()
        };
        let analysis = error_analysis(&assessment, &attempt);
        assert_eq!(analysis.errors.len(), 2);
        assert_eq!(analysis.errors[0].error_type, ErrorType::Conceptual);
        assert_eq!(analysis.errors[1].question_index, 3);
        assert_eq!(analysis.counts, ErrorCounts { careless: 1, conceptual: 1, ..Default::default() });
    }

    #[test]
    fn study_plan_targets_subjects_below_strong() {
        let assessment = Assessment {
            questions: vec![
                question("Physics", "Optics", "Easy"),
                question("Physics", "Kinematics", "Easy"),
                question("Chemistry", "Bonding", "Easy"),
                question("Chemistry", "Bonding", "Easy"),
                question("Maths", "Algebra", "Easy"),
                question("Maths", "Algebra", "Easy"),
                question("Maths", "Calculus", "Easy"),
                question("Maths", "Calculus", "Easy"),
            ],
            ..Default::default()
        };
        let attempt = AttemptRecord {
            answers: vec![
                answer(true, 60.0),
                answer(false, 60.0),
                answer(true, 60.0),
                answer(true, 60.0),
                answer(false, 60.0),
                answer(false, 60.0),
                answer(false, 60.0),
                answer(true, 60.0),
            ],
            ..Default::default()
        };

        let breakdown = group_breakdown(&assessment, &[&attempt], GroupBy::Subject);
        let subjects = subject_performance(&breakdown);
        assert_eq!(subjects["Chemistry"].strength_level, StrengthLevel::Excellent);
        assert_eq!(subjects["Maths"].strength_level, StrengthLevel::Weak);
        assert_eq!(subjects["Physics"].strength_level, StrengthLevel::Average);

        let plan = study_plan(&assessment, &attempt, &subjects);
        let order: Vec<(&str, Priority)> = plan.iter().map(|r| (r.subject.as_str(), r.priority)).collect();
        assert_eq!(order, vec![("Maths", Priority::High), ("Physics", Priority::Medium)]);
        assert_eq!(plan[0].focus_chapters, vec!["Algebra", "Calculus"]);
        assert_eq!(plan[1].focus_chapters, vec!["Kinematics"]);
    }

    #[test]
    fn time_efficiency_and_readiness() {
        let attempt = AttemptRecord {
            answers: vec![answer(true, 90.0), answer(false, 10.0), AnswerRecord::default()],
            ..Default::default()
        };
        assert_eq!(time_efficiency(&attempt), 90.0);
        assert_eq!(time_efficiency(&AttemptRecord::default()), 0.0);

        assert!(exam_readiness(76.0, 81.0));
        assert!(!exam_readiness(75.0, 95.0));
        assert!(!exam_readiness(95.0, 80.0));
    }
}
