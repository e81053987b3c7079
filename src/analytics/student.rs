// src/analytics/student.rs

use chrono::Utc;

use super::{
    distribution::{GroupBy, attempt_outcome, group_breakdown},
    ranking::{attempt_rank, participant_accuracy, percentile},
    recommendations::{
        average_accuracy, error_analysis, exam_readiness, study_plan, subject_performance,
        time_efficiency,
    },
    subject_marks::extract_subject_marks,
    time::resolve_elapsed_seconds,
};
use crate::models::{
    assessment::Assessment,
    attempt::AttemptRecord,
    report::{OverallPerformance, StudentAnalyticsReport},
};

/// Builds the diagnostic report for one completed attempt.
///
/// `completed` holds every completed attempt of the assessment; rank and
/// percentile are taken among all of them, repeat attempts included.
pub fn student_report(
    assessment: &Assessment,
    attempt: &AttemptRecord,
    completed: &[&AttemptRecord],
) -> StudentAnalyticsReport {
    let (rank, total_participants) = attempt_rank(completed, &attempt.id).unwrap_or((1, 1));

    let subjects = subject_performance(&group_breakdown(assessment, &[attempt], GroupBy::Subject));
    let strengths = subjects
        .iter()
        .filter(|(_, s)| s.strength_level.is_strength())
        .map(|(name, _)| name.clone())
        .collect();
    let weaknesses = subjects
        .iter()
        .filter(|(_, s)| !s.strength_level.is_strength())
        .map(|(name, _)| name.clone())
        .collect();

    let average_accuracy = average_accuracy(&subjects);
    let time_efficiency = time_efficiency(attempt);

    StudentAnalyticsReport {
        participant_id: attempt.participant_id.clone(),
        attempt_id: attempt.id.clone(),
        assessment_id: assessment.id.clone(),
        overall: OverallPerformance {
            score: attempt.score.obtained,
            percentage: attempt.score.percentage,
            rank,
            percentile: percentile(rank, total_participants),
            total_participants,
            outcome: attempt_outcome(assessment, attempt),
            accuracy: participant_accuracy(attempt),
            elapsed_seconds: resolve_elapsed_seconds(attempt),
            subject_marks: extract_subject_marks(attempt, Some(assessment)),
        },
        recommendations: study_plan(assessment, attempt, &subjects),
        chapter_analysis: group_breakdown(assessment, &[attempt], GroupBy::Chapter),
        difficulty_analysis: group_breakdown(assessment, &[attempt], GroupBy::Difficulty),
        subject_analysis: subjects,
        strengths,
        weaknesses,
        error_analysis: error_analysis(assessment, attempt),
        average_accuracy,
        time_efficiency,
        exam_readiness: exam_readiness(average_accuracy, time_efficiency),
        generated_at: Utc::now(),
    }
}
