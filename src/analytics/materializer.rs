// src/analytics/materializer.rs

use std::{
    any::Any,
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex},
};

use chrono::Utc;

use super::{
    basic::basic_stats,
    comparative::comparative_analytics,
    distribution::{GroupBy, group_breakdown, score_distribution},
    insights::assessment_insights,
    items::question_analytics,
    ranking::rank_participants,
    student::student_report,
    time::{resolve_elapsed_seconds, time_analytics},
};
use crate::{
    error::AppError,
    models::{
        assessment::Assessment,
        attempt::AttemptRecord,
        report::{AnalyticsReport, FallbackReport, ReportState, StudentAnalyticsReport},
    },
    store::{RecordAccessor, ReportStore},
};

/// Pure assessment-level aggregation: assessment, all attempts, participant names.
pub type ReportBuilder = fn(&Assessment, &[AttemptRecord], &HashMap<String, String>) -> AnalyticsReport;

/// Pure per-attempt diagnostic: assessment, the attempt, all completed attempts.
pub type StudentReportBuilder = fn(&Assessment, &AttemptRecord, &[&AttemptRecord]) -> StudentAnalyticsReport;

/// Orchestrates the calculators and owns the materialized reports.
///
/// Each regeneration replaces the stored reports wholesale. Concurrent
/// regenerations of the same assessment are not serialized: the last write
/// wins, and every write is a complete report.
pub struct ReportMaterializer {
    records: Arc<dyn RecordAccessor>,
    reports: Arc<dyn ReportStore>,
    similar_limit: usize,
    build_report: ReportBuilder,
    build_student_report: StudentReportBuilder,
    // assessment id -> number of computations in progress
    in_flight: Mutex<HashMap<String, usize>>,
}

impl ReportMaterializer {
    pub fn new(records: Arc<dyn RecordAccessor>, reports: Arc<dyn ReportStore>, similar_limit: usize) -> Self {
        Self {
            records,
            reports,
            similar_limit,
            build_report: build_assessment_report,
            build_student_report: student_report,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Swaps the assessment-level aggregation step.
    pub fn with_report_builder(mut self, builder: ReportBuilder) -> Self {
        self.build_report = builder;
        self
    }

    /// Swaps the per-attempt diagnostic step.
    pub fn with_student_report_builder(mut self, builder: StudentReportBuilder) -> Self {
        self.build_student_report = builder;
        self
    }

    /// Returns the cached report unless `regenerate` is set or none exists;
    /// otherwise recomputes the assessment report and every student report.
    pub async fn compute_assessment_analytics(
        &self,
        assessment_id: &str,
        regenerate: bool,
    ) -> Result<AnalyticsReport, AppError> {
        if !regenerate {
            if let Some(cached) = self.reports.get_report(assessment_id).await? {
                tracing::debug!(assessment_id, "Serving cached analytics report");
                return Ok(cached);
            }
        }

        let assessment = self
            .records
            .get_assessment(assessment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assessment '{}' not found", assessment_id)))?;
        let attempts = self.records.get_attempts(assessment_id, None).await?;

        let _computing = ComputingGuard::enter(&self.in_flight, assessment_id);
        tracing::info!(assessment_id, attempts = attempts.len(), "Computing analytics report");

        let (mut report, student_reports) = self.aggregate(&assessment, &attempts).await?;

        report.comparative = match comparative_analytics(
            self.records.as_ref(),
            &assessment,
            report.basic.average_score,
            self.similar_limit,
        )
        .await
        {
            Ok(comparison) => comparison,
            Err(e) => {
                tracing::warn!(assessment_id, "Benchmark unavailable, continuing without it: {}", e);
                Default::default()
            }
        };

        self.reports.upsert_report(&report).await?;
        self.reports
            .replace_student_reports(assessment_id, &student_reports)
            .await?;

        tracing::info!(
            assessment_id,
            student_reports = student_reports.len(),
            "Analytics report materialized"
        );
        Ok(report)
    }

    /// Runs the pure calculators. A fault inside them is logged and turned
    /// into `ComputeFailure` carrying a zeroed report.
    async fn aggregate(
        &self,
        assessment: &Assessment,
        attempts: &[AttemptRecord],
    ) -> Result<(AnalyticsReport, Vec<StudentAnalyticsReport>), AppError> {
        let completed: Vec<&AttemptRecord> = attempts.iter().filter(|a| a.is_completed()).collect();

        let mut participant_ids: Vec<String> = completed.iter().map(|a| a.participant_id.clone()).collect();
        participant_ids.sort();
        participant_ids.dedup();
        let names: HashMap<String, String> = self
            .records
            .get_participants(&participant_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let computed = catch_unwind(AssertUnwindSafe(|| {
            let report = (self.build_report)(assessment, attempts, &names);
            let students: Vec<StudentAnalyticsReport> = completed
                .iter()
                .map(|attempt| (self.build_student_report)(assessment, attempt, &completed))
                .collect();
            (report, students)
        }));

        computed.map_err(|panic| {
            let message = panic_message(panic);
            tracing::error!(assessment_id = %assessment.id, "Aggregation failed: {}", message);
            AppError::ComputeFailure {
                message,
                fallback: Box::new(FallbackReport::Assessment(AnalyticsReport::empty(&assessment.id))),
            }
        })
    }

    /// Returns the cached student report unless `regenerate` is set or none
    /// exists; otherwise rebuilds it from the attempt and its assessment.
    pub async fn compute_participant_report(
        &self,
        participant_id: &str,
        attempt_id: &str,
        regenerate: bool,
    ) -> Result<StudentAnalyticsReport, AppError> {
        if !regenerate {
            if let Some(cached) = self.reports.get_student_report(participant_id, attempt_id).await? {
                tracing::debug!(participant_id, attempt_id, "Serving cached student report");
                return Ok(cached);
            }
        }

        let attempt = self
            .records
            .get_attempt(attempt_id)
            .await?
            .filter(|a| a.participant_id == participant_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Attempt '{}' not found for participant '{}'",
                    attempt_id, participant_id
                ))
            })?;

        if !attempt.is_completed() {
            return Err(AppError::BadRequest("Attempt is not completed yet".to_string()));
        }

        let assessment = self
            .records
            .get_assessment(&attempt.assessment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Assessment '{}' not found", attempt.assessment_id))
            })?;

        let attempts = self.records.get_attempts(&assessment.id, None).await?;
        let completed: Vec<&AttemptRecord> = attempts.iter().filter(|a| a.is_completed()).collect();

        let report = catch_unwind(AssertUnwindSafe(|| {
            (self.build_student_report)(&assessment, &attempt, &completed)
        }))
        .map_err(|panic| {
            let message = panic_message(panic);
            tracing::error!(participant_id, attempt_id, "Student report computation failed: {}", message);
            AppError::ComputeFailure {
                message,
                fallback: Box::new(FallbackReport::Student(StudentAnalyticsReport::empty(
                    participant_id,
                    attempt_id,
                    &assessment.id,
                ))),
            }
        })?;

        self.reports.upsert_student_report(&report).await?;
        tracing::info!(participant_id, attempt_id, "Student report materialized");
        Ok(report)
    }

    pub async fn report_state(&self, assessment_id: &str) -> Result<(ReportState, Option<chrono::DateTime<Utc>>), AppError> {
        let stored = self.reports.get_report(assessment_id).await?;
        let last_calculated = stored.as_ref().map(|r| r.last_calculated);

        if self.is_computing(assessment_id) {
            return Ok((ReportState::Computing, last_calculated));
        }
        match stored {
            Some(_) => Ok((ReportState::Materialized, last_calculated)),
            None => Ok((ReportState::Absent, None)),
        }
    }

    /// Drops the cached reports of an assessment; they are rebuilt on demand.
    pub async fn invalidate(&self, assessment_id: &str) -> Result<bool, AppError> {
        let removed = self.reports.delete_report(assessment_id).await?;
        tracing::info!(assessment_id, removed, "Analytics report invalidated");
        Ok(removed)
    }

    pub async fn student_reports(&self, assessment_id: &str) -> Result<Vec<StudentAnalyticsReport>, AppError> {
        self.reports.list_student_reports(assessment_id).await
    }

    fn is_computing(&self, assessment_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(assessment_id)
            .is_some_and(|count| *count > 0)
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown fault".to_string())
}

/// Marks an assessment as computing for as long as it is alive.
struct ComputingGuard<'a> {
    in_flight: &'a Mutex<HashMap<String, usize>>,
    key: String,
}

impl<'a> ComputingGuard<'a> {
    fn enter(in_flight: &'a Mutex<HashMap<String, usize>>, key: &str) -> Self {
        *in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.to_string())
            .or_default() += 1;
        Self {
            in_flight,
            key: key.to_string(),
        }
    }
}

impl Drop for ComputingGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(count) = in_flight.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(&self.key);
            }
        }
    }
}

/// Assessment-level aggregates, without the benchmark (which needs I/O).
pub fn build_assessment_report(
    assessment: &Assessment,
    attempts: &[AttemptRecord],
    names: &HashMap<String, String>,
) -> AnalyticsReport {
    let completed: Vec<&AttemptRecord> = attempts.iter().filter(|a| a.is_completed()).collect();
    let elapsed: Vec<i64> = completed.iter().map(|a| resolve_elapsed_seconds(a)).collect();

    let basic = basic_stats(attempts);
    let time = time_analytics(&elapsed);
    let insights = assessment_insights(&basic, &time);

    AnalyticsReport {
        assessment_id: assessment.id.clone(),
        assessment_title: assessment.title.clone(),
        score_distribution: score_distribution(&completed),
        subject_breakdown: group_breakdown(assessment, &completed, GroupBy::Subject),
        chapter_breakdown: group_breakdown(assessment, &completed, GroupBy::Chapter),
        difficulty_breakdown: group_breakdown(assessment, &completed, GroupBy::Difficulty),
        question_analytics: question_analytics(assessment, &completed),
        rankings: rank_participants(&completed, Some(assessment), names),
        comparative: Default::default(),
        basic,
        time,
        insights,
        last_calculated: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        assessment::{Participant, QuestionSpec},
        attempt::{AnswerRecord, AttemptScore, AttemptStatus},
    };
    use crate::store::MemoryStore;

    fn assessment() -> Assessment {
        Assessment {
            id: "t1".to_string(),
            title: "Mock Test 1".to_string(),
            subject: Some("Physics".to_string()),
            class_name: Some("12".to_string()),
            questions: vec![
                QuestionSpec { subject: Some("Physics".into()), ..Default::default() },
                QuestionSpec { subject: Some("Physics".into()), ..Default::default() },
            ],
            ..Default::default()
        }
    }

    fn attempt(id: &str, participant: &str, obtained: f64, status: AttemptStatus) -> AttemptRecord {
        AttemptRecord {
            id: id.to_string(),
            assessment_id: "t1".to_string(),
            participant_id: participant.to_string(),
            status,
            score: AttemptScore { obtained, percentage: obtained, ..Default::default() },
            answers: vec![
                AnswerRecord { selected_answer: Some(1), is_correct: obtained >= 50.0, time_taken: 45.0, ..Default::default() },
                AnswerRecord { selected_answer: Some(2), is_correct: obtained >= 80.0, time_taken: 75.0, ..Default::default() },
            ],
            time_spent: Some(600),
            ..Default::default()
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert_assessment(assessment()).await;
        store.insert_participant(Participant { id: "p1".into(), name: "Asha".into(), email: None }).await;
        for record in [
            attempt("a1", "p1", 90.0, AttemptStatus::Completed),
            attempt("a2", "p2", 60.0, AttemptStatus::Completed),
            attempt("a3", "p3", 30.0, AttemptStatus::Completed),
            attempt("a4", "p4", 0.0, AttemptStatus::InProgress),
        ] {
            store.insert_attempt(record).await;
        }
        store
    }

    fn materializer(store: &Arc<MemoryStore>) -> ReportMaterializer {
        ReportMaterializer::new(store.clone(), store.clone(), 5)
    }

    #[tokio::test]
    async fn materializes_report_and_student_reports() {
        let store = seeded_store().await;
        let engine = materializer(&store);

        assert_eq!(engine.report_state("t1").await.unwrap().0, ReportState::Absent);

        let report = engine.compute_assessment_analytics("t1", false).await.unwrap();
        assert_eq!(report.basic.total_attempts, 4);
        assert_eq!(report.basic.completion_rate, 75.0);
        assert_eq!(report.basic.median_score, 60.0);
        let ranks: Vec<(&str, usize)> = report.rankings.iter().map(|r| (r.attempt_id.as_str(), r.rank)).collect();
        assert_eq!(ranks, vec![("a1", 1), ("a2", 2), ("a3", 3)]);
        assert_eq!(report.rankings[0].participant_name.as_deref(), Some("Asha"));

        assert_eq!(engine.report_state("t1").await.unwrap().0, ReportState::Materialized);
        assert_eq!(engine.student_reports("t1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn cached_report_is_served_without_recomputation() {
        let store = seeded_store().await;
        let engine = materializer(&store);

        let first = engine.compute_assessment_analytics("t1", false).await.unwrap();
        store.insert_attempt(attempt("a5", "p5", 100.0, AttemptStatus::Completed)).await;

        let cached = engine.compute_assessment_analytics("t1", false).await.unwrap();
        assert_eq!(cached, first);

        let fresh = engine.compute_assessment_analytics("t1", true).await.unwrap();
        assert_eq!(fresh.basic.completed_attempts, 4);
        assert_eq!(engine.student_reports("t1").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn regeneration_is_idempotent() {
        let store = seeded_store().await;
        let engine = materializer(&store);

        let mut first = engine.compute_assessment_analytics("t1", true).await.unwrap();
        let second = engine.compute_assessment_analytics("t1", true).await.unwrap();
        first.last_calculated = second.last_calculated;
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn missing_assessment_is_not_found() {
        let store = seeded_store().await;
        let engine = materializer(&store);

        let err = engine.compute_assessment_analytics("nope", true).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn participant_report_checks_ownership_and_status() {
        let store = seeded_store().await;
        let engine = materializer(&store);

        let report = engine.compute_participant_report("p2", "a2", false).await.unwrap();
        assert_eq!(report.overall.rank, 2);
        assert_eq!(report.overall.percentile, 33.0);

        let wrong_owner = engine.compute_participant_report("p1", "a2", false).await.unwrap_err();
        assert!(matches!(wrong_owner, AppError::NotFound(_)));

        let unfinished = engine.compute_participant_report("p4", "a4", false).await.unwrap_err();
        assert!(matches!(unfinished, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn empty_assessment_produces_zeroed_report() {
        let store = Arc::new(MemoryStore::new());
        store.insert_assessment(assessment()).await;
        let engine = materializer(&store);

        let report = engine.compute_assessment_analytics("t1", false).await.unwrap();
        assert_eq!(report.basic.completion_rate, 0.0);
        assert_eq!(report.basic.average_score, 0.0);
        assert!(report.score_distribution.iter().all(|b| b.count == 0));
        assert!(report.rankings.is_empty());
    }

    #[tokio::test]
    async fn invalidate_returns_to_absent() {
        let store = seeded_store().await;
        let engine = materializer(&store);

        engine.compute_assessment_analytics("t1", false).await.unwrap();
        assert!(engine.invalidate("t1").await.unwrap());
        assert_eq!(engine.report_state("t1").await.unwrap().0, ReportState::Absent);
        assert!(engine.student_reports("t1").await.unwrap().is_empty());
        assert!(!engine.invalidate("t1").await.unwrap());
    }

    fn faulty_report(_: &Assessment, _: &[AttemptRecord], _: &HashMap<String, String>) -> AnalyticsReport {
        panic!("score bucket overflow")
    }

    fn faulty_student_report(_: &Assessment, _: &AttemptRecord, _: &[&AttemptRecord]) -> StudentAnalyticsReport {
        panic!("chapter table missing")
    }

    #[tokio::test]
    async fn aggregation_fault_returns_zeroed_report_and_persists_nothing() {
        let store = seeded_store().await;
        let engine = materializer(&store).with_report_builder(faulty_report);

        let err = engine.compute_assessment_analytics("t1", true).await.unwrap_err();
        let AppError::ComputeFailure { message, fallback } = err else {
            panic!("expected ComputeFailure");
        };
        assert_eq!(message, "score bucket overflow");
        let FallbackReport::Assessment(report) = *fallback else {
            panic!("expected an assessment fallback");
        };
        assert_eq!(report.assessment_id, "t1");
        assert_eq!(report.basic.completed_attempts, 0);
        assert_eq!(report.score_distribution.len(), 5);
        assert!(report.rankings.is_empty());

        assert_eq!(engine.report_state("t1").await.unwrap().0, ReportState::Absent);
        assert!(engine.student_reports("t1").await.unwrap().is_empty());
        assert!(!engine.is_computing("t1"));
    }

    #[tokio::test]
    async fn failed_regeneration_keeps_previous_report() {
        let store = seeded_store().await;
        let previous = materializer(&store).compute_assessment_analytics("t1", false).await.unwrap();

        let faulty = materializer(&store).with_student_report_builder(faulty_student_report);
        let err = faulty.compute_assessment_analytics("t1", true).await.unwrap_err();
        assert!(matches!(err, AppError::ComputeFailure { .. }));

        let kept = store.get_report("t1").await.unwrap().unwrap();
        assert_eq!(kept, previous);
        assert_eq!(faulty.student_reports("t1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn participant_fault_returns_zeroed_student_report() {
        let store = seeded_store().await;
        let engine = materializer(&store).with_student_report_builder(faulty_student_report);

        let err = engine.compute_participant_report("p1", "a1", true).await.unwrap_err();
        let AppError::ComputeFailure { fallback, .. } = err else {
            panic!("expected ComputeFailure");
        };
        let FallbackReport::Student(report) = *fallback else {
            panic!("expected a student fallback");
        };
        assert_eq!((report.participant_id.as_str(), report.attempt_id.as_str()), ("p1", "a1"));
        assert_eq!(report.overall.rank, 0);
        assert!(!report.exam_readiness);

        assert!(store.get_student_report("p1", "a1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_clears_orphan_student_reports() {
        let store = seeded_store().await;
        let engine = materializer(&store);

        engine.compute_participant_report("p1", "a1", false).await.unwrap();
        assert_eq!(engine.report_state("t1").await.unwrap().0, ReportState::Absent);

        assert!(engine.invalidate("t1").await.unwrap());
        assert!(store.get_student_report("p1", "a1").await.unwrap().is_none());
        assert!(!engine.invalidate("t1").await.unwrap());
    }

    #[test]
    fn computing_guard_tracks_overlapping_runs() {
        let in_flight = Mutex::new(HashMap::new());
        let first = ComputingGuard::enter(&in_flight, "t1");
        let second = ComputingGuard::enter(&in_flight, "t1");
        drop(first);
        assert_eq!(in_flight.lock().unwrap().get("t1"), Some(&1));
        drop(second);
        assert!(in_flight.lock().unwrap().is_empty());
    }
}
