// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RecordAccessor, ReportStore};
use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, Participant},
        attempt::AttemptRecord,
        report::{AnalyticsReport, StudentAnalyticsReport},
    },
};

/// In-process store implementing both storage seams.
///
/// Assessments are kept ordered by id and attempts in insertion order, so
/// reads are deterministic.
#[derive(Default)]
pub struct MemoryStore {
    assessments: RwLock<BTreeMap<String, Assessment>>,
    attempts: RwLock<Vec<AttemptRecord>>,
    participants: RwLock<HashMap<String, Participant>>,
    reports: RwLock<HashMap<String, AnalyticsReport>>,
    // (participant id, attempt id) -> report
    student_reports: RwLock<BTreeMap<(String, String), StudentAnalyticsReport>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_assessment(&self, assessment: Assessment) {
        self.assessments
            .write()
            .await
            .insert(assessment.id.clone(), assessment);
    }

    /// Inserts an attempt, replacing any attempt with the same id.
    pub async fn insert_attempt(&self, attempt: AttemptRecord) {
        let mut attempts = self.attempts.write().await;
        match attempts.iter_mut().find(|a| a.id == attempt.id) {
            Some(existing) => *existing = attempt,
            None => attempts.push(attempt),
        }
    }

    pub async fn insert_participant(&self, participant: Participant) {
        self.participants
            .write()
            .await
            .insert(participant.id.clone(), participant);
    }
}

#[async_trait]
impl RecordAccessor for MemoryStore {
    async fn get_assessment(&self, assessment_id: &str) -> Result<Option<Assessment>, AppError> {
        Ok(self.assessments.read().await.get(assessment_id).cloned())
    }

    async fn get_attempts(
        &self,
        assessment_id: &str,
        participant_id: Option<&str>,
    ) -> Result<Vec<AttemptRecord>, AppError> {
        Ok(self
            .attempts
            .read()
            .await
            .iter()
            .filter(|a| a.assessment_id == assessment_id)
            .filter(|a| participant_id.is_none_or(|p| a.participant_id == p))
            .cloned()
            .collect())
    }

    async fn get_attempt(&self, attempt_id: &str) -> Result<Option<AttemptRecord>, AppError> {
        Ok(self
            .attempts
            .read()
            .await
            .iter()
            .find(|a| a.id == attempt_id)
            .cloned())
    }

    async fn find_similar_assessments(
        &self,
        subject: &str,
        class_name: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<Assessment>, AppError> {
        Ok(self
            .assessments
            .read()
            .await
            .values()
            .filter(|a| a.id != exclude_id)
            .filter(|a| a.subject.as_deref() == Some(subject))
            .filter(|a| a.class_name.as_deref() == Some(class_name))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_participants(&self, participant_ids: &[String]) -> Result<Vec<Participant>, AppError> {
        let participants = self.participants.read().await;
        Ok(participant_ids
            .iter()
            .filter_map(|id| participants.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn get_report(&self, assessment_id: &str) -> Result<Option<AnalyticsReport>, AppError> {
        Ok(self.reports.read().await.get(assessment_id).cloned())
    }

    async fn upsert_report(&self, report: &AnalyticsReport) -> Result<(), AppError> {
        self.reports
            .write()
            .await
            .insert(report.assessment_id.clone(), report.clone());
        Ok(())
    }

    async fn delete_report(&self, assessment_id: &str) -> Result<bool, AppError> {
        let removed = self.reports.write().await.remove(assessment_id).is_some();
        let mut student_reports = self.student_reports.write().await;
        let before = student_reports.len();
        student_reports.retain(|_, r| r.assessment_id != assessment_id);
        Ok(removed || student_reports.len() < before)
    }

    async fn get_student_report(
        &self,
        participant_id: &str,
        attempt_id: &str,
    ) -> Result<Option<StudentAnalyticsReport>, AppError> {
        Ok(self
            .student_reports
            .read()
            .await
            .get(&(participant_id.to_string(), attempt_id.to_string()))
            .cloned())
    }

    async fn upsert_student_report(&self, report: &StudentAnalyticsReport) -> Result<(), AppError> {
        self.student_reports.write().await.insert(
            (report.participant_id.clone(), report.attempt_id.clone()),
            report.clone(),
        );
        Ok(())
    }

    async fn replace_student_reports(
        &self,
        assessment_id: &str,
        reports: &[StudentAnalyticsReport],
    ) -> Result<(), AppError> {
        let mut stored = self.student_reports.write().await;
        stored.retain(|_, r| r.assessment_id != assessment_id);
        for report in reports {
            stored.insert(
                (report.participant_id.clone(), report.attempt_id.clone()),
                report.clone(),
            );
        }
        Ok(())
    }

    async fn list_student_reports(&self, assessment_id: &str) -> Result<Vec<StudentAnalyticsReport>, AppError> {
        Ok(self
            .student_reports
            .read()
            .await
            .values()
            .filter(|r| r.assessment_id == assessment_id)
            .cloned()
            .collect())
    }
}
