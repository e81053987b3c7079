// src/store/mod.rs

//! Storage seams of the analytics engine.
//!
//! `RecordAccessor` supplies the immutable inputs (assessments, attempts,
//! participants); `ReportStore` holds the materialized reports, which are
//! caches and may be dropped at any time.

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, Participant},
        attempt::AttemptRecord,
        report::{AnalyticsReport, StudentAnalyticsReport},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait RecordAccessor: Send + Sync {
    async fn get_assessment(&self, assessment_id: &str) -> Result<Option<Assessment>, AppError>;

    /// Attempts of an assessment, optionally narrowed to one participant.
    async fn get_attempts(
        &self,
        assessment_id: &str,
        participant_id: Option<&str>,
    ) -> Result<Vec<AttemptRecord>, AppError>;

    async fn get_attempt(&self, attempt_id: &str) -> Result<Option<AttemptRecord>, AppError>;

    /// Assessments sharing subject and class, excluding `exclude_id`.
    async fn find_similar_assessments(
        &self,
        subject: &str,
        class_name: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<Assessment>, AppError>;

    async fn get_participants(&self, participant_ids: &[String]) -> Result<Vec<Participant>, AppError>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn get_report(&self, assessment_id: &str) -> Result<Option<AnalyticsReport>, AppError>;

    /// Create-or-replace keyed by assessment id.
    async fn upsert_report(&self, report: &AnalyticsReport) -> Result<(), AppError>;

    /// Removes the assessment report and its student reports. Returns whether
    /// anything was removed.
    async fn delete_report(&self, assessment_id: &str) -> Result<bool, AppError>;

    async fn get_student_report(
        &self,
        participant_id: &str,
        attempt_id: &str,
    ) -> Result<Option<StudentAnalyticsReport>, AppError>;

    /// Create-or-replace keyed by (participant id, attempt id).
    async fn upsert_student_report(&self, report: &StudentAnalyticsReport) -> Result<(), AppError>;

    /// Replaces every student report of an assessment with `reports`.
    async fn replace_student_reports(
        &self,
        assessment_id: &str,
        reports: &[StudentAnalyticsReport],
    ) -> Result<(), AppError>;

    async fn list_student_reports(&self, assessment_id: &str) -> Result<Vec<StudentAnalyticsReport>, AppError>;
}
