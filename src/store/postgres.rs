// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool, types::Json};

use super::{RecordAccessor, ReportStore};
use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, Participant},
        attempt::{AttemptRecord, AttemptStatus},
        report::{AnalyticsReport, StudentAnalyticsReport},
    },
};

/// Postgres-backed implementation of both storage seams.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw 'attempts' row. The JSON columns are decoded leniently so that one
/// malformed document degrades to defaults instead of failing the query.
#[derive(FromRow)]
struct AttemptRow {
    id: String,
    assessment_id: String,
    participant_id: String,
    attempt_number: i32,
    status: String,
    answers: Json<Value>,
    score: Json<Value>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    time_spent: Option<i64>,
    subject_analysis: Option<Json<Value>>,
    extra: Json<Value>,
}

impl From<AttemptRow> for AttemptRecord {
    fn from(row: AttemptRow) -> Self {
        let answers = serde_json::from_value(row.answers.0).unwrap_or_else(|e| {
            tracing::warn!(attempt_id = %row.id, "Unreadable answers, treating as empty: {}", e);
            Vec::new()
        });
        let score = serde_json::from_value(row.score.0).unwrap_or_else(|e| {
            tracing::warn!(attempt_id = %row.id, "Unreadable score, treating as zero: {}", e);
            Default::default()
        });
        let extra = match row.extra.0 {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        AttemptRecord {
            id: row.id,
            assessment_id: row.assessment_id,
            participant_id: row.participant_id,
            attempt_number: row.attempt_number,
            status: AttemptStatus::parse(&row.status),
            answers,
            score,
            start_time: row.start_time,
            end_time: row.end_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
            time_spent: row.time_spent,
            subject_analysis: row.subject_analysis.map(|j| j.0),
            extra,
        }
    }
}

const ATTEMPT_COLUMNS: &str = "id, assessment_id, participant_id, attempt_number, status, \
     answers, score, start_time, end_time, created_at, updated_at, time_spent, \
     subject_analysis, extra";

const ASSESSMENT_COLUMNS: &str = "id, title, subject, class, duration_minutes, questions, created_at";

#[async_trait]
impl RecordAccessor for PgStore {
    async fn get_assessment(&self, assessment_id: &str) -> Result<Option<Assessment>, AppError> {
        let assessment = sqlx::query_as::<_, Assessment>(&format!(
            "SELECT {} FROM assessments WHERE id = $1",
            ASSESSMENT_COLUMNS
        ))
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch assessment: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(assessment)
    }

    async fn get_attempts(
        &self,
        assessment_id: &str,
        participant_id: Option<&str>,
    ) -> Result<Vec<AttemptRecord>, AppError> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            r#"
            SELECT {}
            FROM attempts
            WHERE assessment_id = $1
              AND ($2::TEXT IS NULL OR participant_id = $2)
            ORDER BY created_at ASC NULLS FIRST, id ASC
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(assessment_id)
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch attempts: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(rows.into_iter().map(AttemptRecord::from).collect())
    }

    async fn get_attempt(&self, attempt_id: &str) -> Result<Option<AttemptRecord>, AppError> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AttemptRecord::from))
    }

    async fn find_similar_assessments(
        &self,
        subject: &str,
        class_name: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<Assessment>, AppError> {
        let assessments = sqlx::query_as::<_, Assessment>(&format!(
            r#"
            SELECT {}
            FROM assessments
            WHERE subject = $1 AND class = $2 AND id <> $3
            ORDER BY created_at DESC NULLS LAST, id ASC
            LIMIT $4
            "#,
            ASSESSMENT_COLUMNS
        ))
        .bind(subject)
        .bind(class_name)
        .bind(exclude_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(assessments)
    }

    async fn get_participants(&self, participant_ids: &[String]) -> Result<Vec<Participant>, AppError> {
        if participant_ids.is_empty() {
            return Ok(Vec::new());
        }

        let participants = sqlx::query_as::<_, Participant>(
            "SELECT id, name, email FROM participants WHERE id = ANY($1)",
        )
        .bind(participant_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn get_report(&self, assessment_id: &str) -> Result<Option<AnalyticsReport>, AppError> {
        let report = sqlx::query_scalar::<_, Json<AnalyticsReport>>(
            "SELECT report FROM analytics_reports WHERE assessment_id = $1",
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(report.map(|r| r.0))
    }

    async fn upsert_report(&self, report: &AnalyticsReport) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO analytics_reports (assessment_id, report, last_calculated)
            VALUES ($1, $2, $3)
            ON CONFLICT (assessment_id) DO UPDATE SET
                report = EXCLUDED.report,
                last_calculated = EXCLUDED.last_calculated
            "#,
        )
        .bind(&report.assessment_id)
        .bind(Json(report))
        .bind(report.last_calculated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert analytics report: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(())
    }

    async fn delete_report(&self, assessment_id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let students = sqlx::query("DELETE FROM student_analytics_reports WHERE assessment_id = $1")
            .bind(assessment_id)
            .execute(&mut *tx)
            .await?;

        let report = sqlx::query("DELETE FROM analytics_reports WHERE assessment_id = $1")
            .bind(assessment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(students.rows_affected() + report.rows_affected() > 0)
    }

    async fn get_student_report(
        &self,
        participant_id: &str,
        attempt_id: &str,
    ) -> Result<Option<StudentAnalyticsReport>, AppError> {
        let report = sqlx::query_scalar::<_, Json<StudentAnalyticsReport>>(
            "SELECT report FROM student_analytics_reports WHERE participant_id = $1 AND attempt_id = $2",
        )
        .bind(participant_id)
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(report.map(|r| r.0))
    }

    async fn upsert_student_report(&self, report: &StudentAnalyticsReport) -> Result<(), AppError> {
        insert_student_report(&self.pool, report).await
    }

    async fn replace_student_reports(
        &self,
        assessment_id: &str,
        reports: &[StudentAnalyticsReport],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM student_analytics_reports WHERE assessment_id = $1")
            .bind(assessment_id)
            .execute(&mut *tx)
            .await?;

        for report in reports {
            insert_student_report(&mut *tx, report).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_student_reports(&self, assessment_id: &str) -> Result<Vec<StudentAnalyticsReport>, AppError> {
        let reports = sqlx::query_scalar::<_, Json<StudentAnalyticsReport>>(
            r#"
            SELECT report
            FROM student_analytics_reports
            WHERE assessment_id = $1
            ORDER BY participant_id, attempt_id
            "#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reports.into_iter().map(|r| r.0).collect())
    }
}

async fn insert_student_report<'e, E>(executor: E, report: &StudentAnalyticsReport) -> Result<(), AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO student_analytics_reports
            (participant_id, attempt_id, assessment_id, report, generated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (participant_id, attempt_id) DO UPDATE SET
            assessment_id = EXCLUDED.assessment_id,
            report = EXCLUDED.report,
            generated_at = EXCLUDED.generated_at
        "#,
    )
    .bind(&report.participant_id)
    .bind(&report.attempt_id)
    .bind(&report.assessment_id)
    .bind(Json(report))
    .bind(report.generated_at)
    .execute(executor)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert student report: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(())
}
