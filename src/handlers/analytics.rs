// src/handlers/analytics.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    analytics::materializer::ReportMaterializer,
    config::MAX_RANKING_ROWS,
    error::AppError,
    models::report::ReportStatusResponse,
};

/// `?regenerate=true` forces recomputation; otherwise cached reports are served.
#[derive(Debug, Default, Deserialize)]
pub struct RegenerateParams {
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RankingParams {
    #[validate(range(min = 1, max = MAX_RANKING_ROWS, message = "limit must be between 1 and 500"))]
    pub limit: Option<u64>,
}

/// Returns the analytics report of an assessment.
/// Admin only.
pub async fn get_assessment_analytics(
    State(analytics): State<Arc<ReportMaterializer>>,
    Path(assessment_id): Path<String>,
    Query(params): Query<RegenerateParams>,
) -> Result<impl IntoResponse, AppError> {
    let report = analytics
        .compute_assessment_analytics(&assessment_id, params.regenerate)
        .await?;

    Ok(Json(report))
}

/// Drops the cached reports of an assessment, student reports included.
/// 404 only when nothing was cached.
/// Admin only.
pub async fn delete_assessment_analytics(
    State(analytics): State<Arc<ReportMaterializer>>,
    Path(assessment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !analytics.invalidate(&assessment_id).await? {
        return Err(AppError::NotFound("No cached analytics for this assessment".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Reports whether the assessment report is absent, computing or materialized.
/// Admin only.
pub async fn get_report_status(
    State(analytics): State<Arc<ReportMaterializer>>,
    Path(assessment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (state, last_calculated) = analytics.report_state(&assessment_id).await?;

    Ok(Json(ReportStatusResponse {
        assessment_id,
        state,
        last_calculated,
    }))
}

/// Leaderboard rows of an assessment, computed on demand if no report exists.
/// Admin only.
pub async fn get_rankings(
    State(analytics): State<Arc<ReportMaterializer>>,
    Path(assessment_id): Path<String>,
    Query(params): Query<RankingParams>,
) -> Result<impl IntoResponse, AppError> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let report = analytics
        .compute_assessment_analytics(&assessment_id, false)
        .await?;

    let limit = params.limit.map_or(usize::MAX, |l| l as usize);
    let rows: Vec<_> = report.rankings.into_iter().take(limit).collect();

    Ok(Json(rows))
}

/// Materialized student reports of an assessment.
/// Admin only.
pub async fn list_student_reports(
    State(analytics): State<Arc<ReportMaterializer>>,
    Path(assessment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let reports = analytics.student_reports(&assessment_id).await?;

    Ok(Json(reports))
}

/// Diagnostic report for one participant's attempt.
/// Admin only.
pub async fn get_participant_report(
    State(analytics): State<Arc<ReportMaterializer>>,
    Path((participant_id, attempt_id)): Path<(String, String)>,
    Query(params): Query<RegenerateParams>,
) -> Result<impl IntoResponse, AppError> {
    let report = analytics
        .compute_participant_report(&participant_id, &attempt_id, params.regenerate)
        .await?;

    Ok(Json(report))
}
