// src/models/report.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{
    basic::BasicStats,
    comparative::ComparativeAnalytics,
    distribution::{AttemptOutcome, GroupBreakdown, ScoreBucket},
    insights::Insight,
    items::QuestionAnalytics,
    ranking::RankingRow,
    recommendations::{ErrorAnalysis, StudyRecommendation, SubjectPerformance},
    subject_marks::SubjectMarksMap,
    time::TimeAnalytics,
};

/// Lifecycle of a materialized report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportState {
    Absent,
    Computing,
    Materialized,
}

/// Assessment-scoped aggregate, keyed by assessment id.
///
/// Always rebuilt as a whole from the attempts; never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub assessment_id: String,
    pub assessment_title: String,
    pub basic: BasicStats,
    pub time: TimeAnalytics,
    pub score_distribution: Vec<ScoreBucket>,
    pub subject_breakdown: BTreeMap<String, GroupBreakdown>,
    pub chapter_breakdown: BTreeMap<String, GroupBreakdown>,
    pub difficulty_breakdown: BTreeMap<String, GroupBreakdown>,
    pub question_analytics: Vec<QuestionAnalytics>,
    pub rankings: Vec<RankingRow>,
    pub comparative: ComparativeAnalytics,
    pub insights: Vec<Insight>,
    pub last_calculated: DateTime<Utc>,
}

impl AnalyticsReport {
    /// Report with every aggregate zeroed, served when computation fails.
    pub fn empty(assessment_id: &str) -> Self {
        Self {
            assessment_id: assessment_id.to_string(),
            assessment_title: String::new(),
            basic: BasicStats::default(),
            time: TimeAnalytics::default(),
            score_distribution: crate::analytics::distribution::score_distribution(&[]),
            subject_breakdown: BTreeMap::new(),
            chapter_breakdown: BTreeMap::new(),
            difficulty_breakdown: BTreeMap::new(),
            question_analytics: Vec::new(),
            rankings: Vec::new(),
            comparative: ComparativeAnalytics::default(),
            insights: Vec::new(),
            last_calculated: Utc::now(),
        }
    }
}

/// Headline figures of one attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallPerformance {
    pub score: f64,
    pub percentage: f64,
    pub rank: usize,
    pub percentile: f64,
    pub total_participants: usize,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    pub accuracy: f64,
    pub elapsed_seconds: i64,
    pub subject_marks: SubjectMarksMap,
}

/// Diagnostic for one completed attempt, keyed by (participant, attempt).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnalyticsReport {
    pub participant_id: String,
    pub attempt_id: String,
    pub assessment_id: String,
    pub overall: OverallPerformance,
    pub subject_analysis: BTreeMap<String, SubjectPerformance>,
    pub chapter_analysis: BTreeMap<String, GroupBreakdown>,
    pub difficulty_analysis: BTreeMap<String, GroupBreakdown>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<StudyRecommendation>,
    pub error_analysis: ErrorAnalysis,
    pub average_accuracy: f64,
    pub time_efficiency: f64,
    pub exam_readiness: bool,
    pub generated_at: DateTime<Utc>,
}

impl StudentAnalyticsReport {
    /// Report with every figure zeroed, served when computation fails.
    pub fn empty(participant_id: &str, attempt_id: &str, assessment_id: &str) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            attempt_id: attempt_id.to_string(),
            assessment_id: assessment_id.to_string(),
            overall: OverallPerformance::default(),
            subject_analysis: BTreeMap::new(),
            chapter_analysis: BTreeMap::new(),
            difficulty_analysis: BTreeMap::new(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
            error_analysis: ErrorAnalysis::default(),
            average_accuracy: 0.0,
            time_efficiency: 0.0,
            exam_readiness: false,
            generated_at: Utc::now(),
        }
    }
}

/// Zeroed report attached to a computation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FallbackReport {
    Assessment(AnalyticsReport),
    Student(StudentAnalyticsReport),
}

impl FallbackReport {
    pub fn assessment_id(&self) -> &str {
        match self {
            FallbackReport::Assessment(report) => &report.assessment_id,
            FallbackReport::Student(report) => &report.assessment_id,
        }
    }
}

/// Response body for the report state query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatusResponse {
    pub assessment_id: String,
    pub state: ReportState,
    pub last_calculated: Option<DateTime<Utc>>,
}
