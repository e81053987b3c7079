// src/analytics/comparative.rs

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::stats;
use crate::{
    error::AppError,
    models::{assessment::Assessment, attempt::AttemptRecord},
    store::RecordAccessor,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarAssessment {
    pub assessment_id: String,
    pub title: String,
    pub completed_attempts: usize,
    pub average_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparativeAnalytics {
    pub similar_assessments: Vec<SimilarAssessment>,
    /// Mean of the similar assessments' average scores.
    pub benchmark_score: f64,
    /// This assessment's average minus the benchmark; 0 without a benchmark.
    pub difference_from_benchmark: f64,
}

/// Benchmarks an assessment against up to `limit` assessments with the same
/// subject and class. The attempts of each similar assessment are loaded
/// concurrently; nothing is written.
pub async fn comparative_analytics(
    records: &dyn RecordAccessor,
    assessment: &Assessment,
    own_average: f64,
    limit: usize,
) -> Result<ComparativeAnalytics, AppError> {
    let (Some(subject), Some(class_name)) = (&assessment.subject, &assessment.class_name) else {
        tracing::debug!(assessment_id = %assessment.id, "No subject/class, skipping benchmark");
        return Ok(ComparativeAnalytics::default());
    };

    let similar = records
        .find_similar_assessments(subject, class_name, &assessment.id, limit)
        .await?;

    let attempts = join_all(similar.iter().map(|s| records.get_attempts(&s.id, None))).await;

    let mut summaries = Vec::with_capacity(similar.len());
    for (other, attempts) in similar.iter().take(limit).zip(attempts) {
        summaries.push(summarize_similar(other, &attempts?));
    }

    Ok(build_comparison(summaries, own_average))
}

pub fn summarize_similar(assessment: &Assessment, attempts: &[AttemptRecord]) -> SimilarAssessment {
    let scores: Vec<f64> = attempts
        .iter()
        .filter(|a| a.is_completed())
        .map(|a| a.score.obtained)
        .collect();

    SimilarAssessment {
        assessment_id: assessment.id.clone(),
        title: assessment.title.clone(),
        completed_attempts: scores.len(),
        average_score: stats::mean(&scores),
    }
}

pub fn build_comparison(similar: Vec<SimilarAssessment>, own_average: f64) -> ComparativeAnalytics {
    if similar.is_empty() {
        return ComparativeAnalytics::default();
    }
    let averages: Vec<f64> = similar.iter().map(|s| s.average_score).collect();
    let benchmark_score = stats::mean(&averages);

    ComparativeAnalytics {
        similar_assessments: similar,
        benchmark_score,
        difference_from_benchmark: own_average - benchmark_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::{AttemptScore, AttemptStatus};
    use crate::store::MemoryStore;

    fn assessment(id: &str, subject: &str, class_name: &str) -> Assessment {
        Assessment {
            id: id.to_string(),
            title: format!("Test {id}"),
            subject: Some(subject.to_string()),
            class_name: Some(class_name.to_string()),
            ..Default::default()
        }
    }

    fn attempt(id: &str, assessment_id: &str, obtained: f64, status: AttemptStatus) -> AttemptRecord {
        AttemptRecord {
            id: id.to_string(),
            assessment_id: assessment_id.to_string(),
            participant_id: format!("p-{id}"),
            status,
            score: AttemptScore { obtained, percentage: obtained, ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn no_similar_assessments_means_zero_benchmark() {
        let comparison = build_comparison(Vec::new(), 72.0);
        assert_eq!(comparison, ComparativeAnalytics::default());
    }

    #[test]
    fn similar_average_ignores_in_progress() {
        let other = assessment("t2", "Physics", "11");
        let attempts = vec![
            attempt("a1", "t2", 40.0, AttemptStatus::Completed),
            attempt("a2", "t2", 80.0, AttemptStatus::Completed),
            attempt("a3", "t2", 0.0, AttemptStatus::InProgress),
        ];
        let summary = summarize_similar(&other, &attempts);
        assert_eq!(summary.completed_attempts, 2);
        assert_eq!(summary.average_score, 60.0);
    }

    #[tokio::test]
    async fn benchmarks_against_same_subject_and_class() {
        let store = MemoryStore::new();
        let target = assessment("t1", "Physics", "11");
        store.insert_assessment(target.clone()).await;
        store.insert_assessment(assessment("t2", "Physics", "11")).await;
        store.insert_assessment(assessment("t3", "Physics", "11")).await;
        store.insert_assessment(assessment("t4", "Chemistry", "11")).await;
        store.insert_assessment(assessment("t5", "Physics", "12")).await;

        for (id, test, score) in [("a1", "t2", 50.0), ("a2", "t2", 70.0), ("a3", "t3", 90.0), ("a4", "t4", 10.0)] {
            store.insert_attempt(attempt(id, test, score, AttemptStatus::Completed)).await;
        }

        let comparison = comparative_analytics(&store, &target, 80.0, 5).await.unwrap();
        let ids: Vec<&str> = comparison
            .similar_assessments
            .iter()
            .map(|s| s.assessment_id.as_str())
            .collect();
        assert_eq!(ids, vec!["t2", "t3"]);
        assert_eq!(comparison.benchmark_score, 75.0);
        assert_eq!(comparison.difference_from_benchmark, 5.0);
    }

    #[tokio::test]
    async fn similar_assessments_are_capped_by_limit() {
        let store = MemoryStore::new();
        let target = assessment("t0", "Maths", "10");
        store.insert_assessment(target.clone()).await;
        for i in 1..=8 {
            store.insert_assessment(assessment(&format!("t{i}"), "Maths", "10")).await;
        }

        let comparison = comparative_analytics(&store, &target, 0.0, 5).await.unwrap();
        assert_eq!(comparison.similar_assessments.len(), 5);
        assert!(comparison.similar_assessments.iter().all(|s| s.assessment_id != "t0"));
    }
}
