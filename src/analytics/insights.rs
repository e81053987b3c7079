// src/analytics/insights.rs

use serde::{Deserialize, Serialize};

use super::{basic::BasicStats, time::TimeAnalytics};
use crate::config::{
    HIGH_AVERAGE_SCORE, HIGH_TIME_STD_DEV_MINUTES, LOW_AVERAGE_SCORE, LOW_COMPLETION_RATE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Warning,
    Alert,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
    /// The metric that triggered the rule.
    pub value: f64,
}

/// Rule-based insights for an assessment. Each rule is evaluated
/// independently, so the result depends only on the numbers passed in.
pub fn assessment_insights(basic: &BasicStats, time: &TimeAnalytics) -> Vec<Insight> {
    let mut insights = Vec::new();

    if basic.completion_rate < LOW_COMPLETION_RATE {
        insights.push(Insight {
            kind: InsightKind::Warning,
            title: "Low Completion Rate".to_string(),
            message: format!(
                "Only {:.1}% of attempts were completed. Check the assessment length and difficulty.",
                basic.completion_rate
            ),
            value: basic.completion_rate,
        });
    }

    if basic.average_score < LOW_AVERAGE_SCORE {
        insights.push(Insight {
            kind: InsightKind::Alert,
            title: "Low Average Score".to_string(),
            message: format!(
                "The average score is {:.1}. Participants may need more preparation on this material.",
                basic.average_score
            ),
            value: basic.average_score,
        });
    }

    if basic.average_score > HIGH_AVERAGE_SCORE {
        insights.push(Insight {
            kind: InsightKind::Success,
            title: "High Performance".to_string(),
            message: format!(
                "The average score is {:.1}. Consider raising the difficulty level.",
                basic.average_score
            ),
            value: basic.average_score,
        });
    }

    if time.std_dev_minutes > HIGH_TIME_STD_DEV_MINUTES {
        insights.push(Insight {
            kind: InsightKind::Info,
            title: "High Time Variance".to_string(),
            message: format!(
                "Completion times vary by {:.1} minutes (standard deviation).",
                time.std_dev_minutes
            ),
            value: time.std_dev_minutes,
        });
    }

    insights
}
