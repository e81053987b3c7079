// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Marks credited for a correct answer when the question carries no marking scheme.
pub const DEFAULT_QUESTION_MARKS: f64 = 4.0;

/// Maximum number of similar assessments used for benchmarking.
pub const SIMILAR_ASSESSMENT_LIMIT: usize = 5;

/// Subject accuracy thresholds (percent) for strength levels.
pub const EXCELLENT_ACCURACY: f64 = 85.0;
pub const STRONG_ACCURACY: f64 = 70.0;
pub const AVERAGE_ACCURACY: f64 = 50.0;

/// Exam readiness requires both values to be strictly exceeded.
pub const READINESS_ACCURACY: f64 = 75.0;
pub const READINESS_TIME_EFFICIENCY: f64 = 80.0;

/// Answer timing thresholds (seconds) for error classification.
pub const CARELESS_ANSWER_SECONDS: f64 = 30.0;
pub const TIME_PRESSURE_ANSWER_SECONDS: f64 = 300.0;

/// Assessment-level insight thresholds.
pub const LOW_COMPLETION_RATE: f64 = 70.0;
pub const LOW_AVERAGE_SCORE: f64 = 50.0;
pub const HIGH_AVERAGE_SCORE: f64 = 85.0;
pub const HIGH_TIME_STD_DEV_MINUTES: f64 = 60.0;

/// Upper bound for the rankings endpoint's `limit` parameter.
pub const MAX_RANKING_ROWS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub listen_port: u16,
    pub similar_assessment_limit: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let listen_port = env::var("LISTEN_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let similar_assessment_limit = env::var("SIMILAR_ASSESSMENT_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(SIMILAR_ASSESSMENT_LIMIT);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            listen_port,
            similar_assessment_limit,
        }
    }
}
