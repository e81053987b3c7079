// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{analytics, health},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Analytics routes sit behind the auth and admin middleware.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let analytics_routes = Router::new()
        .route(
            "/assessments/{id}",
            get(analytics::get_assessment_analytics).delete(analytics::delete_assessment_analytics),
        )
        .route("/assessments/{id}/status", get(analytics::get_report_status))
        .route("/assessments/{id}/rankings", get(analytics::get_rankings))
        .route("/assessments/{id}/students", get(analytics::list_student_reports))
        .route(
            "/participants/{participant_id}/attempts/{attempt_id}",
            get(analytics::get_participant_report),
        )
        // Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/admin/analytics", analytics_routes)
        // Global Middleware (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, store::MemoryStore, utils::jwt::sign_jwt};

    fn app() -> Router {
        let config = Config {
            database_url: String::new(),
            jwt_secret: "router-secret".to_string(),
            rust_log: "error".to_string(),
            listen_port: 0,
            similar_assessment_limit: 5,
        };
        let store = Arc::new(MemoryStore::new());
        create_router(AppState::new(store.clone(), store, config))
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let response = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_of_unknown_assessment_is_absent() {
        let token = sign_jwt("admin-1", "admin", "router-secret", 60).unwrap();
        let request = Request::get("/api/admin/analytics/assessments/nothing/status")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn analytics_routes_reject_missing_token() {
        let response = app()
            .oneshot(
                Request::get("/api/admin/analytics/assessments/a1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
