use std::sync::Arc;

use crate::{
    analytics::materializer::ReportMaterializer,
    config::Config,
    store::{RecordAccessor, ReportStore},
};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub analytics: Arc<ReportMaterializer>,
    pub config: Config,
}

impl AppState {
    /// Wires the materializer to the given stores.
    pub fn new(
        records: Arc<dyn RecordAccessor>,
        reports: Arc<dyn ReportStore>,
        config: Config,
    ) -> Self {
        let analytics = ReportMaterializer::new(records, reports, config.similar_assessment_limit);
        Self {
            analytics: Arc::new(analytics),
            config,
        }
    }
}

impl FromRef<AppState> for Arc<ReportMaterializer> {
    fn from_ref(state: &AppState) -> Self {
        state.analytics.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
