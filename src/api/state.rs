use std::sync::Arc;

use crate::analysis::AnalysisService;

#[derive(Clone, Default)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
}

impl AppState {
    pub fn new(service: AnalysisService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
