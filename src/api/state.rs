use std::sync::Arc;

use crate::services::RecommendationService;

/// Shared application state
///
/// The recommendation service is constructed once at startup and
/// handed to every request handler by reference.
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
}

impl AppState {
    pub fn new(recommendations: Arc<RecommendationService>) -> Self {
        Self { recommendations }
    }
}
