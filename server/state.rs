use std::sync::Arc;

use food_aesthetics::{Scorer, ServiceConfig};

/// Everything a request handler needs.  Read-only after startup apart from
/// the scorer's one-time model install, so no lock is involved.
pub struct AppState {
    pub scorer: Scorer,
    pub config: ServiceConfig,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        AppState {
            scorer: Scorer::new(config.scorer_config()),
            config,
        }
    }
}

/// Shared state type — an `Arc<AppState>` passed to every handler.
pub type SharedState = Arc<AppState>;
