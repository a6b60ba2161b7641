use std::sync::Arc;

use crate::config::Config;
use crate::store::{CustomerStore, JobStore, Stores};

/// Shared application state injected into all route handlers via Axum extractors.
/// Store handles are built once by the composition root and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(stores: Stores, config: Config) -> Self {
        AppState {
            jobs: stores.jobs,
            customers: stores.customers,
            config,
        }
    }
}
