pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::infra::store::GraphStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GraphStore>,
    pub paseto_access_key: [u8; 32],
    pub default_page_limit: i64,
    pub max_page_limit: i64,
}

impl AppState {
    pub fn new(store: Arc<dyn GraphStore>, config: &AppConfig) -> Self {
        Self {
            store,
            paseto_access_key: config.paseto_access_key,
            default_page_limit: config.default_page_limit,
            max_page_limit: config.max_page_limit,
        }
    }
}
