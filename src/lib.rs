pub mod config;
pub mod error;
pub mod oauth;
pub mod web;

use crate::config::Config;
use crate::oauth::AuthBroker;

use std::sync::Arc;

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub broker: Arc<AuthBroker>,
}

impl AppState {
    pub fn new(config: Arc<Config>, broker: Arc<AuthBroker>) -> Self {
        Self { config, broker }
    }

    /// State wired to Google and the storage backend named in `config`.
    pub fn from_config(config: Config) -> Self {
        let broker = Arc::new(AuthBroker::from_config(&config));
        Self::new(Arc::new(config), broker)
    }
}
