//! Application state.

use std::sync::Arc;

use vgist_acquire::{AcquireConfig, Orchestrator};
use vgist_media::SelectorConfig;

use crate::cache::DigestCache;
use crate::config::ApiConfig;
use crate::groq::GroqClient;
use crate::pipeline::JobDriver;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub cache: Arc<DigestCache>,
    pub driver: Arc<JobDriver>,
    pub groq: GroqClient,
}

impl AppState {
    /// Create new application state from the environment.
    pub fn new(config: ApiConfig) -> Self {
        let acquire_config = AcquireConfig::from_env();
        let work_dir = acquire_config.work_dir.clone();
        let orchestrator = Arc::new(Orchestrator::new(acquire_config));

        let groq = GroqClient::new(config.groq_api_key.clone());
        let driver = Arc::new(JobDriver::new(
            &config,
            orchestrator,
            SelectorConfig::from_env(),
            groq.clone(),
            work_dir,
        ));

        let cache = Arc::new(DigestCache::new(config.cache_dir.clone()));

        Self {
            config,
            cache,
            driver,
            groq,
        }
    }
}
