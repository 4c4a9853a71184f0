//! Application state.

use std::sync::Arc;

use vsight_engine_client::{AnalysisEngine, EngineClient};

use crate::config::{ApiConfig, TamperingSettings};
use crate::pipeline::AnalysisPipeline;
use crate::services::{PlatformClient, Services};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: AnalysisPipeline,
    pub engine: Arc<dyn AnalysisEngine>,
}

impl AppState {
    /// Wire the pipeline to the given collaborators.
    pub fn with_parts(
        config: ApiConfig,
        services: Services,
        engine: Arc<dyn AnalysisEngine>,
        settings: TamperingSettings,
    ) -> Self {
        let pipeline = AnalysisPipeline::new(services, Arc::clone(&engine), settings);
        Self {
            config,
            pipeline,
            engine,
        }
    }

    /// Create application state from the environment.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let engine: Arc<dyn AnalysisEngine> = Arc::new(EngineClient::from_env()?);
        let platform = PlatformClient::from_env()?;

        Ok(Self::with_parts(
            config,
            Services::platform(platform),
            engine,
            TamperingSettings::from_env(),
        ))
    }
}
