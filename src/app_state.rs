// Application state management

use crate::config::AppConfig;
use crate::lifecycle::{Clock, EngineSettings, MarketEngine, SystemClock};
use crate::treasury::InMemoryTreasury;
use std::sync::Arc;
use tracing::info;

pub type SharedState = Arc<AppState>;

/// Everything the HTTP handlers need
pub struct AppState {
    pub engine: MarketEngine,
    /// Concrete custody, kept for deposits and balance queries
    pub treasury: Arc<InMemoryTreasury>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        info!("🚀 Initializing pari-mutuel market engine...");
        let settings = EngineSettings::from_config(&config.engine)?;
        let treasury = Arc::new(InMemoryTreasury::new());
        let engine = MarketEngine::new(settings, treasury.clone(), clock);

        info!(
            "✅ Engine ready (resolution authority {}, fee recipient {})",
            engine.settings().resolution_authority,
            engine.settings().fee_recipient
        );
        Ok(Self { engine, treasury })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}
