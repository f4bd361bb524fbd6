use std::{fmt, sync::Arc};

use crate::{
    config::PanelConfig,
    engine::EngineHandle,
    metrics::{MetricsHandle, noop_metrics},
    store::LabelStore,
};

/// Process-wide dependencies, built once at startup and passed to every component.
///
/// Cloning is cheap; clones share the same label store.
#[derive(Clone)]
pub struct Context {
    engine: EngineHandle,
    store: LabelStore,
    config: Arc<PanelConfig>,
    metrics: MetricsHandle,
}

impl Context {
    pub fn new(engine: EngineHandle, config: PanelConfig, metrics: MetricsHandle) -> Self {
        let store = LabelStore::new(engine.clone(), metrics.clone());
        Self {
            engine,
            store,
            config: Arc::new(config),
            metrics,
        }
    }

    /// Context with default config and no metrics.
    pub fn with_engine(engine: EngineHandle) -> Self {
        Self::new(engine, PanelConfig::default(), noop_metrics())
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn store(&self) -> &LabelStore {
        &self.store
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("engine_url", &self.config.engine_url)
            .field("observed", &self.store.is_observed())
            .field("metrics", &"<handle>")
            .finish()
    }
}
