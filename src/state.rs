use crate::config::ServerConfig;
use crate::render::RenderOptions;
use crate::results::ResultsStore;
use std::sync::Arc;

/// Shared, immutable service state: the startup configuration and what is derived from it.
pub struct AppState {
    config: Arc<ServerConfig>,
    results: ResultsStore,
    render_options: RenderOptions,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let results = ResultsStore::new(config.results_dir.clone());
        let render_options = RenderOptions {
            hyperlink_mode: config.hyperlink_mode,
            link_convention: config.link_convention,
        };
        Self {
            config,
            results,
            render_options,
        }
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn results(&self) -> &ResultsStore {
        &self.results
    }

    pub fn render_options(&self) -> RenderOptions {
        self.render_options
    }
}
