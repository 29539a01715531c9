use crate::config::AppConfig;
use crate::error::ProxyError;
use crate::routing::dispatch::Dispatcher;

/// Shared application state accessible to all handlers.
#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub dispatcher: Dispatcher,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Build the state, including the upstream HTTP client, from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] when the HTTP client cannot be built.
    pub fn from_config(config: AppConfig) -> Result<Self, ProxyError> {
        let dispatcher = Dispatcher::from_config(config.upstream.clone())?;
        Ok(Self::new(config, dispatcher))
    }

    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.config.server.max_body_bytes
    }
}
