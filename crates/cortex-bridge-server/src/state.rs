use std::sync::Arc;

use cortex_bridge::providers::base::AuthTokenProvider;
use cortex_bridge::providers::configs::CortexProviderConfig;

use crate::configuration::CortexSettings;
use crate::interactive::PendingToolAnswers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provider_config: CortexProviderConfig,
    pub tokens: Arc<dyn AuthTokenProvider>,
    pub answers: Arc<PendingToolAnswers>,
}

impl AppState {
    pub fn new(settings: CortexSettings) -> Self {
        let (provider_config, tokens) = settings.into_parts();
        Self {
            provider_config,
            tokens: Arc::new(tokens),
            answers: Arc::new(PendingToolAnswers::new()),
        }
    }
}
