use std::sync::Arc;

use parley_core::{ChatGateway, GatewayConfig};
use parley_upstream::{ThreadBackend, UpstreamClient};

mod http;

pub use http::{app_router, serve};

#[derive(Clone)]
pub struct AppState {
    /// None when no upstream credential is configured. Health and config
    /// stay available; every action answers 500 until a key is provided.
    pub gateway: Option<Arc<ChatGateway>>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let gateway = config.api_key.as_deref().map(|key| {
            let backend: Arc<dyn ThreadBackend> =
                Arc::new(UpstreamClient::new(&config.base_url, key));
            Arc::new(ChatGateway::new(backend, &config))
        });
        Self {
            gateway,
            config: Arc::new(config),
        }
    }
}
