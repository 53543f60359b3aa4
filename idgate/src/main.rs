//! Gateway entry point

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use idgate::{
    build_provider, config::Config, error::Result, handlers::AppState, login::LoginFlow,
    observability, router, tokens::TokenIssuer, MemoryStateStore, Server,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    observability::init_tracing(&config)?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.oauth.http_timeout_secs))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| idgate::Error::Internal(format!("failed to build HTTP client: {e}")))?;

    let issuer = TokenIssuer::new(&config.tokens)?;

    let mut flows = HashMap::new();
    for (key, provider_config) in &config.oauth.providers {
        let provider = build_provider(key, provider_config, http.clone())?;
        tracing::info!(provider = %key, "registered oauth provider");
        flows.insert(key.clone(), LoginFlow::new(provider, issuer.clone()));
    }

    let state = AppState {
        flows: Arc::new(flows),
        states: Arc::new(MemoryStateStore::new(Duration::from_secs(
            config.oauth.state_ttl_secs,
        ))),
        frontend_url: config.frontend.redirect_url.clone(),
    };

    let app = router(state);
    Server::new(config).serve(app).await
}
