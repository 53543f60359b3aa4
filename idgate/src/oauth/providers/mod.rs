//! Built-in OAuth provider implementations
//!
//! Each provider implements [`OAuthProvider`] and is selected by its
//! configuration key; the request path never branches on provider names.

mod google;
mod naver;

use std::sync::Arc;

pub use google::GoogleProvider;
pub use naver::NaverProvider;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::oauth::provider::OAuthProvider;

/// Build a provider implementation for a configuration key
///
/// Unknown keys are a configuration error, caught at startup rather than
/// on the first login attempt.
pub fn build_provider(
    key: &str,
    config: &ProviderConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn OAuthProvider>, Error> {
    match key {
        "google" => Ok(Arc::new(GoogleProvider::new(config, http)?)),
        "naver" => Ok(Arc::new(NaverProvider::new(config, http)?)),
        other => Err(Error::config(format!(
            "unknown oauth provider \"{other}\" (supported: google, naver)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "https://example.com/cb".to_string(),
            authorize_uri: "https://example.com/authorize".to_string(),
            token_uri: "https://example.com/token".to_string(),
            userinfo_uri: "https://example.com/userinfo".to_string(),
            scopes: vec![],
        }
    }

    #[test]
    fn test_build_known_providers() {
        let http = reqwest::Client::new();
        let google = build_provider("google", &test_config(), http.clone()).unwrap();
        assert_eq!(google.name(), "google");
        let naver = build_provider("naver", &test_config(), http).unwrap();
        assert_eq!(naver.name(), "naver");
    }

    #[test]
    fn test_build_unknown_provider_fails() {
        let err = build_provider("kakao", &test_config(), reqwest::Client::new())
            .err()
            .unwrap();
        assert!(err.to_string().contains("kakao"));
    }
}
