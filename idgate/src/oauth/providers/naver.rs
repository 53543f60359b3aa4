//! Naver OAuth provider implementation

use async_trait::async_trait;
use url::Url;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::oauth::exchange::exchange_authorization_code;
use crate::oauth::profile::fetch_userinfo;
use crate::oauth::provider::{OAuthProvider, ProviderProfile, ProviderTokens};

/// Naver OAuth provider
///
/// Naver wraps the profile in a `response` object and controls the granted
/// fields through app settings rather than a scope parameter.
/// `auth_type=reprompt` forces the consent screen on every grant.
#[derive(Clone)]
pub struct NaverProvider {
    config: ProviderConfig,
    authorize_url: Url,
    http: reqwest::Client,
}

impl NaverProvider {
    /// Create a new Naver provider from configuration
    pub fn new(config: &ProviderConfig, http: reqwest::Client) -> Result<Self, Error> {
        config.validate("naver")?;

        let authorize_url = Url::parse(&config.authorize_uri)
            .map_err(|e| Error::config(format!("naver: invalid authorize_uri: {e}")))?;

        Ok(Self {
            config: config.clone(),
            authorize_url,
            http,
        })
    }
}

#[async_trait]
impl OAuthProvider for NaverProvider {
    fn name(&self) -> &str {
        "naver"
    }

    fn authorization_url(&self, state: &str) -> String {
        let mut url = self.authorize_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("state", state)
                .append_pair("auth_type", "reprompt");
            if !self.config.scopes.is_empty() {
                pairs.append_pair("scope", &self.config.scopes.join(" "));
            }
        }
        url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, Error> {
        exchange_authorization_code(&self.http, "naver", &self.config, code).await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, Error> {
        let body = fetch_userinfo(
            &self.http,
            "naver",
            &self.config.userinfo_uri,
            access_token,
        )
        .await?;

        map_profile(&body)
    }
}

fn map_profile(body: &serde_json::Value) -> Result<ProviderProfile, Error> {
    let response = &body["response"];
    let id = response["id"].as_str().ok_or_else(|| Error::Profile {
        provider: "naver".to_string(),
        status: None,
        detail: "missing response.id in userinfo response".to_string(),
    })?;

    Ok(ProviderProfile {
        provider: "naver".to_string(),
        id: id.to_string(),
        email: response["email"].as_str().map(|s| s.to_string()),
        name: response["name"]
            .as_str()
            .or(response["nickname"].as_str())
            .map(|s| s.to_string()),
        given_name: None,
        family_name: None,
        picture: response["profile_image"].as_str().map(|s| s.to_string()),
        locale: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            client_id: "naver-client".to_string(),
            client_secret: "naver-secret".to_string(),
            redirect_uri: "https://example.com/auth/naver/callback".to_string(),
            authorize_uri: "https://nid.naver.com/oauth2.0/authorize".to_string(),
            token_uri: "https://nid.naver.com/oauth2.0/token".to_string(),
            userinfo_uri: "https://openapi.naver.com/v1/nid/me".to_string(),
            scopes: vec![],
        }
    }

    #[test]
    fn test_authorization_url_contents() {
        let provider = NaverProvider::new(&test_config(), reqwest::Client::new()).unwrap();
        let url = provider.authorization_url("abc123");

        assert!(url.starts_with("https://nid.naver.com/oauth2.0/authorize?"));
        assert!(url.contains("client_id=naver-client"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("auth_type=reprompt"));
        // Scope omitted by default; Naver grants are set per-app
        assert!(!url.contains("scope="));
    }

    #[test]
    fn test_provider_name() {
        let provider = NaverProvider::new(&test_config(), reqwest::Client::new()).unwrap();
        assert_eq!(provider.name(), "naver");
    }

    #[test]
    fn test_map_profile_nested_response() {
        let body = serde_json::json!({
            "resultcode": "00",
            "message": "success",
            "response": {
                "id": "naver-uid-42",
                "email": "user@naver.com",
                "nickname": "nick",
                "profile_image": "https://phinf.naver.net/pic.png"
            }
        });

        let profile = map_profile(&body).unwrap();
        assert_eq!(profile.provider, "naver");
        assert_eq!(profile.id, "naver-uid-42");
        assert_eq!(profile.email.as_deref(), Some("user@naver.com"));
        // Falls back to nickname when name is absent
        assert_eq!(profile.name.as_deref(), Some("nick"));
        assert_eq!(
            profile.picture.as_deref(),
            Some("https://phinf.naver.net/pic.png")
        );
        assert!(profile.given_name.is_none());
        assert!(profile.locale.is_none());
    }

    #[test]
    fn test_map_profile_missing_id() {
        let body = serde_json::json!({"response": {"email": "user@naver.com"}});
        let err = map_profile(&body).unwrap_err();
        assert!(matches!(err, Error::Profile { .. }));
    }
}
