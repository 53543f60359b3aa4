//! Google OAuth provider implementation

use async_trait::async_trait;
use url::Url;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::oauth::exchange::exchange_authorization_code;
use crate::oauth::profile::fetch_userinfo;
use crate::oauth::provider::{OAuthProvider, ProviderProfile, ProviderTokens};

/// Google OAuth provider
///
/// Requests `access_type=offline` and `prompt=consent` so Google issues a
/// refresh token on every grant, not just the first one.
#[derive(Clone)]
pub struct GoogleProvider {
    config: ProviderConfig,
    authorize_url: Url,
    http: reqwest::Client,
    scopes: Vec<String>,
}

impl GoogleProvider {
    /// Create a new Google provider from configuration
    pub fn new(config: &ProviderConfig, http: reqwest::Client) -> Result<Self, Error> {
        config.validate("google")?;

        let authorize_url = Url::parse(&config.authorize_uri)
            .map_err(|e| Error::config(format!("google: invalid authorize_uri: {e}")))?;

        let scopes = if config.scopes.is_empty() {
            vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ]
        } else {
            config.scopes.clone()
        };

        Ok(Self {
            config: config.clone(),
            authorize_url,
            http,
            scopes,
        })
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, Error> {
        exchange_authorization_code(&self.http, "google", &self.config, code).await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, Error> {
        let user_info = fetch_userinfo(
            &self.http,
            "google",
            &self.config.userinfo_uri,
            access_token,
        )
        .await?;

        map_profile(&user_info)
    }
}

fn map_profile(user_info: &serde_json::Value) -> Result<ProviderProfile, Error> {
    // v3 userinfo keys the subject as "sub"; the legacy v2 endpoint
    // used "id".
    let id = user_info["sub"]
        .as_str()
        .or(user_info["id"].as_str())
        .ok_or_else(|| Error::Profile {
            provider: "google".to_string(),
            status: None,
            detail: "missing sub in userinfo response".to_string(),
        })?
        .to_string();

    Ok(ProviderProfile {
        provider: "google".to_string(),
        id,
        email: user_info["email"].as_str().map(|s| s.to_string()),
        name: user_info["name"].as_str().map(|s| s.to_string()),
        given_name: user_info["given_name"].as_str().map(|s| s.to_string()),
        family_name: user_info["family_name"].as_str().map(|s| s.to_string()),
        picture: user_info["picture"].as_str().map(|s| s.to_string()),
        locale: user_info["locale"].as_str().map(|s| s.to_string()),
    })
}
