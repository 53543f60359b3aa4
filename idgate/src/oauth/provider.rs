//! OAuth provider trait and normalized types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Tokens received from a provider's token endpoint
///
/// Transient values: never persisted, never logged in full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTokens {
    /// Access token from the provider
    pub access_token: String,

    /// Token type (usually "Bearer")
    pub token_type: String,

    /// Token lifetime in seconds (if provided)
    pub expires_in: Option<i64>,

    /// Refresh token (if provided)
    pub refresh_token: Option<String>,

    /// ID token for OIDC providers (if provided)
    pub id_token: Option<String>,
}

/// Normalized user profile from a provider's userinfo endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Provider key (e.g. "google", "naver")
    pub provider: String,

    /// Stable user ID from the provider
    pub id: String,

    /// User's email address
    pub email: Option<String>,

    /// User's display name
    pub name: Option<String>,

    /// User's given name
    pub given_name: Option<String>,

    /// User's family name
    pub family_name: Option<String>,

    /// User's profile picture URL
    pub picture: Option<String>,

    /// User's locale
    pub locale: Option<String>,
}

/// OAuth provider capability
///
/// One implementation per provider, selected by the configuration key. This
/// is the seam the orchestrator is tested through: implementations make no
/// outbound call outside `exchange_code` and `fetch_profile`.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// The provider key (e.g. "google", "naver")
    fn name(&self) -> &str;

    /// Build the consent-screen URL with the given CSRF state value
    ///
    /// The URL carries the client id, URL-encoded redirect URI,
    /// `response_type=code`, the scope set, the state, and the provider's
    /// options for a refresh-capable, re-consenting grant.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for provider tokens
    ///
    /// Exactly one outbound call; no retry (authorization codes are
    /// single-use, a retry would itself fail upstream).
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, Error>;

    /// Fetch the authenticated user's profile with a provider access token
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, Error>;
}
