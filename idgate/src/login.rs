//! Login orchestration
//!
//! Drives a single callback through the flow stages in order, stopping at
//! the first failure. Every failure records the stage it happened at so
//! callers and logs can tell a rejected code apart from a userinfo outage.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::oauth::provider::{OAuthProvider, ProviderProfile};
use crate::tokens::{TokenIssuer, TokenKind};

/// Stage a login attempt reached before it ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Init,
    CodeReceived,
    TokenExchanged,
    ProfileFetched,
    SessionIssued,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoginStage::Init => "INIT",
            LoginStage::CodeReceived => "CODE_RECEIVED",
            LoginStage::TokenExchanged => "TOKEN_EXCHANGED",
            LoginStage::ProfileFetched => "PROFILE_FETCHED",
            LoginStage::SessionIssued => "SESSION_ISSUED",
        };
        write!(f, "{name}")
    }
}

/// A login failure together with the stage it occurred at
#[derive(Debug)]
pub struct LoginError {
    pub stage: LoginStage,
    pub source: Error,
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "login failed at {}: {}", self.stage, self.source)
    }
}

impl std::error::Error for LoginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Outcome of a completed login
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub profile: ProviderProfile,
}

/// Runs the code-to-session pipeline for one provider
#[derive(Clone)]
pub struct LoginFlow {
    provider: Arc<dyn OAuthProvider>,
    issuer: TokenIssuer,
}

impl LoginFlow {
    pub fn new(provider: Arc<dyn OAuthProvider>, issuer: TokenIssuer) -> Self {
        Self { provider, issuer }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Consent URL for the provider, carrying the CSRF state
    pub fn authorization_url(&self, state: &str) -> String {
        self.provider.authorization_url(state)
    }

    /// Complete a login from a callback authorization code
    ///
    /// A missing code fails before any outbound call. A stage failure
    /// stops the pipeline; no tokens are minted on any failure path.
    pub async fn login(&self, code: &str) -> Result<LoginSuccess, LoginError> {
        if code.trim().is_empty() {
            return Err(LoginError {
                stage: LoginStage::Init,
                source: Error::BadRequest("authorization code is missing".to_string()),
            });
        }

        let tokens = self
            .provider
            .exchange_code(code)
            .await
            .map_err(|source| LoginError {
                stage: LoginStage::CodeReceived,
                source,
            })?;

        let profile = self
            .provider
            .fetch_profile(&tokens.access_token)
            .await
            .map_err(|source| LoginError {
                stage: LoginStage::TokenExchanged,
                source,
            })?;

        let access_token = self
            .issuer
            .mint(
                &profile.id,
                profile.email.clone(),
                profile.name.clone(),
                Some(profile.provider.clone()),
                TokenKind::Access,
            )
            .map_err(|source| LoginError {
                stage: LoginStage::ProfileFetched,
                source,
            })?;

        let refresh_token = self
            .issuer
            .mint(&profile.id, None, None, None, TokenKind::Refresh)
            .map_err(|source| LoginError {
                stage: LoginStage::ProfileFetched,
                source,
            })?;

        Ok(LoginSuccess {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.issuer.access_ttl_secs(),
            profile,
        })
    }
}
