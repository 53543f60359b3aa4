//! Session token issuance and verification
//!
//! First-party HS256 tokens minted after a successful login. Access tokens
//! carry profile claims; refresh tokens carry only the subject, so a leaked
//! refresh token reveals nothing beyond an opaque identifier and cannot be
//! used where an access token is required.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;
use crate::error::{Error, TokenErrorKind};

/// Which kind of session token a string claims to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Stable subject identifier (provider user id)
    pub sub: String,
    /// Token kind discriminator
    pub typ: TokenKind,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Mints and verifies session tokens with a shared symmetric key
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    clock_skew_secs: u64,
    issuer: Option<String>,
}

impl TokenIssuer {
    /// Create an issuer from configuration, reading the signing key file
    pub fn new(config: &TokenConfig) -> Result<Self, Error> {
        let secret = std::fs::read(&config.signing_key_path).map_err(|e| {
            Error::Token(format!(
                "failed to read signing key {}: {e}",
                config.signing_key_path.display()
            ))
        })?;
        if secret.len() < 32 {
            return Err(Error::Token(
                "signing key must be at least 32 bytes".to_string(),
            ));
        }
        Ok(Self::from_secret(&secret, config))
    }

    /// Create an issuer from an in-memory secret
    pub fn with_secret(secret: &[u8], config: &TokenConfig) -> Self {
        Self::from_secret(secret, config)
    }

    fn from_secret(secret: &[u8], config: &TokenConfig) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
            clock_skew_secs: config.clock_skew_secs,
            issuer: config.issuer.clone(),
        }
    }

    /// Mint a token of the given kind for a subject
    ///
    /// Refresh tokens drop every claim except the subject regardless of
    /// what the caller passes in.
    pub fn mint(
        &self,
        subject: &str,
        email: Option<String>,
        name: Option<String>,
        provider: Option<String>,
        kind: TokenKind,
    ) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };

        let claims = match kind {
            TokenKind::Access => SessionClaims {
                sub: subject.to_string(),
                typ: kind,
                iat: now,
                exp: now + ttl,
                iss: self.issuer.clone(),
                email,
                name,
                provider,
            },
            TokenKind::Refresh => SessionClaims {
                sub: subject.to_string(),
                typ: kind,
                iat: now,
                exp: now + ttl,
                iss: self.issuer.clone(),
                email: None,
                name: None,
                provider: None,
            },
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| Error::Token(format!("failed to sign session token: {e}")))
    }

    /// Verify a token and check it is of the expected kind
    ///
    /// Expiry is evaluated with the configured clock-skew leeway. A valid
    /// signature on the wrong kind of token is still a rejection.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<SessionClaims, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.clock_skew_secs;
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::InvalidToken(TokenErrorKind::Expired)
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    Error::InvalidToken(TokenErrorKind::BadSignature)
                }
                _ => Error::InvalidToken(TokenErrorKind::Malformed),
            })?;

        if data.claims.typ != expected {
            return Err(Error::InvalidToken(TokenErrorKind::Malformed));
        }

        Ok(data.claims)
    }

    /// Access token lifetime in seconds, for response bodies
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }
}
