//! Authorization-code exchange against a provider token endpoint
//!
//! One form-encoded POST per attempt. A non-success status or an empty body
//! is an `ExchangeError` carrying the upstream status; the reqwest client's
//! timeout bounds the call and surfaces as an `ExchangeError` without a
//! status. No retry at this layer.

use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::oauth::provider::ProviderTokens;

/// Token endpoint response body
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    // Naver serializes expires_in as a JSON string
    #[serde(default, deserialize_with = "lenient_i64")]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => Ok(s.parse().ok()),
    }
}

/// Exchange an authorization code for provider tokens
pub async fn exchange_authorization_code(
    http: &reqwest::Client,
    provider: &str,
    config: &ProviderConfig,
    code: &str,
) -> Result<ProviderTokens, Error> {
    let form = [
        ("grant_type", "authorization_code"),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("code", code),
    ];

    let response = http
        .post(&config.token_uri)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::Exchange {
            provider: provider.to_string(),
            status: None,
            detail: if e.is_timeout() {
                "token endpoint request timed out".to_string()
            } else {
                format!("token endpoint request failed: {e}")
            },
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Exchange {
            provider: provider.to_string(),
            status: Some(status.as_u16()),
            detail: format!("token endpoint rejected the code: {}", truncate(&body, 256)),
        });
    }

    let body = response.text().await.map_err(|e| Error::Exchange {
        provider: provider.to_string(),
        status: Some(status.as_u16()),
        detail: format!("failed to read token response body: {e}"),
    })?;

    if body.trim().is_empty() {
        return Err(Error::Exchange {
            provider: provider.to_string(),
            status: Some(status.as_u16()),
            detail: "token endpoint returned an empty body".to_string(),
        });
    }

    let parsed: TokenEndpointResponse =
        serde_json::from_str(&body).map_err(|e| Error::Exchange {
            provider: provider.to_string(),
            status: Some(status.as_u16()),
            detail: format!("failed to parse token response: {e}"),
        })?;

    Ok(ProviderTokens {
        access_token: parsed.access_token,
        token_type: parsed.token_type,
        expires_in: parsed.expires_in,
        refresh_token: parsed.refresh_token,
        id_token: parsed.id_token,
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s[..end].to_string()
    }
}
