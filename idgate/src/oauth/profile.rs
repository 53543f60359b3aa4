//! Userinfo retrieval from a provider
//!
//! One bearer-authenticated GET; the raw JSON comes back for the provider
//! implementation to map into a `ProviderProfile`. No side effects besides
//! the outbound call.

use crate::error::Error;

/// Fetch the userinfo document with a provider access token
pub async fn fetch_userinfo(
    http: &reqwest::Client,
    provider: &str,
    userinfo_uri: &str,
    access_token: &str,
) -> Result<serde_json::Value, Error> {
    let response = http
        .get(userinfo_uri)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| Error::Profile {
            provider: provider.to_string(),
            status: None,
            detail: if e.is_timeout() {
                "userinfo request timed out".to_string()
            } else {
                format!("userinfo request failed: {e}")
            },
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Profile {
            provider: provider.to_string(),
            status: Some(status.as_u16()),
            detail: "userinfo request was rejected".to_string(),
        });
    }

    let body = response.text().await.map_err(|e| Error::Profile {
        provider: provider.to_string(),
        status: Some(status.as_u16()),
        detail: format!("failed to read userinfo body: {e}"),
    })?;

    if body.trim().is_empty() {
        return Err(Error::Profile {
            provider: provider.to_string(),
            status: Some(status.as_u16()),
            detail: "userinfo endpoint returned an empty body".to_string(),
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Profile {
        provider: provider.to_string(),
        status: Some(status.as_u16()),
        detail: format!("failed to parse userinfo body: {e}"),
    })
}
