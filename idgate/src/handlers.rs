//! HTTP handlers for the login endpoints
//!
//! Two callback surfaces share one orchestration path. The redirect surface
//! sends the browser back to the frontend with either session tokens or a
//! single sanitized `error` parameter; the API surface answers with JSON and
//! a status code. Neither surface ever emits partial tokens on failure.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::login::{LoginError, LoginFlow, LoginStage, LoginSuccess};
use crate::oauth::state::StateStore;
use crate::oauth::MemoryStateStore;

/// Longest error text we will embed in a redirect URL
const MAX_ERROR_PARAM_LEN: usize = 200;

/// Shared state for all login routes
#[derive(Clone)]
pub struct AppState {
    pub flows: Arc<HashMap<String, LoginFlow>>,
    pub states: Arc<MemoryStateStore>,
    pub frontend_url: String,
}

/// Build the login router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/{provider}/login", get(login_start))
        .route(
            "/auth/{provider}/callback",
            get(callback_redirect).post(callback_api),
        )
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginStartResponse {
    pub auth_url: String,
    pub state: String,
}

/// Start a login: issue a CSRF state and hand back the consent URL
async fn login_start(
    State(app): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Json<LoginStartResponse>, Error> {
    let flow = lookup_flow(&app, &provider)?;
    let state = app.states.issue(&provider).await?;
    let auth_url = flow.authorization_url(&state);

    tracing::debug!(provider = %provider, "issued login state");
    Ok(Json(LoginStartResponse { auth_url, state }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Browser callback: finish the login and redirect to the frontend
///
/// Every outcome is a redirect. Failures carry one `error` parameter,
/// URL-encoded and capped at 200 characters.
async fn callback_redirect(
    State(app): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    // Provider-reported denial (user cancelled consent, bad scope, ...)
    if let Some(error) = query.error {
        let detail = query.error_description.unwrap_or(error);
        tracing::warn!(provider = %provider, "provider returned an error callback");
        return failure_redirect(&app.frontend_url, &format!("Provider error: {detail}"));
    }

    let flow = match lookup_flow(&app, &provider) {
        Ok(flow) => flow,
        Err(e) => return failure_redirect(&app.frontend_url, &sanitize(&e)),
    };

    if let Err(e) = consume_state(&app, &provider, query.state.as_deref()).await {
        return failure_redirect(&app.frontend_url, &sanitize(&e));
    }

    let code = query.code.unwrap_or_default();
    tracing::debug!(provider = %provider, code = %mask(&code), "processing callback");
    match flow.login(&code).await {
        Ok(success) => {
            tracing::info!(provider = %provider, subject = %success.profile.id, "login completed");
            success_redirect(&app.frontend_url, &success)
        }
        Err(e) => {
            tracing::warn!(provider = %provider, stage = %e.stage, "login failed: {}", e.source);
            failure_redirect(&app.frontend_url, &sanitize_login(&e))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// API callback: same pipeline, JSON in and out
async fn callback_api(
    State(app): State<AppState>,
    Path(provider): Path<String>,
    Json(request): Json<CallbackRequest>,
) -> Response {
    let flow = match lookup_flow(&app, &provider) {
        Ok(flow) => flow,
        Err(e) => return api_failure(&e),
    };

    if let Err(e) = consume_state(&app, &provider, request.state.as_deref()).await {
        return api_failure(&e);
    }

    let code = request.code.unwrap_or_default();
    tracing::debug!(provider = %provider, code = %mask(&code), "processing callback");
    match flow.login(&code).await {
        Ok(success) => {
            tracing::info!(provider = %provider, subject = %success.profile.id, "login completed");
            let profile = &success.profile;
            let body = CallbackResponse {
                success: true,
                message: "Login successful".to_string(),
                token: Some(success.access_token.clone()),
                refresh_token: Some(success.refresh_token.clone()),
                token_type: Some(success.token_type.clone()),
                expires_in: Some(success.expires_in),
                user: Some(UserInfo {
                    id: profile.id.clone(),
                    provider: profile.provider.clone(),
                    email: profile.email.clone(),
                    name: profile.name.clone(),
                    given_name: profile.given_name.clone(),
                    family_name: profile.family_name.clone(),
                    picture: profile.picture.clone(),
                    locale: profile.locale.clone(),
                }),
                redirect_url: Some(app.frontend_url.clone()),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            tracing::warn!(provider = %provider, stage = %e.stage, "login failed: {}", e.source);
            let status = error_status(&e.source);
            let body = CallbackResponse {
                success: false,
                message: sanitize_login(&e),
                token: None,
                refresh_token: None,
                token_type: None,
                expires_in: None,
                user: None,
                redirect_url: None,
            };
            (status, Json(body)).into_response()
        }
    }
}

fn api_failure(error: &Error) -> Response {
    let body = CallbackResponse {
        success: false,
        message: sanitize(error),
        token: None,
        refresh_token: None,
        token_type: None,
        expires_in: None,
        user: None,
        redirect_url: None,
    };
    (error_status(error), Json(body)).into_response()
}

fn lookup_flow<'a>(app: &'a AppState, provider: &str) -> Result<&'a LoginFlow, Error> {
    app.flows
        .get(provider)
        .ok_or_else(|| Error::BadRequest(format!("unknown provider \"{provider}\"")))
}

async fn consume_state(
    app: &AppState,
    provider: &str,
    state: Option<&str>,
) -> Result<(), Error> {
    let state = state
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::BadRequest("missing state parameter".to_string()))?;

    let issued_for = app.states.consume(state).await?;
    if issued_for != provider {
        return Err(Error::BadRequest(
            "state was issued for a different provider".to_string(),
        ));
    }
    Ok(())
}

fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        Error::Exchange { .. } | Error::Profile { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error text safe to show the frontend: no upstream bodies, no secrets
fn sanitize(error: &Error) -> String {
    let text = match error {
        Error::BadRequest(msg) => msg.clone(),
        Error::Exchange {
            provider, status, ..
        } => match status {
            Some(s) => format!("Token exchange with {provider} failed (status {s})"),
            None => format!("Token exchange with {provider} failed"),
        },
        Error::Profile {
            provider, status, ..
        } => match status {
            Some(s) => format!("Profile fetch from {provider} failed (status {s})"),
            None => format!("Profile fetch from {provider} failed"),
        },
        Error::InvalidToken(kind) => format!("Invalid session token: {kind}"),
        _ => "Internal error".to_string(),
    };
    truncate(&text, MAX_ERROR_PARAM_LEN)
}

fn sanitize_login(error: &LoginError) -> String {
    let text = match error.stage {
        LoginStage::Init => sanitize(&error.source),
        _ => format!("Login failed at {}: {}", error.stage, sanitize(&error.source)),
    };
    truncate(&text, MAX_ERROR_PARAM_LEN)
}

fn success_redirect(frontend_url: &str, success: &LoginSuccess) -> Response {
    let mut url = match Url::parse(frontend_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("frontend redirect URL is invalid: {}", e);
            return Error::Internal("frontend redirect URL is invalid".to_string())
                .into_response();
        }
    };

    let profile = &success.profile;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("accessToken", &success.access_token)
            .append_pair("refreshToken", &success.refresh_token)
            .append_pair("tokenType", &success.token_type)
            .append_pair("expiresIn", &success.expires_in.to_string())
            .append_pair("userId", &profile.id)
            .append_pair("provider", &profile.provider);
        if let Some(email) = &profile.email {
            pairs.append_pair("email", email);
        }
        if let Some(name) = &profile.name {
            pairs.append_pair("name", name);
        }
        if let Some(given_name) = &profile.given_name {
            pairs.append_pair("givenName", given_name);
        }
        if let Some(family_name) = &profile.family_name {
            pairs.append_pair("familyName", family_name);
        }
        if let Some(picture) = &profile.picture {
            pairs.append_pair("picture", picture);
        }
        if let Some(locale) = &profile.locale {
            pairs.append_pair("locale", locale);
        }
    }

    found(url.as_str())
}

fn failure_redirect(frontend_url: &str, error: &str) -> Response {
    let mut url = match Url::parse(frontend_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("frontend redirect URL is invalid: {}", e);
            return Error::Internal("frontend redirect URL is invalid".to_string())
                .into_response();
        }
    };

    url.query_pairs_mut()
        .append_pair("error", &truncate(error, MAX_ERROR_PARAM_LEN));
    found(url.as_str())
}

/// 302 redirect to an already-validated URL
fn found(url: &str) -> Response {
    match header::HeaderValue::from_str(url) {
        Ok(location) => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Err(e) => {
            tracing::error!("redirect location is not a valid header value: {}", e);
            Error::Internal("redirect location is invalid".to_string()).into_response()
        }
    }
}

/// Short prefix for diagnostics; never the full value
fn mask(value: &str) -> String {
    if value.len() <= 6 {
        "***".to_string()
    } else {
        let mut end = 6;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &value[..end])
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use crate::config::TokenConfig;
    use crate::oauth::provider::{OAuthProvider, ProviderProfile, ProviderTokens};
    use crate::tokens::TokenIssuer;

    struct MockProvider {
        fail_exchange: bool,
    }

    #[async_trait]
    impl OAuthProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn authorization_url(&self, state: &str) -> String {
            format!("https://mock.example.com/authorize?state={state}")
        }

        async fn exchange_code(&self, _code: &str) -> Result<ProviderTokens, Error> {
            if self.fail_exchange {
                return Err(Error::Exchange {
                    provider: "mock".to_string(),
                    status: Some(400),
                    detail: "invalid_grant".to_string(),
                });
            }
            Ok(ProviderTokens {
                access_token: "provider-access".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: Some(3600),
                refresh_token: None,
                id_token: None,
            })
        }

        async fn fetch_profile(&self, _access_token: &str) -> Result<ProviderProfile, Error> {
            Ok(ProviderProfile {
                provider: "mock".to_string(),
                id: "uid-1".to_string(),
                email: Some("user@example.com".to_string()),
                name: Some("Test User".to_string()),
                given_name: None,
                family_name: None,
                picture: None,
                locale: None,
            })
        }
    }

    fn test_app(fail_exchange: bool) -> AppState {
        let issuer = TokenIssuer::with_secret(
            b"0123456789abcdef0123456789abcdef",
            &TokenConfig {
                signing_key_path: PathBuf::from("session.key"),
                access_ttl_secs: 900,
                refresh_ttl_secs: 604_800,
                clock_skew_secs: 30,
                issuer: None,
            },
        );

        let mut flows = HashMap::new();
        flows.insert(
            "mock".to_string(),
            LoginFlow::new(Arc::new(MockProvider { fail_exchange }), issuer),
        );

        AppState {
            flows: Arc::new(flows),
            states: Arc::new(MemoryStateStore::new(Duration::from_secs(600))),
            frontend_url: "http://localhost:3000/oauth/callback".to_string(),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(response: &Response) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_login_start_returns_url_and_state() {
        let app = test_app(false);
        let router = router(app);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/auth/mock/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let state = body["state"].as_str().unwrap();
        assert!(!state.is_empty());
        assert!(body["authUrl"]
            .as_str()
            .unwrap()
            .contains(&format!("state={state}")));
    }

    #[tokio::test]
    async fn test_login_start_unknown_provider() {
        let app = test_app(false);
        let router = router(app);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/auth/kakao/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_callback_redirect_success_carries_tokens_and_profile() {
        let app = test_app(false);
        let state = app.states.issue("mock").await.unwrap();
        let router = router(app);

        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/auth/mock/callback?code=good&state={state}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = location(&response);
        assert!(location.starts_with("http://localhost:3000/oauth/callback?"));
        assert!(location.contains("accessToken="));
        assert!(location.contains("refreshToken="));
        assert!(location.contains("userId=uid-1"));
        assert!(location.contains("provider=mock"));
        assert!(location.contains("email=user%40example.com"));
        assert!(!location.contains("error="));
    }

    #[tokio::test]
    async fn test_callback_redirect_missing_code() {
        let app = test_app(false);
        let state = app.states.issue("mock").await.unwrap();
        let router = router(app);

        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/auth/mock/callback?state={state}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = location(&response);
        assert!(location.contains("error="));
        assert!(!location.contains("accessToken="));
    }

    #[tokio::test]
    async fn test_callback_redirect_rejects_unknown_state() {
        let app = test_app(false);
        let router = router(app);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/auth/mock/callback?code=good&state=forged")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = location(&response);
        assert!(location.contains("error="));
        assert!(!location.contains("accessToken="));
    }

    #[tokio::test]
    async fn test_callback_redirect_state_is_consume_once() {
        let app = test_app(false);
        let state = app.states.issue("mock").await.unwrap();
        let router = router(app);

        let first = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/auth/mock/callback?code=good&state={state}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(location(&first).contains("accessToken="));

        let replay = router
            .oneshot(
                Request::builder()
                    .uri(format!("/auth/mock/callback?code=good&state={state}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(location(&replay).contains("error="));
    }

    #[tokio::test]
    async fn test_callback_redirect_forwards_provider_error() {
        let app = test_app(false);
        let router = router(app);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/auth/mock/callback?error=access_denied")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let location = location(&response);
        assert!(location.contains("error=Provider+error%3A+access_denied"));
    }

    #[tokio::test]
    async fn test_callback_api_success() {
        let app = test_app(false);
        let state = app.states.issue("mock").await.unwrap();
        let router = router(app);

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/mock/callback")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(
                        r#"{{"code": "good", "state": "{state}"}}"#
                    )))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert!(body["token"].as_str().is_some());
        assert!(body["refreshToken"].as_str().is_some());
        assert_eq!(body["expiresIn"], 900);
        assert_eq!(body["user"]["id"], "uid-1");
        assert_eq!(body["user"]["provider"], "mock");
    }

    #[tokio::test]
    async fn test_callback_api_rejected_code_is_bad_gateway() {
        let app = test_app(true);
        let state = app.states.issue("mock").await.unwrap();
        let router = router(app);

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/mock/callback")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(
                        r#"{{"code": "bad", "state": "{state}"}}"#
                    )))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body.get("token").is_none());
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("CODE_RECEIVED"));
    }

    #[tokio::test]
    async fn test_callback_api_missing_state_is_bad_request() {
        let app = test_app(false);
        let router = router(app);

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/mock/callback")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"code": "good"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_mask_keeps_only_a_prefix() {
        assert_eq!(mask("4/0AVHEtk5xyz-long-code"), "4/0AVH...");
        assert_eq!(mask("short"), "***");
        assert_eq!(mask(""), "***");
    }

    #[test]
    fn test_sanitize_drops_upstream_body() {
        let err = Error::Exchange {
            provider: "google".to_string(),
            status: Some(500),
            detail: "secret-bearing upstream body".repeat(50),
        };
        let text = sanitize(&err);
        assert_eq!(text, "Token exchange with google failed (status 500)");
        assert!(!text.contains("upstream body"));
    }

    #[test]
    fn test_sanitize_login_truncates_to_200() {
        let err = LoginError {
            stage: LoginStage::CodeReceived,
            source: Error::BadRequest("x".repeat(500)),
        };
        let text = sanitize_login(&err);
        assert!(text.len() <= 200);
    }
}
