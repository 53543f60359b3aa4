//! # idgate
//!
//! OAuth2 third-party login gateway. Exchanges provider authorization codes
//! for first-party session tokens:
//!
//! 1. `GET /auth/{provider}/login` issues a CSRF state and returns the
//!    provider consent URL.
//! 2. The provider redirects back with a code; the callback validates the
//!    state, exchanges the code, fetches the user profile, and mints signed
//!    access and refresh tokens.
//! 3. The browser surface redirects to the frontend with the tokens; the
//!    API surface returns them as JSON.
//!
//! Providers implement [`oauth::OAuthProvider`] and are wired from
//! configuration keys, so adding one never touches the request path.

pub mod config;
pub mod error;
pub mod handlers;
pub mod login;
pub mod oauth;
pub mod observability;
pub mod server;
pub mod tokens;

pub use config::Config;
pub use error::{Error, ErrorResponse, Result, TokenErrorKind};
pub use handlers::{router, AppState};
pub use login::{LoginError, LoginFlow, LoginStage, LoginSuccess};
pub use oauth::{build_provider, MemoryStateStore, OAuthProvider, StateStore};
pub use server::Server;
pub use tokens::{SessionClaims, TokenIssuer, TokenKind};
