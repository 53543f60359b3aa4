//! OAuth 2.0 authorization-code flow building blocks
//!
//! [`provider::OAuthProvider`] is the seam: each upstream identity provider
//! implements it, and everything downstream (login orchestration, handlers)
//! works against the trait object. [`state::MemoryStateStore`] issues and
//! consumes the CSRF state values that tie an authorization redirect to the
//! callback that follows it.

pub mod exchange;
pub mod profile;
pub mod provider;
pub mod providers;
pub mod state;

pub use provider::{OAuthProvider, ProviderProfile, ProviderTokens};
pub use providers::build_provider;
pub use state::{generate_state, MemoryStateStore, StateStore};
