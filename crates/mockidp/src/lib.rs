//! # mockidp
//!
//! A self-contained OAuth 2.0 / OpenID Connect identity provider that stands
//! in for a real authorization server in integration tests. It issues
//! authorization codes, exchanges them for signed tokens, rotates refresh
//! tokens, and publishes verifiable signing keys.
//!
//! The emulator is a single explicitly constructed instance with no global
//! state, so several independent providers can run in one test process:
//!
//! ```ignore
//! use mockidp::{Config, MockIdp};
//!
//! let handle = MockIdp::serve(Config::default()).await?;
//! let idp = handle.idp();
//!
//! // Point the system under test at the discovery document:
//! let discovery = format!("{}/.well-known/openid-configuration", idp.issuer());
//!
//! // Simulate elapsed time without sleeping:
//! idp.fast_forward(std::time::Duration::from_secs(3600));
//!
//! handle.shutdown().await;
//! ```
//!
//! ## Modules
//!
//! - [`clock`] - Swappable time source for deterministic expiry tests
//! - [`config`] - Lifetimes, issuer, and policy configuration
//! - [`error`] - OAuth 2.0 error taxonomy
//! - [`keypair`] - Signing-key custody, JWT signing/verification, JWKS
//! - [`client`] - The registered client and grant-type dispatch
//! - [`user`] - Test-user identity data and scope-gated claims
//! - [`session`] - Authorization-grant state and token minting
//! - [`store`] - Concurrent session repository
//! - [`http`] - Axum handlers for the fixed endpoint surface
//! - [`server`] - The emulator instance and listener bootstrap

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod keypair;
pub mod server;
pub mod session;
pub mod store;
pub mod user;

pub use client::{Client, GrantType};
pub use clock::{Clock, FrozenClock, OffsetClock, SystemClock};
pub use config::Config;
pub use error::AuthError;
pub use keypair::{Jwk, Jwks, KeyError, Keypair, SigningAlgorithm};
pub use server::{MockIdp, ServerHandle};
pub use session::{AccessTokenClaims, IdTokenClaims, RefreshTokenClaims, Session};
pub use store::SessionStore;
pub use user::User;

/// Type alias for fallible identity-provider operations.
pub type IdpResult<T> = std::result::Result<T, AuthError>;
