//! Server configuration.
//!
//! Token lifetimes, the issuer URL, client credentials, and policy flags.
//! Everything is immutable after server construction.
//!
//! # Example (TOML)
//!
//! ```toml
//! issuer = "http://localhost:8080"
//! client_id = "integration-client"
//! client_secret = "integration-secret"
//! access_token_lifetime = "10m"
//! refresh_token_lifetime = "1h"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::keypair::SigningAlgorithm;

/// Identity-provider emulator configuration.
///
/// Defaults are suitable for integration tests: short lifetimes and freshly
/// generated random client credentials per instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Public base URL reported as the token `iss` claim and in the
    /// discovery document. A trailing slash is trimmed at server
    /// construction.
    pub issuer: String,

    /// Registered client identifier.
    pub client_id: String,

    /// Registered client secret.
    pub client_secret: String,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// ID token lifetime.
    #[serde(with = "humantime_serde")]
    pub id_token_lifetime: Duration,

    /// Refresh token lifetime.
    /// Can be longer since refresh grants require client authentication.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Authorization code validity window.
    /// Codes should be short-lived.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Mint a fresh refresh token on every refresh grant.
    /// When disabled, the presented refresh token is echoed back.
    pub refresh_token_rotation: bool,

    /// JWT signing algorithm.
    pub algorithm: SigningAlgorithm,
}

impl Default for Config {
    fn default() -> Self {
        let client = Client::generate();
        Self {
            issuer: "http://localhost:8080".to_string(),
            client_id: client.client_id,
            client_secret: client.client_secret,
            access_token_lifetime: Duration::from_secs(600), // 10 minutes
            id_token_lifetime: Duration::from_secs(600),     // 10 minutes
            refresh_token_lifetime: Duration::from_secs(3600), // 1 hour
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            refresh_token_rotation: true,
            algorithm: SigningAlgorithm::default(),
        }
    }
}

impl Config {
    /// Sets the issuer URL.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Pins the client credentials instead of generating random ones.
    #[must_use]
    pub fn with_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Sets the ID token lifetime.
    #[must_use]
    pub fn with_id_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.id_token_lifetime = lifetime;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    /// Sets the authorization code validity window.
    #[must_use]
    pub fn with_authorization_code_lifetime(mut self, lifetime: Duration) -> Self {
        self.authorization_code_lifetime = lifetime;
        self
    }

    /// Sets whether refresh tokens rotate on use.
    #[must_use]
    pub fn with_refresh_token_rotation(mut self, rotate: bool) -> Self {
        self.refresh_token_rotation = rotate;
        self
    }
}
