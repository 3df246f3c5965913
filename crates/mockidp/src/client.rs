//! Registered-client data and grant-type dispatch.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// OAuth 2.0 grant types supported by the token endpoint.
///
/// The wire value is resolved into this enum exactly once at the token
/// endpoint's entry; everything downstream matches on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow.
    AuthorizationCode,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Resolves a wire value; `None` for unrecognized grant types.
    #[must_use]
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single registered OAuth client.
///
/// Immutable after server construction. Credential checks are exact string
/// comparison on both fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    /// Client identifier presented on authorize and token requests.
    pub client_id: String,

    /// Client secret presented on token requests.
    pub client_secret: String,
}

impl Client {
    /// Creates a client with pinned credentials.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Generates unguessable random credentials for a fresh instance.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            client_id: random_credential(),
            client_secret: random_credential(),
        }
    }

    /// Returns `true` if `client_id` names this client.
    #[must_use]
    pub fn matches_id(&self, client_id: &str) -> bool {
        self.client_id == client_id
    }

    /// Returns `true` if both credentials match exactly.
    #[must_use]
    pub fn authenticate(&self, client_id: &str, client_secret: &str) -> bool {
        self.client_id == client_id && self.client_secret == client_secret
    }
}

/// 16 random bytes, base64url without padding.
fn random_credential() -> String {
    let mut bytes = [0u8; 16];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
