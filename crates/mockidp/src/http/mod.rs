//! Axum handlers for the fixed endpoint surface.
//!
//! # Endpoints
//!
//! - [`authorize`] - Authorization Code grant initiation
//! - [`token`] - Code and refresh-token exchange
//! - [`userinfo`] - Claims about the authenticated user
//! - [`jwks`] - Public signing keys
//! - [`discovery`] - OpenID Connect discovery document

pub mod authorize;
pub mod discovery;
pub mod jwks;
pub mod token;
pub mod userinfo;

pub use authorize::authorize_handler;
pub use discovery::discovery_handler;
pub use jwks::jwks_handler;
pub use token::{TokenBundle, token_handler};
pub use userinfo::userinfo_handler;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::AuthError;

/// Authorization endpoint path.
pub const AUTHORIZE_ENDPOINT: &str = "/authorize";

/// Token endpoint path.
pub const TOKEN_ENDPOINT: &str = "/token";

/// Userinfo endpoint path.
pub const USERINFO_ENDPOINT: &str = "/userinfo";

/// Key-set endpoint path.
pub const JWKS_ENDPOINT: &str = "/jwks";

/// Discovery document path.
pub const DISCOVERY_ENDPOINT: &str = "/.well-known/openid-configuration";

/// Wire shape of OAuth 2.0 error bodies.
///
/// The `error` field carries the machine-checkable marker string harnesses
/// assert on (`invalid_request`, `invalid_client`, `invalid_grant`).
#[derive(Debug, Clone, Serialize)]
pub struct OAuthErrorBody {
    /// OAuth 2.0 error code.
    pub error: &'static str,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Translates a validation failure into its HTTP response.
pub(crate) fn error_response(error: &AuthError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = OAuthErrorBody {
        error: error.oauth_error_code(),
        error_description: Some(error.to_string()),
    };

    (
        status,
        [
            ("Content-Type", "application/json"),
            ("Cache-Control", "no-store"),
            ("Pragma", "no-cache"),
        ],
        Json(body),
    )
        .into_response()
}

/// Extracts a required request parameter, treating empty values as absent.
pub(crate) fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AuthError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::invalid_request(format!("missing required parameter: {name}")))
}
