//! OAuth 2.0 error taxonomy.
//!
//! Every validation failure in the emulator maps onto one of these variants,
//! and each variant carries a fixed wire marker (the `error` field of the
//! JSON body) and HTTP status.

use crate::keypair::KeyError;

/// Errors surfaced by the authorization and token endpoints.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Structurally malformed request: a required parameter is missing or
    /// the `grant_type` value is unrecognized.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of what is malformed.
        message: String,
    },

    /// The client id/secret pair does not match the registered client.
    #[error("invalid client: {message}")]
    InvalidClient {
        /// Description of the credential mismatch.
        message: String,
    },

    /// The authorization code is unknown, already redeemed, or expired.
    #[error("invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is unusable.
        message: String,
    },

    /// A presented bearer credential (refresh or access token) failed
    /// signature, structure, or expiry checks.
    #[error("invalid token: {message}")]
    InvalidToken {
        /// Description of the verification failure.
        message: String,
    },

    /// Token signing or response serialization failed.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal failure.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the OAuth 2.0 error code reported in response bodies.
    ///
    /// Bearer-credential failures report `invalid_request`, not a token- or
    /// grant-specific code: harnesses written against the emulated provider
    /// match that marker for expired refresh tokens.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } | Self::InvalidToken { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the HTTP status code paired with this error.
    ///
    /// `invalid_grant` and bearer-credential failures report 401 here, where
    /// RFC 6749 would use 400; integration harnesses written against the
    /// emulated provider expect 401 for both.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::InvalidClient { .. } | Self::InvalidGrant { .. } | Self::InvalidToken { .. } => {
                401
            }
            Self::Internal { .. } => 500,
        }
    }

    /// Returns `true` if this is a client-side (4xx) error.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }
}

impl From<KeyError> for AuthError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::Encoding { .. }
            | KeyError::KeyGeneration { .. }
            | KeyError::InvalidKey { .. } => Self::internal(err.to_string()),
            KeyError::Decoding { .. } | KeyError::Expired | KeyError::InvalidSignature => {
                Self::invalid_token(err.to_string())
            }
        }
    }
}
