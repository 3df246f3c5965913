//! Authorization-grant session state and token minting.
//!
//! A [`Session`] is created per successful authorization request and is the
//! single source of truth for the tokens derived from it. Minting is a pure
//! function of `(Session, Config, Keypair, now)`. The `now` argument, not
//! the wall clock, anchors every expiry, which is what makes expiry behavior
//! reproducible in tests.

use std::collections::HashMap;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::IdpResult;
use crate::config::Config;
use crate::keypair::Keypair;
use crate::user::User;

// ============================================================================
// Token Claims
// ============================================================================

/// Claims carried by minted access tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Issuer URL.
    pub iss: String,

    /// Subject (user identifier).
    pub sub: String,

    /// Audience (the registered client id).
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Session identifier; lets the userinfo endpoint re-derive the
    /// owning session from the bare token.
    pub jti: String,

    /// Space-separated scopes granted to the session.
    pub scope: String,
}

/// Claims carried by minted ID tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdTokenClaims {
    /// Issuer URL.
    pub iss: String,

    /// Subject (user identifier).
    pub sub: String,

    /// Audience (the registered client id).
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Nonce from the authorization request, echoed verbatim.
    pub nonce: String,

    /// Scope-gated profile claims released by the user.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Claims carried by minted refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshTokenClaims {
    /// Issuer URL.
    pub iss: String,

    /// Subject (user identifier).
    pub sub: String,

    /// Audience (the registered client id).
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// The originating session, re-resolved on refresh grants.
    pub session_id: String,
}

// ============================================================================
// Session
// ============================================================================

/// One authorization grant.
///
/// The session identifier doubles as the authorization code. Identity
/// (id, user) is immutable after creation; `consumed_at` is set exactly once
/// when the code is redeemed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identifier, doubling as the authorization code.
    pub id: String,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// State parameter from the authorization request.
    pub state: String,

    /// OpenID Connect nonce; empty when the request carried none.
    pub nonce: String,

    /// The authenticated user bound to this grant.
    pub user: User,

    /// Creation time; anchors the authorization code validity window.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Set when the authorization code is redeemed. Codes are single-use.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub consumed_at: Option<OffsetDateTime>,
}

impl Session {
    /// Creates a session with a freshly generated code, stamped at
    /// `created_at`.
    #[must_use]
    pub fn new(
        scope: impl Into<String>,
        state: impl Into<String>,
        nonce: impl Into<String>,
        user: User,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Self::generate_code(),
            scope: scope.into(),
            state: state.into(),
            nonce: nonce.into(),
            user,
            created_at,
            consumed_at: None,
        }
    }

    /// Generates a new cryptographically secure authorization code:
    /// 256 bits of random data, base64url-encoded without padding.
    #[must_use]
    pub fn generate_code() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the authorization code has been redeemed.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Returns `true` if the authorization code window has passed at `now`.
    #[must_use]
    pub fn code_expired(&self, window: Duration, now: OffsetDateTime) -> bool {
        now > self.created_at + window
    }

    /// Mints a signed access token valid from `now`.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn access_token(
        &self,
        config: &Config,
        keypair: &Keypair,
        now: OffsetDateTime,
    ) -> IdpResult<String> {
        let claims = AccessTokenClaims {
            iss: config.issuer.clone(),
            sub: self.user.sub.clone(),
            aud: config.client_id.clone(),
            exp: (now + config.access_token_lifetime).unix_timestamp(),
            iat: now.unix_timestamp(),
            jti: self.id.clone(),
            scope: self.scope.clone(),
        };
        Ok(keypair.sign(&claims)?)
    }

    /// Mints a signed ID token valid from `now`, carrying the session nonce
    /// and the user's scope-gated profile claims.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn id_token(
        &self,
        config: &Config,
        keypair: &Keypair,
        now: OffsetDateTime,
    ) -> IdpResult<String> {
        let claims = IdTokenClaims {
            iss: config.issuer.clone(),
            sub: self.user.sub.clone(),
            aud: config.client_id.clone(),
            exp: (now + config.id_token_lifetime).unix_timestamp(),
            iat: now.unix_timestamp(),
            nonce: self.nonce.clone(),
            extra: self.user.scoped_claims(&self.scope),
        };
        Ok(keypair.sign(&claims)?)
    }

    /// Mints a signed refresh token valid from `now`, bound to this
    /// session's id.
    ///
    /// Expiry derives from the `now` argument, so a token can be minted as
    /// if issued in the past and then be observed to fail verification.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn refresh_token(
        &self,
        config: &Config,
        keypair: &Keypair,
        now: OffsetDateTime,
    ) -> IdpResult<String> {
        let claims = RefreshTokenClaims {
            iss: config.issuer.clone(),
            sub: self.user.sub.clone(),
            aud: config.client_id.clone(),
            exp: (now + config.refresh_token_lifetime).unix_timestamp(),
            iat: now.unix_timestamp(),
            session_id: self.id.clone(),
        };
        Ok(keypair.sign(&claims)?)
    }
}
