//! Token endpoint handler.
//!
//! Dispatches on `grant_type`, resolved once into [`GrantType`] at entry,
//! and runs the authorization-code or refresh-token flow. Both mint the
//! same five-key bundle from the resolved session.

use axum::Json;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{error_response, require};
use crate::client::GrantType;
use crate::error::AuthError;
use crate::server::MockIdp;
use crate::session::{RefreshTokenClaims, Session};

/// Form parameters accepted by the token endpoint.
///
/// Fields are optional at the serde layer; each grant flow checks its own
/// requirements so missing parameters produce the `invalid_request` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenParams {
    /// OAuth 2.0 grant type. Required.
    #[serde(default)]
    pub grant_type: Option<String>,

    /// Client identifier. Required.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret. Required.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Authorization code (for the authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Refresh token (for the refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Successful token response.
///
/// The key set is fixed; each token independently verifies against the
/// server's published keys.
#[derive(Debug, Clone, Serialize)]
pub struct TokenBundle {
    /// Bearer credential for resource access.
    pub access_token: String,

    /// OpenID Connect identity token.
    pub id_token: String,

    /// Credential for minting fresh bundles without re-authentication.
    pub refresh_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// `POST /token` handler.
pub async fn token_handler(State(idp): State<MockIdp>, Form(params): Form<TokenParams>) -> Response {
    let result = match resolve_grant_type(&params) {
        Ok(GrantType::AuthorizationCode) => code_grant(&idp, &params),
        Ok(GrantType::RefreshToken) => refresh_grant(&idp, &params),
        Err(error) => Err(error),
    };

    match result {
        Ok(bundle) => {
            info!(
                grant_type = params.grant_type.as_deref().unwrap_or_default(),
                "token bundle issued"
            );
            (
                StatusCode::OK,
                [
                    ("Content-Type", "application/json"),
                    ("Cache-Control", "no-store"),
                    ("Pragma", "no-cache"),
                ],
                Json(bundle),
            )
                .into_response()
        }
        Err(error) => {
            warn!(
                grant_type = params.grant_type.as_deref().unwrap_or_default(),
                %error,
                "token request failed"
            );
            error_response(&error)
        }
    }
}

fn resolve_grant_type(params: &TokenParams) -> Result<GrantType, AuthError> {
    let value = require(&params.grant_type, "grant_type")?;
    GrantType::from_param(value)
        .ok_or_else(|| AuthError::invalid_request(format!("unsupported grant_type: {value}")))
}

fn authenticate_client(idp: &MockIdp, params: &TokenParams) -> Result<(), AuthError> {
    let client_id = require(&params.client_id, "client_id")?;
    let client_secret = require(&params.client_secret, "client_secret")?;

    if !idp.client().authenticate(client_id, client_secret) {
        return Err(AuthError::invalid_client("client credentials do not match"));
    }
    Ok(())
}

fn code_grant(idp: &MockIdp, params: &TokenParams) -> Result<TokenBundle, AuthError> {
    let code = require(&params.code, "code")?;
    authenticate_client(idp, params)?;

    // Single-use: redemption consumes the code before any token is minted.
    let session = idp.sessions().redeem(code)?;
    mint_bundle(idp, &session, None)
}

fn refresh_grant(idp: &MockIdp, params: &TokenParams) -> Result<TokenBundle, AuthError> {
    let refresh_token = require(&params.refresh_token, "refresh_token")?;
    authenticate_client(idp, params)?;

    // Stateless verification: signature and expiry only. The owning session
    // is re-derived from the claim binding below.
    let claims: RefreshTokenClaims = idp.keypair().verify(refresh_token)?;
    let session = idp.sessions().get_session_by_id(&claims.session_id)?;

    let reuse = (!idp.config().refresh_token_rotation).then(|| refresh_token.to_string());
    mint_bundle(idp, &session, reuse)
}

fn mint_bundle(
    idp: &MockIdp,
    session: &Session,
    refresh_override: Option<String>,
) -> Result<TokenBundle, AuthError> {
    let config = idp.config();
    let keypair = idp.keypair();
    let now = idp.now();

    let access_token = session.access_token(config, keypair, now)?;
    let id_token = session.id_token(config, keypair, now)?;
    let refresh_token = match refresh_override {
        Some(token) => token,
        None => session.refresh_token(config, keypair, now)?,
    };

    Ok(TokenBundle {
        access_token,
        id_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_lifetime.as_secs(),
    })
}
