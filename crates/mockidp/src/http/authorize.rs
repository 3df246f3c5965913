//! Authorization endpoint handler.
//!
//! Single transition: request in, redirect-with-code or error out. A valid
//! request creates one session and answers with a 302 redirect carrying the
//! authorization code and echoed state.

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{info, warn};
use url::form_urlencoded;

use super::{error_response, require};
use crate::error::AuthError;
use crate::server::MockIdp;

/// Query parameters for the authorization endpoint.
///
/// Every field is optional at the serde layer so a missing parameter
/// produces the `invalid_request` error body instead of an extractor
/// rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeParams {
    /// Requested scopes (space-separated). Required.
    #[serde(default)]
    pub scope: Option<String>,

    /// Response type; the code flow is the only one modeled. Required.
    #[serde(default)]
    pub response_type: Option<String>,

    /// Where the authorization code is delivered. Required.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// CSRF protection state, echoed on the redirect. Required.
    #[serde(default)]
    pub state: Option<String>,

    /// Client identifier. Required.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OpenID Connect nonce for ID token binding. Optional.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// `GET /authorize` handler.
pub async fn authorize_handler(
    State(idp): State<MockIdp>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    match authorize(&idp, &params) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(error) => {
            warn!(%error, "authorization request rejected");
            error_response(&error)
        }
    }
}

fn authorize(idp: &MockIdp, params: &AuthorizeParams) -> Result<String, AuthError> {
    let scope = require(&params.scope, "scope")?;
    require(&params.response_type, "response_type")?;
    let redirect_uri = require(&params.redirect_uri, "redirect_uri")?;
    let state = require(&params.state, "state")?;
    let client_id = require(&params.client_id, "client_id")?;

    if !idp.client().matches_id(client_id) {
        return Err(AuthError::invalid_client("unknown client_id"));
    }

    let nonce = params.nonce.clone().unwrap_or_default();
    let user = idp.next_user();
    let session = idp.sessions().new_session(scope, state, nonce, user);

    info!(client_id, scope, "authorization code issued");
    Ok(redirect_location(redirect_uri, &session.id, state))
}

/// Appends `code` and `state` to the redirect target.
///
/// The target is treated as an opaque string rather than parsed as a URL:
/// test harnesses routinely register bare hosts like `example.com`.
fn redirect_location(redirect_uri: &str, code: &str, state: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code)
        .append_pair("state", state)
        .finish();
    let separator = if redirect_uri.contains('?') { '&' } else { '?' };
    format!("{redirect_uri}{separator}{query}")
}
