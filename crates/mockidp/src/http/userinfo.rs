//! OpenID Connect userinfo endpoint.
//!
//! Returns claims about the user behind a bearer access token. The token is
//! verified statelessly; the owning session is then re-derived from the
//! token's `jti` claim and its scope decides which claims are released.

use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::warn;

use super::error_response;
use crate::error::AuthError;
use crate::server::MockIdp;
use crate::session::AccessTokenClaims;

/// `GET /userinfo` handler.
pub async fn userinfo_handler(State(idp): State<MockIdp>, headers: HeaderMap) -> Response {
    match userinfo(&idp, &headers) {
        Ok(claims) => (
            [(header::CONTENT_TYPE, "application/json")],
            Json(claims),
        )
            .into_response(),
        Err(error) => {
            warn!(%error, "userinfo request rejected");
            error_response(&error)
        }
    }
}

fn userinfo(idp: &MockIdp, headers: &HeaderMap) -> Result<HashMap<String, Value>, AuthError> {
    let token = bearer_token(headers)?;
    let claims: AccessTokenClaims = idp.keypair().verify(token)?;
    let session = idp.sessions().get_session_by_id(&claims.jti)?;

    let mut body = session.user.scoped_claims(&session.scope);
    body.insert("sub".to_string(), Value::from(session.user.sub.clone()));
    Ok(body)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::invalid_token("missing bearer credential"))
}
