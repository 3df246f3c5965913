//! OpenID Connect discovery document.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use super::{AUTHORIZE_ENDPOINT, JWKS_ENDPOINT, TOKEN_ENDPOINT, USERINFO_ENDPOINT};
use crate::server::MockIdp;

/// `GET /.well-known/openid-configuration` handler.
///
/// Every endpoint URL is the issuer concatenated with its fixed path, so
/// relying parties configured from this document reach the same instance
/// that issued it.
pub async fn discovery_handler(State(idp): State<MockIdp>) -> impl IntoResponse {
    let issuer = idp.issuer();

    let doc = serde_json::json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}{AUTHORIZE_ENDPOINT}"),
        "token_endpoint": format!("{issuer}{TOKEN_ENDPOINT}"),
        "userinfo_endpoint": format!("{issuer}{USERINFO_ENDPOINT}"),
        "jwks_uri": format!("{issuer}{JWKS_ENDPOINT}"),
        "scopes_supported": ["openid", "email", "profile", "phone", "address", "groups"],
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": [idp.config().algorithm.as_str()],
        "token_endpoint_auth_methods_supported": ["client_secret_post"],
    });

    ([(header::CONTENT_TYPE, "application/json")], Json(doc))
}
