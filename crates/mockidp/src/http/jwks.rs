//! Key-set publication endpoint.
//!
//! Serves the public half of the server's signing key so issued tokens can
//! be verified without any shared state.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::server::MockIdp;

/// `GET /jwks` handler.
///
/// Returns 200 with the JWKS document. The key set never changes for the
/// lifetime of an instance, so clients may cache it.
pub async fn jwks_handler(State(idp): State<MockIdp>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(idp.keypair().jwks()),
    )
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::server::MockIdp;

    #[test]
    fn published_keys_describe_the_signing_key() {
        let idp = MockIdp::new(Config::default()).unwrap();
        let jwks = idp.keypair().jwks();

        assert_eq!(jwks.keys.len(), 1);
        let key = &jwks.keys[0];
        assert_eq!(key.kty, "RSA");
        assert_eq!(key.use_, "sig");
        assert_eq!(key.alg, "RS256");
        assert_eq!(key.kid, idp.keypair().kid);
        assert!(!key.n.is_empty());
        assert!(!key.e.is_empty());
    }
}
