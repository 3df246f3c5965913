//! End-to-end tests driving a served emulator over HTTP.
//!
//! Each test starts an instance on an ephemeral port, exercises the fixed
//! endpoint surface with `reqwest`, and shuts the listener down.

use std::collections::HashMap;
use std::time::Duration;

use mockidp::http::{
    AUTHORIZE_ENDPOINT, DISCOVERY_ENDPOINT, JWKS_ENDPOINT, TOKEN_ENDPOINT, USERINFO_ENDPOINT,
};
use mockidp::session::{IdTokenClaims, RefreshTokenClaims};
use mockidp::{Config, MockIdp, ServerHandle, User};
use serde_json::Value;

async fn start() -> ServerHandle {
    MockIdp::serve(Config::default()).await.expect("serve emulator")
}

async fn start_with(config: Config) -> ServerHandle {
    MockIdp::serve(config).await.expect("serve emulator")
}

/// Client that does not follow redirects, so 302 responses are observable.
fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("build http client")
}

fn authorize_params(handle: &ServerHandle) -> HashMap<&'static str, String> {
    HashMap::from([
        ("scope", "openid email profile".to_string()),
        ("response_type", "code".to_string()),
        ("redirect_uri", "https://app.example.com/callback".to_string()),
        ("state", "testState".to_string()),
        ("client_id", handle.idp().client().client_id.clone()),
    ])
}

fn code_grant_params(handle: &ServerHandle, code: &str) -> HashMap<&'static str, String> {
    let client = handle.idp().client();
    HashMap::from([
        ("client_id", client.client_id.clone()),
        ("client_secret", client.client_secret.clone()),
        ("code", code.to_string()),
        ("grant_type", "authorization_code".to_string()),
    ])
}

fn refresh_grant_params(handle: &ServerHandle, refresh_token: &str) -> HashMap<&'static str, String> {
    let client = handle.idp().client();
    HashMap::from([
        ("client_id", client.client_id.clone()),
        ("client_secret", client.client_secret.clone()),
        ("refresh_token", refresh_token.to_string()),
        ("grant_type", "refresh_token".to_string()),
    ])
}

fn assert_verifiable_bundle(handle: &ServerHandle, body: &Value) {
    for key in [
        "access_token",
        "id_token",
        "refresh_token",
        "token_type",
        "expires_in",
    ] {
        assert!(body.get(key).is_some(), "missing response key {key}");
    }
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(
        body["expires_in"],
        handle.idp().config().access_token_lifetime.as_secs()
    );

    for key in ["access_token", "id_token", "refresh_token"] {
        let token = body[key].as_str().expect("token is a string");
        handle
            .idp()
            .keypair()
            .verify::<Value>(token)
            .unwrap_or_else(|e| panic!("{key} failed verification: {e}"));
    }
}

// ============================================================================
// Authorize endpoint
// ============================================================================

#[tokio::test]
async fn authorize_redirects_with_code_and_state() {
    let handle = start().await;
    let client = http_client();

    let resp = client
        .get(handle.url(AUTHORIZE_ENDPOINT))
        .query(&authorize_params(&handle))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 302);

    let location = resp
        .headers()
        .get(reqwest::header::LOCATION)
        .expect("redirect location")
        .to_str()
        .unwrap();
    let url = url::Url::parse(location).unwrap();
    let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

    assert_eq!(query["state"], "testState");
    let code = &query["code"];
    assert!(!code.is_empty());

    // One new session was persisted under the issued code.
    let session = handle.idp().sessions().get_session_by_id(code).unwrap();
    assert_eq!(session.scope, "openid email profile");
    assert_eq!(session.state, "testState");

    handle.shutdown().await;
}

#[tokio::test]
async fn authorize_requires_every_parameter() {
    let handle = start().await;
    let client = http_client();
    let params = authorize_params(&handle);

    // Empty request
    let resp = client
        .get(handle.url(AUTHORIZE_ENDPOINT))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    for omit in ["scope", "response_type", "redirect_uri", "state", "client_id"] {
        let partial: HashMap<&str, String> = params
            .iter()
            .filter(|(key, _)| **key != omit)
            .map(|(key, value)| (*key, value.clone()))
            .collect();

        let resp = client
            .get(handle.url(AUTHORIZE_ENDPOINT))
            .query(&partial)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "omitting {omit}");

        let body = resp.text().await.unwrap();
        assert!(body.contains("invalid_request"), "omitting {omit}: {body}");
    }

    handle.shutdown().await;
}

#[tokio::test]
async fn authorize_rejects_unknown_client() {
    let handle = start().await;
    let client = http_client();

    let mut params = authorize_params(&handle);
    params.insert("client_id", "wrong_id".to_string());

    let resp = client
        .get(handle.url(AUTHORIZE_ENDPOINT))
        .query(&params)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let body = resp.text().await.unwrap();
    assert!(body.contains("invalid_client"), "{body}");

    handle.shutdown().await;
}

#[tokio::test]
async fn authorize_binds_queued_user_and_nonce() {
    let handle = start().await;
    let client = http_client();

    handle.idp().queue_user(User::with_subject("queued-subject"));

    let mut params = authorize_params(&handle);
    params.insert("nonce", "expectedNonce".to_string());

    let resp = client
        .get(handle.url(AUTHORIZE_ENDPOINT))
        .query(&params)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 302);

    let location = resp.headers()[reqwest::header::LOCATION].to_str().unwrap();
    let url = url::Url::parse(location).unwrap();
    let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

    let session = handle
        .idp()
        .sessions()
        .get_session_by_id(&query["code"])
        .unwrap();
    assert_eq!(session.user.sub, "queued-subject");
    assert_eq!(session.nonce, "expectedNonce");

    handle.shutdown().await;
}

// ============================================================================
// Token endpoint: authorization_code grant
// ============================================================================

#[tokio::test]
async fn code_grant_requires_every_parameter() {
    let handle = start().await;
    let client = http_client();

    let session = handle
        .idp()
        .sessions()
        .new_session("sessionScope", "sessionState", "sessionNonce", User::default());
    let params = code_grant_params(&handle, &session.id);

    // Empty request
    let resp = client
        .post(handle.url(TOKEN_ENDPOINT))
        .form(&HashMap::<&str, String>::new())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    for omit in ["client_id", "client_secret", "code", "grant_type"] {
        let partial: HashMap<&str, String> = params
            .iter()
            .filter(|(key, _)| **key != omit)
            .map(|(key, value)| (*key, value.clone()))
            .collect();

        let resp = client
            .post(handle.url(TOKEN_ENDPOINT))
            .form(&partial)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "omitting {omit}");

        let body = resp.text().await.unwrap();
        assert!(body.contains("invalid_request"), "omitting {omit}: {body}");
    }

    handle.shutdown().await;
}

#[tokio::test]
async fn code_grant_rejects_wrong_values() {
    let handle = start().await;
    let client = http_client();

    let session = handle
        .idp()
        .sessions()
        .new_session("sessionScope", "sessionState", "sessionNonce", User::default());
    let params = code_grant_params(&handle, &session.id);

    for tamper in ["client_id", "client_secret", "code", "grant_type"] {
        let mut tampered = params.clone();
        tampered.insert(tamper, "WRONG".to_string());

        let resp = client
            .post(handle.url(TOKEN_ENDPOINT))
            .form(&tampered)
            .send()
            .await
            .unwrap();

        let expected = if tamper == "grant_type" { 400 } else { 401 };
        assert_eq!(resp.status().as_u16(), expected, "tampering {tamper}");
    }

    handle.shutdown().await;
}

#[tokio::test]
async fn code_grant_issues_verifiable_bundle() {
    let handle = start().await;
    let client = http_client();

    let session = handle
        .idp()
        .sessions()
        .new_session("sessionScope", "sessionState", "sessionNonce", User::default());

    let resp = client
        .post(handle.url(TOKEN_ENDPOINT))
        .form(&code_grant_params(&handle, &session.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_verifiable_bundle(&handle, &body);

    handle.shutdown().await;
}

#[tokio::test]
async fn authorization_codes_are_single_use() {
    let handle = start().await;
    let client = http_client();

    let session = handle
        .idp()
        .sessions()
        .new_session("openid", "state", "", User::default());
    let params = code_grant_params(&handle, &session.id);

    let resp = client
        .post(handle.url(TOKEN_ENDPOINT))
        .form(&params)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = client
        .post(handle.url(TOKEN_ENDPOINT))
        .form(&params)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let body = resp.text().await.unwrap();
    assert!(body.contains("invalid_grant"), "{body}");

    handle.shutdown().await;
}

#[tokio::test]
async fn expired_authorization_code_rejected() {
    let handle = start().await;
    let client = http_client();

    let session = handle
        .idp()
        .sessions()
        .new_session("openid", "state", "", User::default());

    let window = handle.idp().config().authorization_code_lifetime;
    handle.idp().fast_forward(window + Duration::from_secs(1));

    let resp = client
        .post(handle.url(TOKEN_ENDPOINT))
        .form(&code_grant_params(&handle, &session.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let body = resp.text().await.unwrap();
    assert!(body.contains("invalid_grant"), "{body}");

    handle.shutdown().await;
}

#[tokio::test]
async fn id_token_round_trips_nonce() {
    let handle = start().await;
    let client = http_client();

    let mut params = authorize_params(&handle);
    params.insert("nonce", "round-trip-nonce".to_string());

    let resp = client
        .get(handle.url(AUTHORIZE_ENDPOINT))
        .query(&params)
        .send()
        .await
        .unwrap();
    let location = resp.headers()[reqwest::header::LOCATION].to_str().unwrap();
    let url = url::Url::parse(location).unwrap();
    let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

    let resp = client
        .post(handle.url(TOKEN_ENDPOINT))
        .form(&code_grant_params(&handle, &query["code"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.unwrap();
    let id_token = body["id_token"].as_str().unwrap();
    let claims: IdTokenClaims = handle.idp().keypair().verify(id_token).unwrap();

    assert_eq!(claims.nonce, "round-trip-nonce");
    assert_eq!(claims.aud, handle.idp().client().client_id);

    handle.shutdown().await;
}

// ============================================================================
// Token endpoint: refresh_token grant
// ============================================================================

#[tokio::test]
async fn refresh_grant_requires_every_parameter() {
    let handle = start().await;
    let client = http_client();

    let idp = handle.idp();
    let session = idp
        .sessions()
        .new_session("sessionScope", "sessionState", "sessionNonce", User::default());
    let refresh_token = session
        .refresh_token(idp.config(), idp.keypair(), idp.now())
        .unwrap();
    let params = refresh_grant_params(&handle, &refresh_token);

    for omit in ["client_id", "client_secret", "refresh_token", "grant_type"] {
        let partial: HashMap<&str, String> = params
            .iter()
            .filter(|(key, _)| **key != omit)
            .map(|(key, value)| (*key, value.clone()))
            .collect();

        let resp = client
            .post(handle.url(TOKEN_ENDPOINT))
            .form(&partial)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "omitting {omit}");

        let body = resp.text().await.unwrap();
        assert!(body.contains("invalid_request"), "omitting {omit}: {body}");
    }

    handle.shutdown().await;
}

#[tokio::test]
async fn refresh_grant_issues_verifiable_bundle() {
    let handle = start().await;
    let client = http_client();

    let idp = handle.idp();
    let session = idp
        .sessions()
        .new_session("sessionScope", "sessionState", "sessionNonce", User::default());
    let refresh_token = session
        .refresh_token(idp.config(), idp.keypair(), idp.now())
        .unwrap();

    // Move past the original mint instant so the rotated token differs.
    idp.fast_forward(Duration::from_secs(2));

    let resp = client
        .post(handle.url(TOKEN_ENDPOINT))
        .form(&refresh_grant_params(&handle, &refresh_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_verifiable_bundle(&handle, &body);

    // Rotation minted a fresh token still bound to the same session.
    let rotated = body["refresh_token"].as_str().unwrap();
    assert_ne!(rotated, refresh_token);
    let claims: RefreshTokenClaims = idp.keypair().verify(rotated).unwrap();
    assert_eq!(claims.session_id, session.id);

    handle.shutdown().await;
}

#[tokio::test]
async fn refresh_grant_echoes_token_when_rotation_disabled() {
    let handle = start_with(Config::default().with_refresh_token_rotation(false)).await;
    let client = http_client();

    let idp = handle.idp();
    let session = idp
        .sessions()
        .new_session("openid", "state", "", User::default());
    let refresh_token = session
        .refresh_token(idp.config(), idp.keypair(), idp.now())
        .unwrap();

    idp.fast_forward(Duration::from_secs(2));

    let resp = client
        .post(handle.url(TOKEN_ENDPOINT))
        .form(&refresh_grant_params(&handle, &refresh_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["refresh_token"].as_str().unwrap(), refresh_token);

    handle.shutdown().await;
}

#[tokio::test]
async fn expired_refresh_token_rejected() {
    let handle = start().await;
    let client = http_client();

    let idp = handle.idp();
    let session = idp
        .sessions()
        .new_session("sessionScope", "sessionState", "sessionNonce", User::default());

    // Minted as if issued 24 hours ago, far past the refresh lifetime.
    let minted_at = idp.now() - Duration::from_secs(24 * 3600);
    let expired = session
        .refresh_token(idp.config(), idp.keypair(), minted_at)
        .unwrap();

    let resp = client
        .post(handle.url(TOKEN_ENDPOINT))
        .form(&refresh_grant_params(&handle, &expired))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let body = resp.text().await.unwrap();
    assert!(body.contains("invalid_request"), "{body}");

    handle.shutdown().await;
}

#[tokio::test]
async fn malformed_refresh_token_rejected() {
    let handle = start().await;
    let client = http_client();

    let resp = client
        .post(handle.url(TOKEN_ENDPOINT))
        .form(&refresh_grant_params(&handle, "not.a.token"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let body = resp.text().await.unwrap();
    assert!(body.contains("invalid_request"), "{body}");

    handle.shutdown().await;
}

// ============================================================================
// Discovery, JWKS, userinfo
// ============================================================================

#[tokio::test]
async fn discovery_document_derives_from_issuer() {
    let handle = start().await;
    let client = http_client();

    let resp = client
        .get(handle.url(DISCOVERY_ENDPOINT))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let doc: Value = resp.json().await.unwrap();
    let issuer = handle.idp().issuer();

    assert_eq!(doc["issuer"], issuer);
    assert_eq!(
        doc["authorization_endpoint"],
        format!("{issuer}{AUTHORIZE_ENDPOINT}")
    );
    assert_eq!(doc["token_endpoint"], format!("{issuer}{TOKEN_ENDPOINT}"));
    assert_eq!(
        doc["userinfo_endpoint"],
        format!("{issuer}{USERINFO_ENDPOINT}")
    );
    assert_eq!(doc["jwks_uri"], format!("{issuer}{JWKS_ENDPOINT}"));

    handle.shutdown().await;
}

#[tokio::test]
async fn jwks_publishes_the_signing_key() {
    let handle = start().await;
    let client = http_client();

    let resp = client.get(handle.url(JWKS_ENDPOINT)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let jwks: Value = resp.json().await.unwrap();
    let keys = jwks["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);

    let key = &keys[0];
    assert_eq!(key["kty"], "RSA");
    assert_eq!(key["use"], "sig");
    assert_eq!(key["kid"], handle.idp().keypair().kid);
    assert!(key["n"].is_string());
    assert!(key["e"].is_string());

    handle.shutdown().await;
}

#[tokio::test]
async fn userinfo_returns_scoped_claims() {
    let handle = start().await;
    let client = http_client();

    let idp = handle.idp();
    let session = idp
        .sessions()
        .new_session("openid email", "state", "", User::default());
    let access_token = session
        .access_token(idp.config(), idp.keypair(), idp.now())
        .unwrap();

    let resp = client
        .get(handle.url(USERINFO_ENDPOINT))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let claims: Value = resp.json().await.unwrap();
    assert_eq!(claims["sub"], User::default().sub);
    assert_eq!(claims["email"], "jane.doe@example.com");
    // profile scope was not granted
    assert!(claims.get("preferred_username").is_none());

    handle.shutdown().await;
}

#[tokio::test]
async fn userinfo_requires_bearer_credential() {
    let handle = start().await;
    let client = http_client();

    let resp = client
        .get(handle.url(USERINFO_ENDPOINT))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
    let body = resp.text().await.unwrap();
    assert!(body.contains("invalid_request"), "{body}");

    let resp = client
        .get(handle.url(USERINFO_ENDPOINT))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    handle.shutdown().await;
}
