//! Test-user identity data.
//!
//! The registry holds exactly one default user; callers may supply
//! alternates per session or queue them on the server for the next
//! authorization request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A mock end-user identity and the claims it releases.
///
/// Standard OIDC profile fields are named and optional; anything else goes
/// through the `extra` extension map and is merged verbatim into ID tokens
/// and userinfo responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Subject identifier.
    pub sub: String,

    /// Preferred email address. Released under the `email` scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether the email address has been verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    /// Shorthand name. Released under the `profile` scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Telephone number. Released under the `phone` scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Postal address. Released under the `address` scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Group memberships. Released under the `groups` scope.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Additional claims merged into ID tokens and userinfo responses
    /// regardless of scope.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl User {
    /// Creates a user carrying only a subject identifier.
    #[must_use]
    pub fn with_subject(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: None,
            email_verified: None,
            preferred_username: None,
            phone_number: None,
            address: None,
            groups: Vec::new(),
            extra: HashMap::new(),
        }
    }

    /// Returns the claims this user releases for a space-separated scope
    /// value, keyed by claim name. `sub` is not included; callers place it
    /// themselves.
    #[must_use]
    pub fn scoped_claims(&self, scope: &str) -> HashMap<String, Value> {
        let mut claims = HashMap::new();

        for s in scope.split_whitespace() {
            match s {
                "email" => {
                    if let Some(email) = &self.email {
                        claims.insert("email".to_string(), Value::from(email.clone()));
                    }
                    if let Some(verified) = self.email_verified {
                        claims.insert("email_verified".to_string(), Value::from(verified));
                    }
                }
                "profile" => {
                    if let Some(username) = &self.preferred_username {
                        claims.insert(
                            "preferred_username".to_string(),
                            Value::from(username.clone()),
                        );
                    }
                }
                "phone" => {
                    if let Some(phone) = &self.phone_number {
                        claims.insert("phone_number".to_string(), Value::from(phone.clone()));
                    }
                }
                "address" => {
                    if let Some(address) = &self.address {
                        claims.insert("address".to_string(), Value::from(address.clone()));
                    }
                }
                "groups" => {
                    if !self.groups.is_empty() {
                        claims.insert("groups".to_string(), Value::from(self.groups.clone()));
                    }
                }
                _ => {}
            }
        }

        for (name, value) in &self.extra {
            claims.insert(name.clone(), value.clone());
        }

        claims
    }
}

impl Default for User {
    /// The registry's single default test user.
    fn default() -> Self {
        Self {
            sub: "1234567890".to_string(),
            email: Some("jane.doe@example.com".to_string()),
            email_verified: Some(true),
            preferred_username: Some("jane.doe".to_string()),
            phone_number: Some("555-987-6543".to_string()),
            address: Some("123 Main Street".to_string()),
            groups: Vec::new(),
            extra: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_user_identity() {
        let user = User::default();
        assert_eq!(user.sub, "1234567890");
        assert_eq!(user.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(user.preferred_username.as_deref(), Some("jane.doe"));
    }

    #[test]
    fn claims_follow_scope() {
        let user = User::default();

        let claims = user.scoped_claims("openid email");
        assert_eq!(claims["email"], json!("jane.doe@example.com"));
        assert_eq!(claims["email_verified"], json!(true));
        assert!(!claims.contains_key("preferred_username"));
        assert!(!claims.contains_key("phone_number"));

        let claims = user.scoped_claims("openid email profile phone address");
        assert_eq!(claims["preferred_username"], json!("jane.doe"));
        assert_eq!(claims["phone_number"], json!("555-987-6543"));
        assert_eq!(claims["address"], json!("123 Main Street"));
    }

    #[test]
    fn groups_released_when_present() {
        let mut user = User::default();
        assert!(user.scoped_claims("groups").is_empty());

        user.groups = vec!["engineering".to_string(), "oncall".to_string()];
        let claims = user.scoped_claims("groups");
        assert_eq!(claims["groups"], json!(["engineering", "oncall"]));
    }

    #[test]
    fn extra_claims_always_released() {
        let mut user = User::with_subject("custom-subject");
        user.extra
            .insert("tenant".to_string(), json!("acme-corp"));

        let claims = user.scoped_claims("openid");
        assert_eq!(claims["tenant"], json!("acme-corp"));
        assert!(!claims.contains_key("sub"));
    }

    #[test]
    fn extra_claims_flatten_in_json() {
        let mut user = User::with_subject("s");
        user.extra.insert("department".to_string(), json!("qa"));

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["department"], json!("qa"));
        assert_eq!(json["sub"], json!("s"));
    }
}
