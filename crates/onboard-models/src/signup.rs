//! Signup request model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Body of `POST /signup`.
///
/// Fields the API does not know about are kept in `extra` so the request can
/// be forwarded to the backend unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    /// Profile metadata stored alongside the new account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SignupRequest {
    /// Names of the fields that fail validation, empty when the request is valid.
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !is_plausible_email(&self.email) {
            fields.push("email");
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            fields.push("password");
        }
        fields
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            data: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request("ada@example.com", "secret1").invalid_fields().is_empty());
    }

    #[test]
    fn test_invalid_fields() {
        assert_eq!(request("ada.example.com", "secret1").invalid_fields(), vec!["email"]);
        assert_eq!(request("@example.com", "secret1").invalid_fields(), vec!["email"]);
        assert_eq!(request("a b@example.com", "secret1").invalid_fields(), vec!["email"]);
        assert_eq!(request("ada@example.com", "12345").invalid_fields(), vec!["password"]);
        assert_eq!(request("", "").invalid_fields(), vec!["email", "password"]);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = json!({
            "email": "ada@example.com",
            "password": "secret1",
            "data": { "name": "Ada" },
            "captcha_token": "abc"
        });
        let parsed: SignupRequest = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(parsed.extra.get("captcha_token"), Some(&json!("abc")));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
    }
}
