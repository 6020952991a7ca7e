//! Client-related types shared between the API layer and the front-end
//!
//! Auth request payloads as the backend expects them.

use serde::{Deserialize, Serialize};

/// Device name reported by every login/registration request
pub const DEVICE_NAME: &str = "web";

/// Build the per-request device token (`web-token-<unix millis>`)
pub fn device_token() -> String {
    format!("web-token-{}", chrono::Utc::now().timestamp_millis())
}

// =============================================================================
// Auth API DTOs
// =============================================================================

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device: String,
    pub device_token: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            device: DEVICE_NAME.to_string(),
            device_token: device_token(),
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Avatar path; the backend expects the placeholder directory
    pub image: String,
    pub device: String,
    pub device_token: String,
}

impl SignupRequest {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            confirm_password: password.clone(),
            password,
            phone_number: None,
            image: "/images/".to_string(),
            device: DEVICE_NAME.to_string(),
            device_token: device_token(),
        }
    }

    pub fn with_phone_number(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_shape() {
        let req = LoginRequest::new("a@b.c", "secret");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["email"], "a@b.c");
        assert_eq!(json["device"], "web");
        assert!(json["device_token"].as_str().unwrap().starts_with("web-token-"));
    }

    #[test]
    fn test_signup_request_uses_camel_case_names() {
        let req = SignupRequest::new("Ada", "Lovelace", "ada@example.com", "pw").with_phone_number("+15550100");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["lastName"], "Lovelace");
        assert_eq!(json["confirmPassword"], "pw");
        assert_eq!(json["phone_number"], "+15550100");
        assert_eq!(json["image"], "/images/");
    }
}
