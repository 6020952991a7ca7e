//! Login, registration and logout

use serde_json::{Map, Value};
use shared::{LoginRequest, SignupRequest};

use crate::endpoint::{LOGIN, SIGNUP};
use crate::error::{ClientError, ClientResult, ErrorKind};
use crate::normalize::token_from_profile;
use crate::notify::Notification;
use crate::query::{MutationInput, MutationOptions, QueryClient};
use crate::session::Session;

const LOGIN_FAILED: &str = "Login Failed";
const INVALID_CREDENTIALS: &str = "Invalid credentials. Please try again.";
const USER_NOT_FOUND: &str = "User not found. Please check your email address.";
const INVALID_PASSWORD: &str = "Invalid password. Please try again.";
const LOGIN_ERROR: &str = "An error occurred during login. Please try again.";

const REGISTRATION_FAILED: &str = "Registration Failed";
const REGISTRATION_FALLBACK: &str = "Registration failed. Please try again.";
const REGISTRATION_ERROR: &str = "An error occurred during registration. Please try again.";

/// Message fragments that mean the account does not exist
const NOT_FOUND_HINTS: [&str; 4] = ["user not found", "invalid email", "no user", "not registered"];

#[derive(Debug, Clone)]
pub struct AuthApi {
    queries: QueryClient,
}

impl AuthApi {
    pub fn new(queries: QueryClient) -> Self {
        Self { queries }
    }

    /// Log in and make the returned user the current session
    ///
    /// A 2xx body can still be a rejection (`success: false`, `error`,
    /// `errorKey`, "Unauthorized", or no `data`); those fail with
    /// [`ClientError::Rejected`] and leave the session untouched.
    pub async fn login(&self, request: &LoginRequest) -> ClientResult<Session> {
        let options = MutationOptions::new().json().quiet();
        let input = MutationInput::new().data(serde_json::to_value(request)?);
        let body = match self.queries.mutate(LOGIN, &options, input).await {
            Ok(response) => response.data,
            Err(e) => return Err(self.failed(LOGIN_FAILED, e, login_error_message)),
        };

        if is_rejected(&body) || body.get("message").and_then(Value::as_str) == Some("Unauthorized") {
            return Err(self.reject(LOGIN_FAILED, login_failure_message(&body)));
        }

        let profile = match body.get("data") {
            Some(Value::Object(profile)) => profile.clone(),
            _ => {
                let message = text(&body, "message").unwrap_or(INVALID_CREDENTIALS);
                return Err(self.reject(LOGIN_FAILED, message.to_string()));
            }
        };

        let session = session_from_login(&body, profile);
        let store = self.queries.api().store();
        store.context().replace(session.clone());
        store.persist_current();

        tracing::info!(
            user = %session.display_name().unwrap_or_default(),
            has_token = session.is_authenticated(),
            "Login successful"
        );
        Ok(session)
    }

    /// Register a new account; the user logs in afterwards
    pub async fn signup(&self, request: &SignupRequest) -> ClientResult<Value> {
        let options = MutationOptions::new().json().quiet();
        let input = MutationInput::new().data(serde_json::to_value(request)?);
        let body = match self.queries.mutate(SIGNUP, &options, input).await {
            Ok(response) => response.data,
            Err(e) => return Err(self.failed(REGISTRATION_FAILED, e, registration_error_message)),
        };

        if is_rejected(&body) {
            let message = text(&body, "message")
                .or_else(|| text(&body, "errorDesc"))
                .unwrap_or(REGISTRATION_FALLBACK);
            return Err(self.reject(REGISTRATION_FAILED, message.to_string()));
        }

        self.queries.api().notifier().notify(Notification::success(
            "Account Created Successfully",
            "Your account has been created. Please login to continue.",
        ));
        Ok(body)
    }

    /// Drop the session everywhere and go back to login
    pub fn logout(&self) {
        self.queries.api().store().clear();
        self.queries.clear();
        tracing::info!("Logged out");
    }

    /// Tell the user about a request that failed before any body could be
    /// checked; session expiry has its own notice
    fn failed(&self, title: &str, error: ClientError, message: fn(&ClientError) -> String) -> ClientError {
        if !matches!(error.kind(), ErrorKind::Auth | ErrorKind::UnknownEndpoint) {
            self.queries
                .api()
                .notifier()
                .notify(Notification::error(title, message(&error)));
        }
        error
    }

    fn reject(&self, title: &str, message: String) -> ClientError {
        tracing::warn!(title, message = %message, "Authentication rejected");
        self.queries
            .api()
            .notifier()
            .notify(Notification::error(title, message.clone()));
        ClientError::Rejected(message)
    }
}

fn text<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// `success: false`, or an `error`/`errorKey` field
fn is_rejected(body: &Value) -> bool {
    let truthy = |key: &str| match body.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    };
    body.get("success") == Some(&Value::Bool(false)) || truthy("error") || truthy("errorKey")
}

/// User-facing message for a rejected login
pub fn login_failure_message(body: &Value) -> String {
    let message = text(body, "message");
    if let Some(lower) = message.map(str::to_lowercase) {
        if lower.contains("invalid password") {
            return INVALID_PASSWORD.to_string();
        }
        if NOT_FOUND_HINTS.iter().any(|hint| lower.contains(hint)) {
            return USER_NOT_FOUND.to_string();
        }
    }
    message
        .or_else(|| text(body, "errorDesc"))
        .unwrap_or(INVALID_CREDENTIALS)
        .to_string()
}

fn login_error_message(error: &ClientError) -> String {
    match error.failure() {
        Some(failure) if failure.body.get("success") == Some(&Value::Bool(false)) => {
            login_failure_message(&failure.body)
        }
        Some(failure) => failure.message().unwrap_or(LOGIN_ERROR).to_string(),
        None => error.to_string(),
    }
}

fn registration_error_message(error: &ClientError) -> String {
    match error.failure() {
        Some(failure) => text(&failure.body, "message")
            .or_else(|| text(&failure.body, "errorDesc"))
            .unwrap_or(REGISTRATION_ERROR)
            .to_string(),
        None => error.to_string(),
    }
}

/// Session from the `data` profile; a token only present in the response
/// headers was mirrored into the body as `api_token`
fn session_from_login(body: &Value, profile: Map<String, Value>) -> Session {
    let header_token = token_from_profile(&profile)
        .is_none()
        .then(|| text(body, "api_token").map(str::to_string))
        .flatten();
    match header_token {
        Some(token) => Session::authenticated(token, profile),
        None => Session::from_legacy_map(profile),
    }
}
