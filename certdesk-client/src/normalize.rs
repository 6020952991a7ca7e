//! Response normalization
//!
//! Every backend response goes through here: pagination headers are captured,
//! the body is decoded, header tokens on token-issuing responses are carried
//! into the body, and failures are classified and presented before the caller
//! sees a `Result`. The session itself is only installed by the login flow,
//! once it has accepted the response.

use std::sync::Arc;

use http::{HeaderMap, Method};
use serde_json::{Map, Value};
use shared::Pagination;

use crate::endpoint;
use crate::error::{ClientError, ClientResult, ErrorKind, Failure};
use crate::expiry::SessionExpiryHandler;
use crate::notify::{Notification, Notifier};
use crate::session::LEGACY_TOKEN_KEYS;
use crate::transport::TransportResponse;

const GENERIC_ERROR: &str = "Something went wrong";

/// Token response headers, in lookup order
const TOKEN_HEADERS: [&str; 3] = ["access_token", "access-token", "authorization"];

/// Successful response in its uniform shape
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub data: Value,
    pub pagination: Pagination,
}

/// Request facts the normalizer needs
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub endpoint: String,
    pub method: Method,
    pub show_success_notification: bool,
}

pub struct ResponseNormalizer {
    notifier: Arc<dyn Notifier>,
    expiry: SessionExpiryHandler,
}

impl ResponseNormalizer {
    pub fn new(notifier: Arc<dyn Notifier>, expiry: SessionExpiryHandler) -> Self {
        Self { notifier, expiry }
    }

    pub async fn normalize(
        &self,
        response: Box<dyn TransportResponse>,
        ctx: &NormalizeContext,
    ) -> ClientResult<NormalizedResponse> {
        let status = response.status();
        let headers = response.headers().clone();
        let pagination = pagination_from_headers(&headers);

        let bytes = response.into_body().await?;
        let mut body = decode_body(status.as_u16(), &bytes)?;

        if status.is_success() {
            if endpoint::issues_token(&ctx.endpoint) {
                mirror_header_token(&headers, &mut body);
            }
            if ctx.show_success_notification
                && is_mutating(&ctx.method)
                && let Some(message) = success_message(&headers, &body)
            {
                self.notifier.notify(Notification::success("Success", message));
            }
            tracing::debug!(endpoint = %ctx.endpoint, status = status.as_u16(), "Request succeeded");
            return Ok(NormalizedResponse { data: body, pagination });
        }

        let status = status.as_u16();
        let kind = if status == 401 {
            self.expiry.handle(&ctx.endpoint, &body).await;
            ErrorKind::Auth
        } else {
            let (kind, notifications) = error_notifications(status, &body);
            for notification in notifications {
                self.notifier.notify(notification);
            }
            kind
        };

        tracing::warn!(endpoint = %ctx.endpoint, method = %ctx.method, status, kind = kind.as_str(), "Request failed");
        Err(ClientError::Failure(Failure { status, kind, body }))
    }
}

/// Copy a header-issued token into the body as `api_token` unless the body
/// already carries one
fn mirror_header_token(headers: &HeaderMap, body: &mut Value) {
    let Some(token) = token_from_headers(headers) else {
        return;
    };
    if let Value::Object(map) = body
        && !map.contains_key("access_token")
        && !map.contains_key("api_token")
    {
        map.insert("api_token".to_string(), Value::String(token));
        tracing::debug!("Header token mirrored into response body");
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Pagination headers; missing or unparseable values stay unknown
pub fn pagination_from_headers(headers: &HeaderMap) -> Pagination {
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    Pagination::from_header_values(
        value("x-current-page"),
        value("x-page-limit"),
        value("x-total-count"),
        value("x-total-pages"),
    )
}

/// Decode a body as JSON; an empty body is `null`
pub fn decode_body(status: u16, bytes: &[u8]) -> ClientResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|source| ClientError::MalformedBody { status, source })
}

/// Token from the first present token header, `Bearer ` prefix removed
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = TOKEN_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .filter(|v| !v.is_empty())?;
    let token = strip_bearer(raw).trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn strip_bearer(raw: &str) -> &str {
    let trimmed = raw.trim_start();
    match trimmed.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer") => {
            let rest = &trimmed[6..];
            if rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                trimmed
            }
        }
        _ => trimmed,
    }
}

/// Profile carried by a token-issuing response: `data` object, else the body
pub fn body_profile(body: &Value) -> Option<&Map<String, Value>> {
    match body.get("data") {
        Some(Value::Object(data)) => Some(data),
        _ => body.as_object(),
    }
}

/// Token carried inside a profile under any legacy name
pub fn token_from_profile(profile: &Map<String, Value>) -> Option<&str> {
    LEGACY_TOKEN_KEYS
        .iter()
        .find_map(|key| profile.get(*key).and_then(Value::as_str))
        .filter(|t| !t.is_empty())
}

fn success_message(headers: &HeaderMap, body: &Value) -> Option<String> {
    headers
        .get("x-status-message")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| text_of(body.get("message")?))
}

/// Displayable text of a message value
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Classify a non-401 failure and build its notifications
///
/// 400/422 bodies in a recognized shape are validation errors; anything
/// else is a server error. Every failure yields at least one notification.
pub fn error_notifications(status: u16, body: &Value) -> (ErrorKind, Vec<Notification>) {
    if status == 400 || status == 422 {
        let notifications = validation_notifications(body);
        if !notifications.is_empty() {
            return (ErrorKind::Validation, notifications);
        }
    }
    (ErrorKind::Server, server_notifications(body))
}

fn validation_notifications(body: &Value) -> Vec<Notification> {
    let mut out = Vec::new();

    if let Some(Value::Array(messages)) = body.get("message") {
        for (i, message) in messages.iter().enumerate() {
            out.push(
                Notification::error("Validation Error", display(message)).with_key(format!("validation-error-{i}")),
            );
        }
    }

    match (body.get("error"), body.get("errors"), body.get("message")) {
        (Some(error), _, _) if text_of(error).is_some() => {
            out.push(Notification::error("Error", display(error)));
        }
        (_, Some(Value::Object(errors)), _) => {
            for message in errors.values() {
                let first = match message {
                    Value::Array(items) => items.first().map(display).unwrap_or_default(),
                    other => display(other),
                };
                out.push(Notification::error("Validation Error", first));
            }
        }
        (_, _, Some(Value::String(message))) if !message.is_empty() => {
            out.push(Notification::error("Error", message.clone()));
        }
        _ => {
            if let Value::Array(messages) = body {
                for message in messages {
                    out.push(Notification::error("Error", display(message)));
                }
            }
        }
    }

    out
}

fn server_notifications(body: &Value) -> Vec<Notification> {
    let mut out = Vec::new();

    match body.get("data") {
        Some(Value::Object(fields)) => {
            for (field, message) in fields {
                match message {
                    Value::String(text) => out.push(Notification::error("Validation Error", text.clone())),
                    Value::Array(items) => out.push(Notification::error(
                        format!("Error: {field}"),
                        items.first().map(display).unwrap_or_default(),
                    )),
                    Value::Object(_) | Value::Null => {
                        out.push(Notification::error(format!("Error: {field}"), message.to_string()))
                    }
                    _ => {}
                }
            }
        }
        Some(Value::String(text)) if !text.is_empty() => out.push(Notification::error("Error", text.clone())),
        _ => {}
    }

    if out.is_empty() {
        let message = body
            .get("message")
            .and_then(text_of)
            .unwrap_or_else(|| GENERIC_ERROR.to_string());
        out.push(Notification::error("Error", message));
    }
    out
}
