//! Request builder
//!
//! Turns an operation name and per-call options into a fully qualified,
//! ready-to-send request. No network access happens here.

use std::collections::BTreeMap;

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde_json::Value;

use crate::endpoint;
use crate::error::{ClientError, ClientResult};

const APPLICATION_JSON: &str = "application/json";

/// Value of one multipart field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// One multipart field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                content_type,
                bytes,
            },
        }
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestData {
    /// Plain value: JSON-encoded, or one form field per object entry
    Value(Value),
    /// Pre-built multipart form, sent as is
    Form(Vec<FormField>),
}

impl RequestData {
    /// Falsy payloads (`null`, `""`) produce no body
    fn is_blank(&self) -> bool {
        match self {
            Self::Value(Value::Null) => true,
            Self::Value(Value::String(s)) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<Value> for RequestData {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Vec<FormField>> for RequestData {
    fn from(fields: Vec<FormField>) -> Self {
        Self::Form(fields)
    }
}

/// Per-call request options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query-string parameters
    pub params: BTreeMap<String, String>,
    /// Path suffix appended as `/{slug}`
    pub slug: Option<String>,
    /// Overrides the registered method for this call only
    pub method: Option<Method>,
    /// Extra headers, appended after the standard ones
    pub headers: Vec<(String, String)>,
    pub data: Option<RequestData>,
    pub use_form_data: bool,
    pub show_success_notification: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, data: Value) -> Self {
        self.data = Some(RequestData::Value(data));
        self.use_form_data = false;
        self
    }

    pub fn form(mut self, data: impl Into<RequestData>) -> Self {
        self.data = Some(data.into());
        self.use_form_data = true;
        self
    }

    pub fn notify_success(mut self, show: bool) -> Self {
        self.show_success_notification = show;
        self
    }
}

/// Encoded request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(String),
    Multipart(Vec<FormField>),
}

/// Fully built request
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// Operation name, for logging and response handling
    pub endpoint: String,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

/// Build the URL for an operation
///
/// `base_url` + path + `/{slug}` + `?{query}`.
pub fn build_url(
    base_url: &str,
    name: &str,
    params: &BTreeMap<String, String>,
    slug: Option<&str>,
) -> ClientResult<String> {
    let endpoint = endpoint::resolve(name)?;
    let mut url = format!("{}/{}", base_url.trim_end_matches('/'), endpoint.path);

    if let Some(slug) = slug.filter(|s| !s.is_empty()) {
        url.push('/');
        url.push_str(slug);
    }

    if !params.is_empty() {
        let query = serde_urlencoded::to_string(params)
            .map_err(|e| ClientError::Config(format!("Cannot encode query parameters: {e}")))?;
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query);
    }

    Ok(url)
}

/// Build a request for `name`
///
/// `token` is the session token at build time; it is attached unless the
/// operation is public.
pub fn build(
    base_url: &str,
    name: &str,
    options: &RequestOptions,
    token: Option<&str>,
) -> ClientResult<PreparedRequest> {
    let endpoint = endpoint::resolve(name)?;
    let method = options.method.clone().unwrap_or_else(|| endpoint.method.clone());
    let url = build_url(base_url, name, &options.params, options.slug.as_deref())?;

    let form_encoded = options.use_form_data || matches!(options.data, Some(RequestData::Form(_)));

    let mut headers = HeaderMap::new();
    headers.append(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    if !form_encoded && method != Method::GET {
        headers.append(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    }

    if endpoint::is_public(name) {
        // never authenticated
    } else if let Some(token) = token.filter(|t| !t.is_empty()) {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => {
                headers.append(AUTHORIZATION, value);
                tracing::debug!(endpoint = %name, token = %token_prefix(token), "Authorization header added");
            }
            Err(_) => tracing::warn!(endpoint = %name, "Session token is not a valid header value"),
        }
    } else {
        tracing::warn!(endpoint = %name, "No session token for authenticated endpoint");
    }

    for (key, value) in &options.headers {
        match (HeaderName::try_from(key.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::warn!(header = %key, "Skipping invalid custom header"),
        }
    }

    let body = match &options.data {
        _ if method == Method::GET || method == Method::DELETE => RequestBody::Empty,
        None => RequestBody::Empty,
        Some(data) if data.is_blank() => RequestBody::Empty,
        Some(RequestData::Form(fields)) => RequestBody::Multipart(fields.clone()),
        Some(RequestData::Value(value)) if form_encoded => RequestBody::Multipart(form_fields(value)),
        Some(RequestData::Value(value)) => RequestBody::Json(serde_json::to_string(value)?),
    };

    Ok(PreparedRequest {
        endpoint: name.to_string(),
        method,
        url,
        headers,
        body,
    })
}

/// One text field per object entry; non-objects have no entries
pub fn form_fields(value: &Value) -> Vec<FormField> {
    let Value::Object(map) = value else {
        return Vec::new();
    };
    map.iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            FormField::text(key.clone(), text)
        })
        .collect()
}

fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://api.example.com/api/";

    #[test]
    fn test_url_with_slug_and_params() {
        let params = BTreeMap::from([
            ("page".to_string(), "2".to_string()),
            ("search".to_string(), "iso 9001".to_string()),
        ]);
        let url = build_url(BASE, "getAllCertificates", &params, Some("abc")).unwrap();
        assert_eq!(
            url,
            "https://api.example.com/api/certificate/getAllCertificates/abc?page=2&search=iso+9001"
        );

        let url = build_url("https://api.example.com/api", "login", &BTreeMap::new(), None).unwrap();
        assert_eq!(url, "https://api.example.com/api/auth/login");

        let url = build_url(BASE, "getCertificateById", &BTreeMap::new(), Some("")).unwrap();
        assert_eq!(url, "https://api.example.com/api/certificate/getCertificate");
    }

    #[test]
    fn test_unknown_endpoint_fails() {
        let err = build(BASE, "nope", &RequestOptions::new(), None).unwrap_err();
        assert!(matches!(err, ClientError::UnknownEndpoint(_)));
    }

    #[test]
    fn test_json_body_and_content_type() {
        let data = json!({ "certificate_number": "C-1", "nested": { "a": [1, 2] } });
        let req = build(BASE, "createCertificate", &RequestOptions::new().json(data.clone()), Some("abc")).unwrap();

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.headers.get(CONTENT_TYPE).unwrap(), APPLICATION_JSON);
        assert_eq!(req.headers.get(ACCEPT).unwrap(), APPLICATION_JSON);
        assert_eq!(req.body, RequestBody::Json(serde_json::to_string(&data).unwrap()));
    }

    #[test]
    fn test_form_body_has_no_content_type() {
        let opts = RequestOptions::new().form(json!({ "status": "valid", "count": 3, "flag": true }));
        let req = build(BASE, "toggleCertificate", &opts.slug("42"), Some("abc")).unwrap();

        assert!(req.headers.get(CONTENT_TYPE).is_none());
        assert_eq!(req.url, "https://api.example.com/api/certificate/toggleCertificate/42");
        assert_eq!(
            req.body,
            RequestBody::Multipart(vec![
                FormField::text("count", "3"),
                FormField::text("flag", "true"),
                FormField::text("status", "valid"),
            ])
        );
    }

    #[test]
    fn test_prebuilt_form_passes_through() {
        let fields = vec![
            FormField::text("certificate_number", "C-1"),
            FormField::file("qrImage", "qr.png", Some("image/png".into()), vec![1, 2, 3]),
        ];
        let req = build(BASE, "createCertificate", &RequestOptions::new().form(fields.clone()), None).unwrap();
        assert_eq!(req.body, RequestBody::Multipart(fields));
        assert!(req.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_get_and_delete_have_no_body() {
        let opts = RequestOptions::new().json(json!({ "ignored": true }));
        let req = build(BASE, "getAllCertificates", &opts, Some("abc")).unwrap();
        assert_eq!(req.body, RequestBody::Empty);
        assert!(req.headers.get(CONTENT_TYPE).is_none());

        let req = build(BASE, "deleteCertificate", &opts.clone().slug("7"), Some("abc")).unwrap();
        assert_eq!(req.body, RequestBody::Empty);
        assert_eq!(req.headers.get(CONTENT_TYPE).unwrap(), APPLICATION_JSON);
    }

    #[test]
    fn test_blank_payload_has_no_body() {
        let req = build(BASE, "updateCertificate", &RequestOptions::new().json(json!("")), None).unwrap();
        assert_eq!(req.body, RequestBody::Empty);
    }

    #[test]
    fn test_method_override() {
        let opts = RequestOptions::new().method(Method::PATCH).json(json!({ "a": 1 }));
        let req = build(BASE, "updateCertificate", &opts, None).unwrap();
        assert_eq!(req.method, Method::PATCH);
        assert_eq!(crate::endpoint::resolve("updateCertificate").unwrap().method, Method::PUT);
    }

    #[test]
    fn test_bearer_token_attached_for_private_endpoints() {
        let req = build(BASE, "getAllCertificates", &RequestOptions::new(), Some("abc")).unwrap();
        assert_eq!(req.headers.get(AUTHORIZATION).unwrap(), "Bearer abc");

        let req = build(BASE, "getAllCertificates", &RequestOptions::new(), None).unwrap();
        assert!(req.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_public_endpoints_never_carry_token() {
        for name in ["login", "signup"] {
            let req = build(BASE, name, &RequestOptions::new().json(json!({})), Some("abc")).unwrap();
            assert!(req.headers.get(AUTHORIZATION).is_none(), "{name}");
        }
    }

    #[test]
    fn test_custom_headers_are_appended() {
        let opts = RequestOptions::new().header("x-client", "cli").header("bad header", "x");
        let req = build(BASE, "getAllCertificates", &opts, None).unwrap();
        assert_eq!(req.headers.get("x-client").unwrap(), "cli");
        assert_eq!(req.headers.len(), 2);
    }
}
