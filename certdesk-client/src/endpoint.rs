//! Endpoint registry
//!
//! Static mapping from logical operation name to HTTP method and relative path.

use http::Method;

use crate::error::{ClientError, ClientResult};

pub const LOGIN: &str = "login";
pub const SIGNUP: &str = "signup";
pub const CREATE_CERTIFICATE: &str = "createCertificate";
pub const GET_ALL_CERTIFICATES: &str = "getAllCertificates";
pub const GET_CERTIFICATE_BY_ID: &str = "getCertificateById";
pub const UPDATE_CERTIFICATE: &str = "updateCertificate";
pub const DELETE_CERTIFICATE: &str = "deleteCertificate";
pub const TOGGLE_CERTIFICATE: &str = "toggleCertificate";

/// Operations that never carry a bearer token
const PUBLIC_ENDPOINTS: &[&str] = &[LOGIN, SIGNUP, "forgotPassword", "verifyOtp", "resetPassword"];

/// Operations whose successful response issues a fresh session token
const TOKEN_ISSUING_ENDPOINTS: &[&str] = &[SIGNUP, LOGIN];

/// Endpoint descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: &'static str,
}

impl Endpoint {
    const fn new(method: Method, path: &'static str) -> Self {
        Self { method, path }
    }
}

static ENDPOINTS: &[(&str, Endpoint)] = &[
    // Authentication
    (LOGIN, Endpoint::new(Method::POST, "auth/login")),
    (SIGNUP, Endpoint::new(Method::POST, "auth/register")),
    // Certificates
    (CREATE_CERTIFICATE, Endpoint::new(Method::POST, "certificate/create")),
    (GET_ALL_CERTIFICATES, Endpoint::new(Method::GET, "certificate/getAllCertificates")),
    (GET_CERTIFICATE_BY_ID, Endpoint::new(Method::GET, "certificate/getCertificate")),
    (UPDATE_CERTIFICATE, Endpoint::new(Method::PUT, "certificate/updateCertificate")),
    (DELETE_CERTIFICATE, Endpoint::new(Method::DELETE, "certificate/deleteCertificate")),
    (TOGGLE_CERTIFICATE, Endpoint::new(Method::PUT, "certificate/toggleCertificate")),
];

/// Look up an operation by name
pub fn resolve(name: &str) -> ClientResult<&'static Endpoint> {
    ENDPOINTS
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, endpoint)| endpoint)
        .ok_or_else(|| ClientError::UnknownEndpoint(name.to_string()))
}

/// Names of every registered operation
pub fn names() -> impl Iterator<Item = &'static str> {
    ENDPOINTS.iter().map(|(name, _)| *name)
}

/// Whether the operation is callable without an auth token
pub fn is_public(name: &str) -> bool {
    PUBLIC_ENDPOINTS.contains(&name)
}

/// Whether a successful response to the operation carries a new session token
pub fn issues_token(name: &str) -> bool {
    TOKEN_ISSUING_ENDPOINTS.contains(&name)
}
