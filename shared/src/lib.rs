//! Shared types for certdesk
//!
//! Request/response DTOs and domain models used by the API client
//! and the command-line front-end.

pub mod client;
pub mod models;
pub mod response;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use client::{LoginRequest, SignupRequest};
pub use models::{Certificate, CertificateDraft, CertificateStatus};
pub use response::{BodyPagination, ListEnvelope, Pagination};
