//! Data models
//!
//! Shared between the API client and the front-end.

pub mod certificate;

// Re-exports
pub use certificate::*;
