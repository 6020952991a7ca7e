//! Certdesk Client - HTTP client for the certificate backend
//!
//! Endpoint registry, request building, response normalization, the
//! encrypted session store and the cached query layer on top of them.

pub mod auth;
pub mod certificates;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod expiry;
pub mod normalize;
pub mod notify;
pub mod query;
pub mod request;
pub mod session;
pub mod transport;

pub use auth::AuthApi;
pub use certificates::{CertificateApi, QrImage};
pub use client::{ApiClient, ApiClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, ErrorKind, Failure};
pub use expiry::{ExpiryNotice, ExpiryPrompt, SessionExpiryHandler};
pub use normalize::{NormalizedResponse, ResponseNormalizer};
pub use notify::{Level, Notification, Notifier, RecordingNotifier, TracingNotifier};
pub use query::{
    Invalidation, MutationInput, MutationOptions, QueryClient, QueryKey, QueryOptions, QueryStatus, RetryPolicy,
};
pub use request::{FormField, FormValue, PreparedRequest, RequestBody, RequestData, RequestOptions};
pub use session::{
    FileStorage, MemoryStorage, Navigator, SESSION_KEY, Session, SessionCipher, SessionContext, SessionStore,
    StorageBackend,
};
pub use transport::{ReqwestTransport, Transport, TransportResponse};

// Re-export shared types for convenience
pub use shared::{Certificate, CertificateDraft, CertificateStatus, ListEnvelope, LoginRequest, SignupRequest};
