//! API client
//!
//! Single entry point for backend calls: build, send, normalize.

mod builder;

pub use builder::ApiClientBuilder;

use std::sync::Arc;

use crate::error::{ClientError, ClientResult};
use crate::normalize::{NormalizeContext, NormalizedResponse, ResponseNormalizer};
use crate::notify::{Notification, Notifier};
use crate::request::{self, RequestOptions};
use crate::session::{SessionContext, SessionStore};
use crate::transport::Transport;

const NETWORK_ERROR_TITLE: &str = "Network Error";
const NETWORK_ERROR_FALLBACK: &str = "Failed to connect to the server. Please check your internet connection.";

/// Backend client
///
/// Cheap to clone; clones share the session, transport and notifier.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: String,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    store: Arc<SessionStore>,
    normalizer: ResponseNormalizer,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Process-wide session
    pub fn context(&self) -> &SessionContext {
        self.inner.store.context()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.inner.notifier
    }

    /// Call a registered operation
    ///
    /// Unknown operations fail before anything is sent and are never
    /// notified. Transport failures are notified as network errors; HTTP
    /// failures are notified by the normalizer.
    pub async fn request(&self, name: &str, options: RequestOptions) -> ClientResult<NormalizedResponse> {
        let token = self.context().token();
        let prepared = request::build(&self.inner.base_url, name, &options, token.as_deref())?;

        let ctx = NormalizeContext {
            endpoint: name.to_string(),
            method: prepared.method.clone(),
            show_success_notification: options.show_success_notification,
        };
        tracing::debug!(endpoint = %name, method = %ctx.method, url = %prepared.url, "Sending request");

        let response = match self.inner.transport.send(prepared).await {
            Ok(response) => response,
            Err(e) => {
                self.notify_network_error(name, &e);
                return Err(e);
            }
        };

        match self.inner.normalizer.normalize(response, &ctx).await {
            Err(e @ (ClientError::Http(_) | ClientError::Network(_))) => {
                self.notify_network_error(name, &e);
                Err(e)
            }
            other => other,
        }
    }

    fn notify_network_error(&self, name: &str, error: &ClientError) {
        tracing::error!(endpoint = %name, error = %error, "Network error");
        let description = match error.to_string() {
            text if text.is_empty() => NETWORK_ERROR_FALLBACK.to_string(),
            text => text,
        };
        self.inner
            .notifier
            .notify(Notification::error(NETWORK_ERROR_TITLE, description));
    }
}
