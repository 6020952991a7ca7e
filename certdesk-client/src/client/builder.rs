//! Builder for [`ApiClient`] construction.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::expiry::{AutoAcknowledge, ExpiryPrompt, SessionExpiryHandler};
use crate::normalize::ResponseNormalizer;
use crate::notify::{Notifier, TracingNotifier};
use crate::session::{
    FileStorage, LogNavigator, Navigator, SessionCipher, SessionContext, SessionStore, StorageBackend,
};
use crate::transport::{ReqwestTransport, Transport};

use super::{ApiClient, Inner};

/// Builder for [`ApiClient`].
///
/// Everything not set falls back to the configuration: reqwest transport,
/// file storage under `storage_dir`, tracing notifications.
///
/// # Example
///
/// ```no_run
/// use certdesk_client::{ApiClient, ClientConfig};
///
/// let client = ApiClient::builder()
///     .config(ClientConfig::from_env()?)
///     .build()?;
/// # Ok::<(), certdesk_client::ClientError>(())
/// ```
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    base_url: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    notifier: Option<Arc<dyn Notifier>>,
    prompt: Option<Arc<dyn ExpiryPrompt>>,
    navigator: Option<Arc<dyn Navigator>>,
    storage: Option<Arc<dyn StorageBackend>>,
    cipher: Option<SessionCipher>,
    context: Option<SessionContext>,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the configured base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the blocking session-expiry prompt.
    pub fn prompt(mut self, prompt: Arc<dyn ExpiryPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Overrides the cipher derived from the configured storage secret
    pub fn cipher(mut self, cipher: SessionCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Shares an existing session holder
    pub fn context(mut self, context: SessionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` for an empty base URL, or the transport
    /// error if the default reqwest client cannot be created.
    pub fn build(self) -> ClientResult<ApiClient> {
        let config = self.config.unwrap_or_default();

        let base_url = match self.base_url {
            Some(url) => format!("{}/", url.trim_end_matches('/')),
            None => config.normalized_base_url(),
        };
        if base_url == "/" {
            return Err(ClientError::Config("base_url is required".into()));
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(config.timeout.map(Duration::from_secs))?),
        };
        let storage: Arc<dyn StorageBackend> = self
            .storage
            .unwrap_or_else(|| Arc::new(FileStorage::new(config.storage_dir.clone())));
        let cipher = self
            .cipher
            .unwrap_or_else(|| SessionCipher::new(config.storage_secret.clone()));
        let navigator = self.navigator.unwrap_or_else(|| Arc::new(LogNavigator));
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier));
        let prompt = self.prompt.unwrap_or_else(|| Arc::new(AutoAcknowledge));

        let store = Arc::new(SessionStore::new(
            storage,
            cipher,
            self.context.unwrap_or_default(),
            navigator,
        ));
        let expiry = SessionExpiryHandler::new(prompt, store.clone());
        let normalizer = ResponseNormalizer::new(notifier.clone(), expiry);

        tracing::debug!(base_url = %base_url, "API client ready");

        Ok(ApiClient {
            inner: Arc::new(Inner {
                base_url,
                transport,
                notifier,
                store,
                normalizer,
            }),
        })
    }
}
