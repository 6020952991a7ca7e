//! Session-expiry handling
//!
//! A 401 ends the session: the user acknowledges a blocking notice, then
//! storage is wiped and the app returns to its login entry point.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::session::SessionStore;

pub const EXPIRED_TITLE: &str = "Session Expired";
pub const EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Content of the expiry notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryNotice {
    pub title: String,
    pub message: String,
}

impl ExpiryNotice {
    /// Notice for a 401 body; `errorDesc` wins over the stock text
    pub fn from_body(body: &Value) -> Self {
        let message = body
            .get("errorDesc")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(EXPIRED_MESSAGE);
        Self {
            title: EXPIRED_TITLE.to_string(),
            message: message.to_string(),
        }
    }
}

/// Blocking acknowledgment of the expiry notice
///
/// Acknowledging is the only way out; implementations must not offer cancel.
#[async_trait]
pub trait ExpiryPrompt: Send + Sync {
    async fn acknowledge(&self, notice: &ExpiryNotice);
}

/// Prompt that acknowledges immediately, logging the notice
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoAcknowledge;

#[async_trait]
impl ExpiryPrompt for AutoAcknowledge {
    async fn acknowledge(&self, notice: &ExpiryNotice) {
        tracing::warn!(title = %notice.title, "{}", notice.message);
    }
}

/// Runs the expiry flow for 401 responses
#[derive(Clone)]
pub struct SessionExpiryHandler {
    prompt: Arc<dyn ExpiryPrompt>,
    store: Arc<SessionStore>,
}

impl SessionExpiryHandler {
    pub fn new(prompt: Arc<dyn ExpiryPrompt>, store: Arc<SessionStore>) -> Self {
        Self { prompt, store }
    }

    /// Present the notice, wait for acknowledgment, then clear the session
    pub async fn handle(&self, endpoint: &str, body: &Value) {
        let error_key = body.get("errorKey").and_then(serde_json::Value::as_str);
        let error_desc = body.get("errorDesc").and_then(serde_json::Value::as_str);
        tracing::error!(
            endpoint = %endpoint,
            error_key = ?error_key,
            error_desc = ?error_desc,
            had_token = self.store.context().is_authenticated(),
            "401 Unauthorized"
        );

        let notice = ExpiryNotice::from_body(body);
        self.prompt.acknowledge(&notice).await;
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryStorage, Navigator, SESSION_KEY, Session, SessionCipher, SessionContext};
    use serde_json::{Map, json};
    use std::num::NonZeroU32;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingPrompt(Mutex<Vec<ExpiryNotice>>);

    #[async_trait]
    impl ExpiryPrompt for RecordingPrompt {
        async fn acknowledge(&self, notice: &ExpiryNotice) {
            self.0.lock().unwrap().push(notice.clone());
        }
    }

    #[derive(Default)]
    struct CountingNavigator(AtomicUsize);

    impl Navigator for CountingNavigator {
        fn redirect_to_login(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_notice_text() {
        assert_eq!(ExpiryNotice::from_body(&json!({})).message, EXPIRED_MESSAGE);
        assert_eq!(ExpiryNotice::from_body(&json!(null)).message, EXPIRED_MESSAGE);
        let notice = ExpiryNotice::from_body(&json!({ "errorDesc": "Token revoked" }));
        assert_eq!(notice.title, EXPIRED_TITLE);
        assert_eq!(notice.message, "Token revoked");
    }

    #[tokio::test]
    async fn test_handle_prompts_then_clears() {
        let storage = Arc::new(MemoryStorage::new());
        let navigator = Arc::new(CountingNavigator::default());
        let cipher = SessionCipher::with_iterations("s", NonZeroU32::new(1_000).unwrap());
        let context = SessionContext::with_session(Session::authenticated("abc", Map::new()));
        let store = Arc::new(SessionStore::new(storage.clone(), cipher, context, navigator.clone()));
        store.persist_current();
        assert!(store.load_checked(SESSION_KEY).unwrap().is_some());

        let prompt = Arc::new(RecordingPrompt::default());
        let handler = SessionExpiryHandler::new(prompt.clone(), store.clone());
        handler.handle("getAllCertificates", &json!({ "errorKey": "E401" })).await;

        assert_eq!(prompt.0.lock().unwrap().len(), 1);
        assert!(store.context().snapshot().is_empty());
        assert!(storage.is_empty());
        assert_eq!(navigator.0.load(Ordering::SeqCst), 1);
    }
}
