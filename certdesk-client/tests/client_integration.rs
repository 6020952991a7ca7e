// certdesk-client/tests/client_integration.rs
// End-to-end against a mock backend

use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use certdesk_client::session::LogNavigator;
use certdesk_client::{
    ApiClient, AuthApi, CertificateApi, CertificateStatus, ClientConfig, ErrorKind, ExpiryNotice, ExpiryPrompt,
    FileStorage, LoginRequest, QueryClient, RecordingNotifier, SESSION_KEY, SessionCipher,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct CountingPrompt(AtomicUsize);

#[async_trait]
impl ExpiryPrompt for CountingPrompt {
    async fn acknowledge(&self, _notice: &ExpiryNotice) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Setup {
    client: ApiClient,
    notifier: Arc<RecordingNotifier>,
    prompt: Arc<CountingPrompt>,
    storage_dir: TempDir,
}

fn setup(server: &MockServer) -> Setup {
    let storage_dir = TempDir::new().unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    let prompt = Arc::new(CountingPrompt::default());
    let config = ClientConfig::new(format!("{}/api", server.uri()))
        .with_storage_dir(storage_dir.path())
        .with_timeout(5);

    let client = ApiClient::builder()
        .config(config)
        .notifier(notifier.clone())
        .prompt(prompt.clone())
        .navigator(Arc::new(LogNavigator))
        .storage(Arc::new(FileStorage::new(storage_dir.path())))
        .cipher(SessionCipher::with_iterations("integration", NonZeroU32::new(1_000).unwrap()))
        .build()
        .unwrap();

    Setup {
        client,
        notifier,
        prompt,
        storage_dir,
    }
}

#[tokio::test]
async fn test_login_list_toggle_then_expire() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "token": "t1", "firstName": "Ada", "email": "ada@example.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/certificate/getAllCertificates"))
        .and(query_param("page", "1"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-total-count", "1")
                .set_body_json(json!({
                    "data": [{ "id": 11, "certificate_number": "C-11", "status": "valid" }],
                    "pagination": { "current_page": 1, "last_page": 1, "per_page": 10, "total": 1 }
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/certificate/toggleCertificate/11"))
        .and(header("authorization", "Bearer t1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-status-message", "Certificate status updated")
                .set_body_json(json!({ "data": { "id": 11, "status": "invalid" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/certificate/deleteCertificate/11"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "errorKey": "TOKEN_EXPIRED" })))
        .expect(1)
        .mount(&server)
        .await;

    let s = setup(&server);
    let queries = QueryClient::new(s.client.clone());
    let auth = AuthApi::new(queries.clone());
    let certificates = CertificateApi::new(queries.clone());

    let session = auth.login(&LoginRequest::new("ada@example.com", "secret")).await.unwrap();
    assert_eq!(session.display_name().as_deref(), Some("Ada"));
    assert!(s.storage_dir.path().join("session.blob").exists());

    let page = certificates.list(Some(1), None).await.unwrap();
    assert_eq!(page.data.len(), 1);
    let id = page.data[0].record_id().unwrap();
    assert_eq!(id, "11");

    certificates.toggle(&id, CertificateStatus::Invalid).await.unwrap();
    let seen = s.notifier.take();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].description, "Certificate status updated");

    let err = certificates.delete(&id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(s.prompt.0.load(Ordering::SeqCst), 1);
    assert!(!s.client.context().is_authenticated());
    assert!(!s.storage_dir.path().join("session.blob").exists());
    assert!(s.client.store().load(SESSION_KEY).is_empty());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("access_token", "Bearer hdr-token")
                .set_body_json(json!({ "data": { "firstName": "Lin" } })),
        )
        .mount(&server)
        .await;

    let s = setup(&server);
    AuthApi::new(QueryClient::new(s.client.clone()))
        .login(&LoginRequest::new("lin@example.com", "pw"))
        .await
        .unwrap();

    // A second client over the same directory restores the session
    let restarted = ApiClient::builder()
        .config(ClientConfig::new(server.uri()))
        .storage(Arc::new(FileStorage::new(s.storage_dir.path())))
        .cipher(SessionCipher::with_iterations("integration", NonZeroU32::new(1_000).unwrap()))
        .build()
        .unwrap();
    let restored = restarted.store().restore();
    assert_eq!(restored.token(), Some("hdr-token"));
    assert_eq!(restarted.context().token().as_deref(), Some("hdr-token"));
}

#[tokio::test]
async fn test_validation_failure_is_notified_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/certificate/create"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": ["A is required", "B is required"] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let s = setup(&server);
    let certificates = CertificateApi::new(QueryClient::new(s.client.clone()));
    let err = certificates
        .create(&Default::default(), None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    let seen = s.notifier.take();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|n| n.title == "Validation Error"));
}
