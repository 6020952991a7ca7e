//! Certificate operations

use serde_json::Value;
use shared::{Certificate, CertificateDraft, CertificateStatus, ListEnvelope};

use crate::endpoint::{
    CREATE_CERTIFICATE, DELETE_CERTIFICATE, GET_ALL_CERTIFICATES, GET_CERTIFICATE_BY_ID, TOGGLE_CERTIFICATE,
    UPDATE_CERTIFICATE,
};
use crate::error::{ClientError, ClientResult};
use crate::normalize::NormalizedResponse;
use crate::query::{Invalidation, MutationInput, MutationOptions, QueryClient, QueryOptions};
use crate::request::{FormField, form_fields};

/// Multipart field name of the QR image
const QR_IMAGE_FIELD: &str = "qrImage";

/// QR image file attached to a create or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl QrImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).map(str::to_string);
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct CertificateApi {
    queries: QueryClient,
}

impl CertificateApi {
    pub fn new(queries: QueryClient) -> Self {
        Self { queries }
    }

    /// One page of certificates; unset paging leaves the backend defaults
    pub async fn list(&self, page: Option<u32>, limit: Option<u32>) -> ClientResult<ListEnvelope<Certificate>> {
        let mut options = QueryOptions::new();
        if let Some(page) = page {
            options = options.param("page", page);
        }
        if let Some(limit) = limit {
            options = options.param("limit", limit);
        }
        self.queries.fetch_list(GET_ALL_CERTIFICATES, &options).await
    }

    pub async fn get(&self, id: &str) -> ClientResult<Certificate> {
        let response = self
            .queries
            .fetch(GET_CERTIFICATE_BY_ID, &QueryOptions::new().slug(id))
            .await?;
        let body = &response.data;
        let record = match body.get("data") {
            Some(data @ Value::Object(_)) => data.clone(),
            _ if body.is_object() => body.clone(),
            _ => {
                return Err(ClientError::InvalidResponse(format!("certificate {id} has no record")));
            }
        };
        Ok(serde_json::from_value(record)?)
    }

    pub async fn create(&self, draft: &CertificateDraft, qr_image: Option<QrImage>) -> ClientResult<NormalizedResponse> {
        let input = MutationInput::new().data(draft_form(draft, qr_image)?);
        self.queries
            .mutate(CREATE_CERTIFICATE, &invalidating_list(), input)
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        draft: &CertificateDraft,
        qr_image: Option<QrImage>,
    ) -> ClientResult<NormalizedResponse> {
        let input = MutationInput::new().slug(id).data(draft_form(draft, qr_image)?);
        self.queries
            .mutate(UPDATE_CERTIFICATE, &invalidating_list(), input)
            .await
    }

    pub async fn delete(&self, id: &str) -> ClientResult<NormalizedResponse> {
        self.queries
            .mutate(DELETE_CERTIFICATE, &invalidating_list(), MutationInput::new().slug(id))
            .await
    }

    /// Set the status of one certificate
    pub async fn toggle(&self, id: &str, status: CertificateStatus) -> ClientResult<NormalizedResponse> {
        let input = MutationInput::new()
            .slug(id)
            .data(vec![FormField::text("status", status.as_str())]);
        self.queries
            .mutate(TOGGLE_CERTIFICATE, &invalidating_list(), input)
            .await
    }
}

fn invalidating_list() -> MutationOptions {
    MutationOptions::new().invalidate(Invalidation::endpoint(GET_ALL_CERTIFICATES))
}

/// Multipart fields of a draft; a new QR file replaces any stored path
pub fn draft_form(draft: &CertificateDraft, qr_image: Option<QrImage>) -> ClientResult<Vec<FormField>> {
    let mut fields = form_fields(&serde_json::to_value(draft)?);
    if let Some(qr) = qr_image {
        fields.retain(|field| field.name != QR_IMAGE_FIELD);
        fields.push(FormField::file(QR_IMAGE_FIELD, qr.file_name, qr.content_type, qr.bytes));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{Scripted, harness};
    use crate::request::{FormValue, RequestBody};
    use chrono::NaiveDate;
    use serde_json::json;

    fn draft() -> CertificateDraft {
        CertificateDraft {
            certificate_number: "C-100".into(),
            standard: "ISO 9001".into(),
            organization: "Acme".into(),
            date_of_issue: NaiveDate::from_ymd_opt(2024, 1, 15),
            qr_image: Some("/uploads/old.png".into()),
            ..Default::default()
        }
    }

    fn api(h: &crate::client::testing::Harness) -> CertificateApi {
        CertificateApi::new(QueryClient::new(h.client.clone()))
    }

    #[test]
    fn test_draft_form_replaces_qr_path() {
        let fields = draft_form(&draft(), None).unwrap();
        let text = |name: &str| {
            fields.iter().find(|f| f.name == name).map(|f| f.value.clone())
        };
        assert_eq!(text("date_of_issue"), Some(FormValue::Text("2024-01-15".into())));
        assert_eq!(text("qrImage"), Some(FormValue::Text("/uploads/old.png".into())));
        assert_eq!(text("date_of_expiry"), None);

        let fields = draft_form(&draft(), Some(QrImage::new("qr.PNG", vec![1, 2]))).unwrap();
        let qr: Vec<_> = fields.iter().filter(|f| f.name == "qrImage").collect();
        assert_eq!(qr.len(), 1);
        assert_eq!(
            qr[0].value,
            FormValue::File {
                file_name: "qr.PNG".into(),
                content_type: Some("image/png".into()),
                bytes: vec![1, 2],
            }
        );
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let h = harness(vec![
            Scripted::json(
                200,
                json!({
                    "data": [
                        { "_id": "a1", "certificate_number": "C-1", "status": "invalid" },
                        { "id": 2, "certificate_number": 12345, "status": true, "country": false },
                    ],
                    "pagination": { "current_page": 1, "last_page": 3, "per_page": 1, "total": 3 },
                }),
            ),
            Scripted::json(200, json!({ "data": { "id": 7, "standard": "ISO 14001" } })),
        ]);
        let api = api(&h);

        let page = api.list(Some(1), Some(1)).await.unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].record_id().as_deref(), Some("a1"));
        assert_eq!(page.data[0].status(), CertificateStatus::Invalid);
        assert_eq!(page.data[1].certificate_number.as_deref(), Some("12345"));
        assert_eq!(page.data[1].status(), CertificateStatus::Valid);
        assert_eq!(page.pagination_or_default().total, 3);

        let cert = api.get("7").await.unwrap();
        assert_eq!(cert.standard.as_deref(), Some("ISO 14001"));

        let sent = h.transport.sent();
        assert_eq!(
            sent[0].url,
            "https://api.example.com/api/certificate/getAllCertificates?limit=1&page=1"
        );
        assert_eq!(sent[1].url, "https://api.example.com/api/certificate/getCertificate/7");
    }

    #[tokio::test]
    async fn test_mutations_refresh_list() {
        let h = harness(vec![
            Scripted::json(200, json!({ "data": [] })),
            Scripted::json(200, json!({ "message": "Status updated" })),
            Scripted::json(200, json!({ "data": [{ "id": 1 }] })),
            Scripted::json(200, json!({ "message": "Deleted" })),
        ]);
        let api = api(&h);

        api.list(None, None).await.unwrap();
        api.toggle("1", CertificateStatus::Invalid).await.unwrap();
        assert_eq!(api.list(None, None).await.unwrap().data.len(), 1);
        api.delete("1").await.unwrap();

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 4);
        assert_eq!(
            sent[1].body,
            RequestBody::Multipart(vec![FormField::text("status", "invalid")])
        );
        assert_eq!(sent[3].method, http::Method::DELETE);
        assert_eq!(sent[3].body, RequestBody::Empty);
    }

    #[tokio::test]
    async fn test_create_and_update_are_multipart() {
        let h = harness(vec![
            Scripted::json(201, json!({ "message": "Created" })),
            Scripted::json(200, json!({ "message": "Updated" })),
        ]);
        let api = api(&h);
        api.create(&draft(), Some(QrImage::new("qr.png", vec![9]))).await.unwrap();
        api.update("5", &draft(), None).await.unwrap();

        let sent = h.transport.sent();
        assert_eq!(sent[0].method, http::Method::POST);
        assert_eq!(sent[1].method, http::Method::PUT);
        assert_eq!(sent[1].url, "https://api.example.com/api/certificate/updateCertificate/5");
        for request in &sent {
            assert!(matches!(request.body, RequestBody::Multipart(_)));
            assert!(request.headers.get("content-type").is_none());
        }
        assert_eq!(h.notifier.take().len(), 2);
    }

    #[tokio::test]
    async fn test_get_without_record_is_decode_error() {
        let h = harness(vec![Scripted::json(200, json!(null))]);
        let err = api(&h).get("1").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Decode);
    }
}
