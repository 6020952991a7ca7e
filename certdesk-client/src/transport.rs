//! HTTP transport
//!
//! The transport only moves bytes. Status and headers are available as soon
//! as the response head arrives; the body is read afterwards.

use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use reqwest::Client;
use reqwest::multipart::{Form, Part};

use crate::error::ClientResult;
use crate::request::{FormField, FormValue, PreparedRequest, RequestBody};

/// Response head plus a lazily read body
#[async_trait]
pub trait TransportResponse: Send {
    fn status(&self) -> StatusCode;
    fn headers(&self) -> &HeaderMap;
    /// Consume the response and read the whole body
    async fn into_body(self: Box<Self>) -> ClientResult<Vec<u8>>;
}

/// Sends prepared requests
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PreparedRequest) -> ClientResult<Box<dyn TransportResponse>>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// No request timeout unless one is given
    pub fn new(timeout: Option<Duration>) -> ClientResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn multipart_form(fields: Vec<FormField>) -> ClientResult<Form> {
    let mut form = Form::new();
    for field in fields {
        form = match field.value {
            FormValue::Text(text) => form.text(field.name, text),
            FormValue::File {
                file_name,
                content_type,
                bytes,
            } => {
                let mut part = Part::bytes(bytes).file_name(file_name);
                if let Some(mime) = content_type {
                    part = part.mime_str(&mime)?;
                }
                form.part(field.name, part)
            }
        };
    }
    Ok(form)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> ClientResult<Box<dyn TransportResponse>> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(json) => builder.body(json),
            RequestBody::Multipart(fields) => builder.multipart(multipart_form(fields)?),
        };

        let response = builder.send().await?;
        Ok(Box::new(ReqwestResponse(response)))
    }
}

struct ReqwestResponse(reqwest::Response);

#[async_trait]
impl TransportResponse for ReqwestResponse {
    fn status(&self) -> StatusCode {
        self.0.status()
    }

    fn headers(&self) -> &HeaderMap {
        self.0.headers()
    }

    async fn into_body(self: Box<Self>) -> ClientResult<Vec<u8>> {
        Ok(self.0.bytes().await?.to_vec())
    }
}

/// Response assembled in memory, for custom transports
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }
}

#[async_trait]
impl TransportResponse for BufferedResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    async fn into_body(self: Box<Self>) -> ClientResult<Vec<u8>> {
        Ok(self.body)
    }
}
