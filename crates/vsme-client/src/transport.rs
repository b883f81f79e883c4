use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE};
use thiserror::Error;

/// Response as seen by the client: status line, the filename header and the
/// raw body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request could not be delivered or its response could not be read.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportFailure(pub String);

/// Posts JSON bodies to the report service.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        accept: &str,
        body: Vec<u8>,
    ) -> Result<RawResponse, TransportFailure>;
}

/// `reqwest` backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReportTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        accept: &str,
        body: Vec<u8>,
    ) -> Result<RawResponse, TransportFailure> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, accept)
            .body(body)
            .send()
            .await
            .map_err(|error| TransportFailure(error.to_string()))?;

        let status = response.status();
        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|error| TransportFailure(error.to_string()))?;

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            content_disposition,
            body: body.to_vec(),
        })
    }
}
