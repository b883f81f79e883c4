use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vsme_spec::{PayloadEntry, WizardState};

use crate::config::{ClientConfig, LEGACY_SUBMIT_PATH, REPORT_PATH};
use crate::error::SubmitError;
use crate::filename::{default_filename, filename_from_disposition};
use crate::transport::{HttpTransport, RawResponse, ReportTransport};

pub const XLSX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const JSON_MEDIA_TYPE: &str = "application/json";

/// A generated spreadsheet and the name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Body returned by the legacy submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyReceipt {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct ReportClient<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
}

impl ReportClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, HttpTransport::default())
    }
}

impl<T: ReportTransport> ReportClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send the flattened payload and return the generated spreadsheet. An
    /// empty payload is rejected without contacting the server.
    pub async fn generate_report(&self, payload: &[PayloadEntry]) -> Result<Report, SubmitError> {
        self.generate_report_on(payload, Local::now().date_naive()).await
    }

    /// Like [`generate_report`](Self::generate_report), with `today` used for
    /// the fallback filename.
    pub async fn generate_report_on(
        &self,
        payload: &[PayloadEntry],
        today: NaiveDate,
    ) -> Result<Report, SubmitError> {
        if payload.is_empty() {
            return Err(SubmitError::EmptyPayload);
        }
        let body = serde_json::to_vec(payload)?;
        info!(entries = payload.len(), "requesting report");

        let response = self.post(REPORT_PATH, XLSX_MEDIA_TYPE, body).await?;
        if !response.is_success() {
            return Err(server_error(&response));
        }

        let filename = match response
            .content_disposition
            .as_deref()
            .and_then(filename_from_disposition)
        {
            Some(name) => name,
            None => default_filename(self.config.filename_template(), today)?,
        };
        info!(filename = %filename, bytes = response.body.len(), "report received");
        Ok(Report {
            filename,
            bytes: response.body,
        })
    }

    /// Post the nested wizard state to the legacy endpoint.
    pub async fn submit_legacy(&self, state: &WizardState) -> Result<LegacyReceipt, SubmitError> {
        let body = serde_json::to_vec(state)?;
        let response = self.post(LEGACY_SUBMIT_PATH, JSON_MEDIA_TYPE, body).await?;
        if !response.is_success() {
            return Err(server_error(&response));
        }

        let receipt: LegacyReceipt = serde_json::from_slice(&response.body).map_err(|error| {
            warn!(%error, "unreadable legacy submission response");
            SubmitError::Rejected("The server returned an unreadable response.".into())
        })?;
        if !receipt.success {
            return Err(SubmitError::Rejected(
                receipt
                    .message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| "The server could not process the data.".into()),
            ));
        }
        info!(timestamp = ?receipt.timestamp, "legacy submission accepted");
        Ok(receipt)
    }

    async fn post(&self, path: &str, accept: &str, body: Vec<u8>) -> Result<RawResponse, SubmitError> {
        let url = self.config.endpoint(path);
        debug!(%url, bytes = body.len(), "posting");
        self.transport
            .post_json(&url, accept, body)
            .await
            .map_err(|failure| {
                warn!(%url, error = %failure, "report service unreachable");
                SubmitError::Unreachable {
                    base_url: self.config.base_url().to_string(),
                    detail: failure.to_string(),
                }
            })
    }
}

/// Message from a JSON `{message}` body, else `Server error: <status> <reason>`.
fn server_error(response: &RawResponse) -> SubmitError {
    let message = serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            let reason = response.reason.as_deref().unwrap_or_default();
            format!("Server error: {} {}", response.status, reason)
                .trim_end()
                .to_string()
        });
    warn!(status = response.status, %message, "report service returned an error");
    SubmitError::Server {
        status: response.status,
        message,
    }
}
