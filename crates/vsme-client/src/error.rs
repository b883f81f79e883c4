use std::path::PathBuf;

use thiserror::Error;
use vsme_spec::ReadinessIssue;

/// Everything that can stop a submission. `Display` is the message shown to
/// the user.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Please correct the invalid fields before submitting: {}", field_list(.0))]
    InvalidFields(Vec<ReadinessIssue>),
    #[error("Please fill in at least one field before generating the report.")]
    EmptyPayload,
    #[error("A submission is already in progress.")]
    AlreadySubmitting,
    #[error(
        "Connection error: the report service at {base_url} is not reachable. Make sure the server is running and try again."
    )]
    Unreachable { base_url: String, detail: String },
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("{0}")]
    Rejected(String),
    #[error("could not encode the request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not build the report filename: {0}")]
    Filename(#[from] handlebars::RenderError),
    #[error("could not write the report to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SubmitError {
    /// True when the request never reached the server.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SubmitError::Unreachable { .. })
    }
}

fn field_list(issues: &[ReadinessIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{} ({})", issue.datapoint_id, issue.error.message))
        .collect::<Vec<_>>()
        .join("; ")
}
