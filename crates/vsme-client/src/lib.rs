#![allow(missing_docs)]

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod filename;
pub mod session;
pub mod transport;

pub use client::{LegacyReceipt, Report, ReportClient, XLSX_MEDIA_TYPE};
pub use config::{BASE_URL_ENV, ClientConfig, DEFAULT_BASE_URL};
pub use download::save_report;
pub use error::SubmitError;
pub use filename::{DEFAULT_FILENAME_TEMPLATE, default_filename, filename_from_disposition};
pub use session::{SubmissionFlag, SubmissionGuard, TOTAL_STEPS, WizardSession};
pub use transport::{HttpTransport, RawResponse, ReportTransport, TransportFailure};
