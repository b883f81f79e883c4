use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};

use vsme_client::{
    ClientConfig, RawResponse, ReportClient, ReportTransport, SubmissionFlag, SubmitError,
    TransportFailure, WizardSession, XLSX_MEDIA_TYPE,
};
use vsme_spec::{PayloadEntry, WizardState};

#[derive(Debug, Clone)]
struct Call {
    url: String,
    accept: String,
    body: Value,
    flag_set: Option<bool>,
}

#[derive(Clone)]
enum Reply {
    Respond(RawResponse),
    Fail(&'static str),
}

/// In-memory transport recording every request.
#[derive(Clone)]
struct FakeTransport {
    reply: Reply,
    calls: Arc<Mutex<Vec<Call>>>,
    flag: Option<SubmissionFlag>,
}

impl FakeTransport {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Arc::new(Mutex::new(Vec::new())),
            flag: None,
        }
    }

    fn watching(mut self, flag: SubmissionFlag) -> Self {
        self.flag = Some(flag);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportTransport for FakeTransport {
    async fn post_json(
        &self,
        url: &str,
        accept: &str,
        body: Vec<u8>,
    ) -> Result<RawResponse, TransportFailure> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            accept: accept.to_string(),
            body: serde_json::from_slice(&body).unwrap(),
            flag_set: self.flag.as_ref().map(SubmissionFlag::is_set),
        });
        match &self.reply {
            Reply::Respond(response) => Ok(response.clone()),
            Reply::Fail(message) => Err(TransportFailure(message.to_string())),
        }
    }
}

fn spreadsheet(disposition: Option<&str>) -> Reply {
    Reply::Respond(RawResponse {
        status: 200,
        reason: Some("OK".into()),
        content_disposition: disposition.map(str::to_string),
        body: b"PK\x03\x04sheet".to_vec(),
    })
}

fn error_response(status: u16, reason: &str, body: &str) -> Reply {
    Reply::Respond(RawResponse {
        status,
        reason: Some(reason.into()),
        content_disposition: None,
        body: body.as_bytes().to_vec(),
    })
}

fn client(transport: &FakeTransport) -> ReportClient<FakeTransport> {
    ReportClient::with_transport(ClientConfig::new("http://reports.test"), transport.clone())
}

fn filled_state() -> WizardState {
    WizardState::default().update_general_information(|general| {
        general.entity_name = "Acme GmbH".into();
        general.reporting_period_start = NaiveDate::from_ymd_opt(2024, 1, 1);
    })
}

#[tokio::test]
async fn report_request_posts_flat_payload() {
    let transport = FakeTransport::new(spreadsheet(Some(
        r#"attachment; filename="Acme_VSME.xlsx""#,
    )));
    let payload = vec![PayloadEntry::new("entityName", "Acme GmbH")];

    let report = client(&transport).generate_report(&payload).await.unwrap();
    assert_eq!(report.filename, "Acme_VSME.xlsx");
    assert_eq!(report.bytes, b"PK\x03\x04sheet");

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "http://reports.test/excel-update");
    assert_eq!(calls[0].accept, XLSX_MEDIA_TYPE);
    assert_eq!(
        calls[0].body,
        json!([{ "datapointId": "entityName", "values": "Acme GmbH" }])
    );
}

#[tokio::test]
async fn missing_filename_falls_back_to_dated_default() {
    let transport = FakeTransport::new(spreadsheet(None));
    let payload = vec![PayloadEntry::new("turnover", "10")];
    let today = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();

    let report = client(&transport)
        .generate_report_on(&payload, today)
        .await
        .unwrap();
    assert_eq!(report.filename, "VSME_Report_2025-06-30.xlsx");
}

#[tokio::test]
async fn server_message_is_surfaced() {
    let transport = FakeTransport::new(error_response(
        422,
        "Unprocessable Entity",
        r#"{"message":"Unknown datapoint: foo"}"#,
    ));
    let payload = vec![PayloadEntry::new("foo", "1")];

    let error = client(&transport).generate_report(&payload).await.unwrap_err();
    assert!(matches!(error, SubmitError::Server { status: 422, .. }));
    assert_eq!(error.to_string(), "Unknown datapoint: foo");
}

#[tokio::test]
async fn unreadable_error_body_uses_status_line() {
    let transport = FakeTransport::new(error_response(502, "Bad Gateway", "<html>oops</html>"));
    let payload = vec![PayloadEntry::new("foo", "1")];

    let error = client(&transport).generate_report(&payload).await.unwrap_err();
    assert_eq!(error.to_string(), "Server error: 502 Bad Gateway");
    assert!(!error.is_connectivity());
}

#[tokio::test]
async fn network_failure_reports_connectivity_and_clears_flag() {
    let mut session = WizardSession::new(filled_state());
    let transport =
        FakeTransport::new(Reply::Fail("connection refused")).watching(session.submission_flag());

    let error = session.submit(&client(&transport)).await.unwrap_err();
    assert!(error.is_connectivity());
    assert!(!session.is_submitting());
    assert_eq!(transport.calls()[0].flag_set, Some(true));

    let message = session.last_error().unwrap();
    assert!(message.starts_with("Connection error"));
    assert!(message.contains("http://reports.test"));
}

#[tokio::test]
async fn empty_state_is_rejected_before_any_request() {
    let mut session = WizardSession::default();
    let transport = FakeTransport::new(spreadsheet(None));

    let error = session.submit(&client(&transport)).await.unwrap_err();
    assert!(matches!(error, SubmitError::EmptyPayload));
    assert!(transport.calls().is_empty());
    assert!(!session.is_submitting());
    assert!(session.last_error().is_some());
}

#[tokio::test]
async fn invalid_entity_name_blocks_submission() {
    let mut session = WizardSession::new(
        WizardState::default()
            .update_general_information(|general| general.entity_name = "A".into()),
    );
    let transport = FakeTransport::new(spreadsheet(None));

    let error = session.submit(&client(&transport)).await.unwrap_err();
    assert!(matches!(error, SubmitError::InvalidFields(ref issues) if issues.len() == 1));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn second_submission_is_refused_while_one_is_in_flight() {
    let mut session = WizardSession::new(filled_state());
    let transport = FakeTransport::new(spreadsheet(None));
    let in_flight = session.submission_flag().acquire().unwrap();

    let error = session.submit(&client(&transport)).await.unwrap_err();
    assert!(matches!(error, SubmitError::AlreadySubmitting));
    assert!(transport.calls().is_empty());

    drop(in_flight);
    let report = session.submit(&client(&transport)).await.unwrap();
    assert!(report.filename.starts_with("VSME_Report_"));
    assert!(session.last_error().is_none());
    assert!(!session.is_submitting());
}

#[tokio::test]
async fn legacy_submission_posts_nested_state() {
    let transport = FakeTransport::new(Reply::Respond(RawResponse {
        status: 200,
        reason: Some("OK".into()),
        content_disposition: None,
        body: br#"{"success":true,"message":"stored","timestamp":"2024-05-01T10:00:00"}"#.to_vec(),
    }));
    let mut session = WizardSession::new(filled_state());

    let receipt = session.submit_legacy(&client(&transport)).await.unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.message.as_deref(), Some("stored"));

    let calls = transport.calls();
    assert_eq!(calls[0].url, "http://reports.test/api/submit");
    let general = &calls[0].body["generalInformation"];
    assert_eq!(general["entityName"], "Acme GmbH");
    assert_eq!(general["reportingPeriodStart"], "2024-01-01");
    assert_eq!(general["reportingPeriodEnd"], Value::Null);
}

#[tokio::test]
async fn legacy_rejection_uses_server_message() {
    let transport = FakeTransport::new(Reply::Respond(RawResponse {
        status: 200,
        reason: Some("OK".into()),
        content_disposition: None,
        body: br#"{"success":false,"message":"Entity name missing"}"#.to_vec(),
    }));
    let mut session = WizardSession::new(filled_state());

    let error = session.submit_legacy(&client(&transport)).await.unwrap_err();
    assert!(matches!(error, SubmitError::Rejected(_)));
    assert_eq!(session.last_error(), Some("Entity name missing"));
}
