//! Status updater tests against a mocked BigQuery REST endpoint.

use std::sync::Arc;

use lead_status::leads::StatusUpdate;
use lead_status::status::EmailStatus;
use lead_status::updater::StatusUpdater;
use lead_status::warehouse::auth::StaticToken;
use lead_status::warehouse::{BigQueryClient, BigQueryOptions, TableRef};
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUERIES_PATH: &str = "/projects/n8n-revenueinstitute/queries";

const TABLE_NOT_FOUND: &str =
    "Not found: Table n8n-revenueinstitute:outbound_sales.leads was not found in location US";

fn client_for(server: &MockServer) -> BigQueryClient {
    let options = BigQueryOptions::default().with_api_base(server.uri());
    BigQueryClient::new(
        "n8n-revenueinstitute",
        Arc::new(StaticToken::new("ya29.test")),
        options,
    )
    .unwrap()
}

fn table() -> TableRef {
    TableRef::new("n8n-revenueinstitute", "outbound_sales", "leads").unwrap()
}

fn dml_response(affected: &str) -> serde_json::Value {
    json!({
        "jobReference": {"projectId": "n8n-revenueinstitute", "jobId": "job_dml"},
        "jobComplete": true,
        "numDmlAffectedRows": affected
    })
}

#[tokio::test]
async fn test_update_one_over_rest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .and(header("authorization", "Bearer ya29.test"))
        .and(body_string_contains("UPDATE `n8n-revenueinstitute.outbound_sales.leads`"))
        .and(body_partial_json(json!({
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": [
                {"name": "email", "parameterType": {"type": "STRING"}, "parameterValue": {"value": "john@example.com"}},
                {"name": "status", "parameterType": {"type": "STRING"}, "parameterValue": {"value": "verified"}}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(dml_response("1")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let updater = StatusUpdater::new(&client, table());

    updater.update_one("john@example.com", "verified").await.unwrap();
}

#[tokio::test]
async fn test_bulk_update_is_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .and(body_string_contains("ELSE email_status"))
        .and(body_string_contains("@status2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dml_response("3")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let updater = StatusUpdater::new(&client, table());

    updater
        .update_many(&[
            StatusUpdate::new("john@example.com", "verified"),
            StatusUpdate::new("jane@company.com", "invalid"),
            StatusUpdate::new("team@startup.io", "accept_all"),
        ])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_validation_failure_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dml_response("0")))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let updater = StatusUpdater::new(&client, table());

    let err = updater
        .update_many(&[StatusUpdate::new("a@x.com", "unknown")])
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_get_one_over_rest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .and(body_string_contains("LIMIT 1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobReference": {"projectId": "n8n-revenueinstitute", "jobId": "job_get"},
            "jobComplete": true,
            "schema": {"fields": [
                {"name": "email", "type": "STRING"},
                {"name": "email_status", "type": "STRING"},
                {"name": "trackingId", "type": "STRING"}
            ]},
            "rows": [{"f": [{"v": "john@example.com"}, {"v": "accept_all"}, {"v": "trk_1"}]}],
            "totalRows": "1"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let updater = StatusUpdater::new(&client, table());

    let lead = updater.get_one("John@Example.com").await.unwrap().unwrap();
    assert_eq!(lead.email, "john@example.com");
    assert_eq!(lead.status(), Some(EmailStatus::AcceptAll));
    assert_eq!(lead.tracking_id.as_deref(), Some("trk_1"));
}

#[tokio::test]
async fn test_status_counts_over_rest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .and(body_string_contains("GROUP BY email_status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobReference": {"projectId": "n8n-revenueinstitute", "jobId": "job_counts"},
            "jobComplete": true,
            "schema": {"fields": [
                {"name": "email_status", "type": "STRING"},
                {"name": "count", "type": "INTEGER"}
            ]},
            "rows": [
                {"f": [{"v": "unverified"}, {"v": "1520"}]},
                {"f": [{"v": "verified"}, {"v": "311"}]},
                {"f": [{"v": null}, {"v": "4"}]}
            ],
            "totalRows": "3"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let updater = StatusUpdater::new(&client, table());

    let counts = updater.status_counts().await.unwrap();
    assert_eq!(counts.len(), 3);
    assert_eq!(counts[0].status(), Some(EmailStatus::Unverified));
    assert_eq!(counts[0].count, 1520);
    assert_eq!(counts[2].email_status, None);
    assert_eq!(counts[2].count, 4);
}

#[tokio::test]
async fn test_remote_error_message_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": 404,
                "message": TABLE_NOT_FOUND,
                "status": "NOT_FOUND"
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let updater = StatusUpdater::new(&client, table());

    let err = updater.get_one("john@example.com").await.unwrap_err();
    assert_eq!(err.category(), "Remote Execution Error");
    assert!(err.to_string().ends_with(TABLE_NOT_FOUND));
}
