//! Status updater tests against the in-memory warehouse.
//!
//! Exercises the full path: statement building, parameter binding and
//! result decoding, with the memory backend evaluating the statements.

use lead_status::leads::{LeadRecord, StatusCount, StatusUpdate};
use lead_status::status::EmailStatus;
use lead_status::updater::StatusUpdater;
use lead_status::warehouse::{MemoryWarehouse, TableRef};

fn table() -> TableRef {
    TableRef::new("n8n-revenueinstitute", "outbound_sales", "leads").unwrap()
}

fn sample_leads() -> MemoryWarehouse {
    MemoryWarehouse::with_leads(vec![
        LeadRecord::new("john@example.com", Some("unverified"), Some("trk_1")),
        LeadRecord::new("Jane@Company.com", Some("unverified"), Some("trk_2")),
        LeadRecord::new("team@startup.io", None, None),
        LeadRecord::new("ops@startup.io", Some("unverified"), Some("trk_4")),
        LeadRecord::new("sales@acme.com", Some("verified"), Some("trk_5")),
    ])
}

fn status_of(warehouse: &MemoryWarehouse, email: &str) -> Option<String> {
    warehouse
        .leads()
        .unwrap()
        .into_iter()
        .find(|lead| lead.email == email)
        .and_then(|lead| lead.email_status)
}

#[tokio::test]
async fn test_update_then_get_round_trip() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    updater.update_one("john@example.com", "verified").await.unwrap();

    let lead = updater.get_one("john@example.com").await.unwrap().unwrap();
    assert_eq!(lead.status(), Some(EmailStatus::Verified));
    assert_eq!(lead.tracking_id.as_deref(), Some("trk_1"));
}

#[tokio::test]
async fn test_email_matching_ignores_case_and_whitespace() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    updater
        .update_one("  JANE@company.COM ", "invalid")
        .await
        .unwrap();

    assert_eq!(status_of(&warehouse, "Jane@Company.com").as_deref(), Some("invalid"));

    let lead = updater.get_one("jane@company.com").await.unwrap().unwrap();
    assert_eq!(lead.email, "Jane@Company.com");
    assert_eq!(lead.status(), Some(EmailStatus::Invalid));
}

#[tokio::test]
async fn test_update_unknown_email_changes_nothing() {
    let warehouse = sample_leads();
    let before = warehouse.leads().unwrap();
    let updater = StatusUpdater::new(&warehouse, table());

    updater.update_one("nobody@example.com", "verified").await.unwrap();

    assert_eq!(warehouse.leads().unwrap(), before);
}

#[tokio::test]
async fn test_update_is_idempotent() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    updater.update_one("ops@startup.io", "accept_all").await.unwrap();
    let once = warehouse.leads().unwrap();
    updater.update_one("ops@startup.io", "accept_all").await.unwrap();

    assert_eq!(warehouse.leads().unwrap(), once);
}

#[tokio::test]
async fn test_bulk_update_sets_each_status() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    updater
        .update_many(&[
            StatusUpdate::new("john@example.com", "verified"),
            StatusUpdate::new("jane@company.com", "invalid"),
            StatusUpdate::new("team@startup.io", "accept_all"),
        ])
        .await
        .unwrap();

    assert_eq!(warehouse.queries_run(), 1);
    assert_eq!(status_of(&warehouse, "john@example.com").as_deref(), Some("verified"));
    assert_eq!(status_of(&warehouse, "Jane@Company.com").as_deref(), Some("invalid"));
    assert_eq!(status_of(&warehouse, "team@startup.io").as_deref(), Some("accept_all"));
    // Rows outside the batch keep their value.
    assert_eq!(status_of(&warehouse, "ops@startup.io").as_deref(), Some("unverified"));
    assert_eq!(status_of(&warehouse, "sales@acme.com").as_deref(), Some("verified"));
}

#[tokio::test]
async fn test_bulk_update_duplicate_email_first_entry_wins() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    updater
        .update_many(&[
            StatusUpdate::new("john@example.com", "invalid"),
            StatusUpdate::new("JOHN@example.com", "verified"),
        ])
        .await
        .unwrap();

    assert_eq!(status_of(&warehouse, "john@example.com").as_deref(), Some("invalid"));
}

#[tokio::test]
async fn test_bulk_update_first_of_two_pairs_for_same_email_wins() {
    let warehouse = MemoryWarehouse::with_leads(vec![LeadRecord::new(
        "a@x.com",
        Some("unverified"),
        None,
    )]);
    let updater = StatusUpdater::new(&warehouse, table());

    updater
        .update_many(&[
            StatusUpdate::new("a@x.com", "verified"),
            StatusUpdate::new("a@x.com", "invalid"),
        ])
        .await
        .unwrap();

    assert_eq!(status_of(&warehouse, "a@x.com").as_deref(), Some("verified"));
}

#[tokio::test]
async fn test_bulk_update_is_idempotent() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());
    let pairs = [
        StatusUpdate::new("john@example.com", "verified"),
        StatusUpdate::new("john@example.com", "invalid"),
        StatusUpdate::new(" Jane@company.com", "accept_all"),
    ];

    updater.update_many(&pairs).await.unwrap();
    let once = warehouse.leads().unwrap();
    updater.update_many(&pairs).await.unwrap();

    assert_eq!(warehouse.leads().unwrap(), once);
    assert_eq!(status_of(&warehouse, "john@example.com").as_deref(), Some("verified"));
    assert_eq!(status_of(&warehouse, "Jane@Company.com").as_deref(), Some("accept_all"));
}

#[tokio::test]
async fn test_bulk_update_invalid_entry_submits_nothing() {
    let warehouse = sample_leads();
    let before = warehouse.leads().unwrap();
    let updater = StatusUpdater::new(&warehouse, table());

    let err = updater
        .update_many(&[
            StatusUpdate::new("john@example.com", "verified"),
            StatusUpdate::new("jane@company.com", "bounced"),
        ])
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(warehouse.queries_run(), 0);
    assert_eq!(warehouse.leads().unwrap(), before);
}

#[tokio::test]
async fn test_invalid_single_status_submits_nothing() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    for bad in ["Verified", "", "catch-all"] {
        let err = updater.update_one("john@example.com", bad).await.unwrap_err();
        assert!(err.is_validation(), "{bad:?} should be rejected");
    }
    assert_eq!(warehouse.queries_run(), 0);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    let err = updater.update_many(&[]).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(warehouse.queries_run(), 0);
}

#[tokio::test]
async fn test_get_absent_email() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    assert_eq!(updater.get_one("nobody@example.com").await.unwrap(), None);
}

#[tokio::test]
async fn test_get_lead_with_null_status() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    let lead = updater.get_one("team@startup.io").await.unwrap().unwrap();
    assert_eq!(lead, LeadRecord::new("team@startup.io", None, None));
    assert_eq!(lead.status(), None);
}

#[tokio::test]
async fn test_status_counts_sum_and_order() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    let counts = updater.status_counts().await.unwrap();

    assert_eq!(
        counts,
        vec![
            StatusCount {
                email_status: Some("unverified".to_string()),
                count: 3
            },
            StatusCount {
                email_status: None,
                count: 1
            },
            StatusCount {
                email_status: Some("verified".to_string()),
                count: 1
            },
        ]
    );
    let total: u64 = counts.iter().map(|c| c.count).sum();
    assert_eq!(total, warehouse.leads().unwrap().len() as u64);
    assert!(counts.windows(2).all(|w| w[0].count >= w[1].count));
}

#[tokio::test]
async fn test_status_counts_follow_updates() {
    let warehouse = sample_leads();
    let updater = StatusUpdater::new(&warehouse, table());

    updater
        .update_many(&[
            StatusUpdate::new("john@example.com", "verified"),
            StatusUpdate::new("jane@company.com", "verified"),
            StatusUpdate::new("team@startup.io", "verified"),
        ])
        .await
        .unwrap();

    let counts = updater.status_counts().await.unwrap();
    assert_eq!(counts[0].status(), Some(EmailStatus::Verified));
    assert_eq!(counts[0].count, 4);
    assert_eq!(counts[1].status(), Some(EmailStatus::Unverified));
    assert_eq!(counts[1].count, 1);
}

#[tokio::test]
async fn test_status_counts_empty_table() {
    let warehouse = MemoryWarehouse::new();
    let updater = StatusUpdater::new(&warehouse, table());

    assert!(updater.status_counts().await.unwrap().is_empty());
}
