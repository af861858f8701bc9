//! Startup wiring: config file to query service.

use std::io::Write;

use lead_status::config::Config;
use lead_status::updater::StatusUpdater;
use lead_status::warehouse::{self, WarehouseBackend};

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_memory_backend_from_config_file() {
    let seed = write_temp(
        r#"[
            {"email": "john@example.com", "email_status": "unverified", "trackingId": "trk_1"},
            {"email": "jane@company.com", "email_status": null}
        ]"#,
    );
    let config_file = write_temp(&format!(
        "[warehouse]\nbackend = \"memory\"\ntable = \"leads\"\nseed = \"{}\"\n",
        seed.path().display()
    ));

    let config = Config::load_from_file(config_file.path()).unwrap();
    assert_eq!(config.warehouse.backend, WarehouseBackend::Memory);

    let service = warehouse::connect(&config).await.unwrap();
    assert_eq!(service.backend_name(), "memory");

    let updater = StatusUpdater::new(service.as_ref(), config.warehouse.table_ref().unwrap());
    assert_eq!(updater.table().to_string(), "memory.local.leads");

    updater.update_one("JOHN@example.com", "verified").await.unwrap();
    let lead = updater.get_one("john@example.com").await.unwrap().unwrap();
    assert_eq!(lead.email_status.as_deref(), Some("verified"));

    let counts = updater.status_counts().await.unwrap();
    assert_eq!(counts.iter().map(|c| c.count).sum::<u64>(), 2);
}

#[tokio::test]
async fn test_bigquery_backend_with_access_token() {
    let config_file = write_temp(
        r#"
[warehouse]
project = "n8n-revenueinstitute"
dataset = "outbound_sales"

[auth]
access_token = "ya29.test"
"#,
    );

    let config = Config::load_from_file(config_file.path()).unwrap();
    let service = warehouse::connect(&config).await.unwrap();

    assert_eq!(service.backend_name(), "bigquery");
    assert_eq!(
        config.warehouse.table_ref().unwrap().quoted(),
        "`n8n-revenueinstitute.outbound_sales.leads`"
    );
}

#[tokio::test]
async fn test_bigquery_backend_without_credentials() {
    let mut config = Config::default();
    config.warehouse.project = Some("n8n-revenueinstitute".to_string());

    let err = warehouse::connect(&config).await.err().unwrap();
    assert_eq!(err.category(), "Authentication Error");
}

#[tokio::test]
async fn test_bigquery_backend_without_project() {
    let mut config = Config::default();
    config.auth.access_token = Some("ya29.test".to_string());

    let err = warehouse::connect(&config).await.err().unwrap();
    assert_eq!(err.category(), "Configuration Error");
}

#[tokio::test]
async fn test_bad_seed_file() {
    let seed = write_temp("not json");
    let mut config = Config::default();
    config.warehouse.backend = WarehouseBackend::Memory;
    config.warehouse.seed = Some(seed.path().to_path_buf());

    let err = warehouse::connect(&config).await.err().unwrap();
    assert!(err.to_string().contains("Invalid seed file"));
}
