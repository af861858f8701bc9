//! lead-status - updates lead email validation statuses in BigQuery.

use std::path::Path;

use lead_status::batch;
use lead_status::cli::{Cli, Command};
use lead_status::config::Config;
use lead_status::error::Result;
use lead_status::leads::StatusUpdate;
use lead_status::logging;
use lead_status::output::{Outcome, Report};
use lead_status::updater::StatusUpdater;
use lead_status::warehouse;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    // Precedence: CLI arguments, then config file, then environment.
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_to(&mut config);
    config.apply_env_defaults();

    let table = config.warehouse.table_ref()?;
    info!("Leads table: {}", config.warehouse.display_string());

    let service = warehouse::connect(&config).await?;
    let updater = StatusUpdater::new(service.as_ref(), table);
    let report = Report::new(cli.output);

    for outcome in execute(&updater, &cli.command).await? {
        print!("{}", report.format(&outcome));
    }
    Ok(())
}

async fn execute(updater: &StatusUpdater<'_>, command: &Command) -> Result<Vec<Outcome>> {
    let outcomes = match command {
        Command::Update { email, status } => vec![update(updater, email, status).await?],
        Command::BulkUpdate { file } => {
            let path = file.as_deref().unwrap_or(Path::new("-"));
            let pairs = batch::read_pairs(path)?;
            vec![bulk_update(updater, &pairs).await?]
        }
        Command::Get { email } => vec![get(updater, email).await?],
        Command::Counts => vec![counts(updater).await?],
        Command::Demo => demo(updater).await?,
    };
    Ok(outcomes)
}

async fn update(updater: &StatusUpdater<'_>, email: &str, status: &str) -> Result<Outcome> {
    updater.update_one(email, status).await?;
    Ok(Outcome::Updated {
        email: email.to_string(),
        status: status.to_string(),
    })
}

async fn bulk_update(updater: &StatusUpdater<'_>, pairs: &[StatusUpdate]) -> Result<Outcome> {
    updater.update_many(pairs).await?;
    Ok(Outcome::BulkUpdated { count: pairs.len() })
}

async fn get(updater: &StatusUpdater<'_>, email: &str) -> Result<Outcome> {
    let lead = updater.get_one(email).await?;
    Ok(Outcome::Lead {
        email: email.to_string(),
        lead,
    })
}

async fn counts(updater: &StatusUpdater<'_>) -> Result<Outcome> {
    let counts = updater.status_counts().await?;
    Ok(Outcome::Counts { counts })
}

/// Sample session: one update, one bulk update, a lookup and the summary.
async fn demo(updater: &StatusUpdater<'_>) -> Result<Vec<Outcome>> {
    let pairs = [
        ("john@example.com", "verified"),
        ("jane@company.com", "invalid"),
        ("team@startup.io", "accept_all"),
    ]
    .map(StatusUpdate::from);

    Ok(vec![
        update(updater, "john@example.com", "verified").await?,
        bulk_update(updater, &pairs).await?,
        get(updater, "john@example.com").await?,
        counts(updater).await?,
    ])
}
