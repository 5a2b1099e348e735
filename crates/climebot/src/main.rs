use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use climebot::cli::{Cli, Commands};
use climebot::telegram::{create_bot, schema, setup_bot_commands, Conversations, HandlerDeps};
use climecore::catalog::{CatalogLookup, DiscogsClient};
use climecore::core::config;
use climecore::core::{init_logger, log_startup_configuration};
use climecore::storage::backup::create_backup;
use climecore::storage::sales::DATE_FORMAT;
use climecore::{import, report, InventoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present, before any config is read
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::Report { date }) => run_report(date.as_deref()),
        Some(Commands::Import { file }) => run_import(&file).await,
        Some(Commands::Backup) => run_backup(),
    }
}

async fn run_bot() -> Result<()> {
    log_startup_configuration();
    let secrets = config::validate_secrets()?;

    let store = Arc::new(InventoryStore::open(&config::DATABASE_PATH)?);
    let stats = store.stats()?;
    log::info!(
        "Inventory loaded: {} record(s) in stock, {} sale(s) on file",
        stats.records,
        stats.sales
    );

    let catalog: Arc<dyn CatalogLookup> = Arc::new(DiscogsClient::from_env(secrets.discogs_token)?);

    let conversations = Arc::new(Conversations::new(config::session::timeout()));
    let _cleanup = Arc::clone(&conversations).spawn_cleanup_task(config::session::sweep_interval());

    let bot = create_bot(&secrets.bot_token)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to publish the command list: {}", e);
    }

    let deps = HandlerDeps::new(
        store,
        catalog,
        conversations,
        PathBuf::from(config::REPORTS_DIR.as_str()),
    );

    log::info!("Starting dispatcher");
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;
    log::info!("Dispatcher shutdown gracefully");

    Ok(())
}

/// Writes the CSV report for `date` (today by default) and prints the summary
fn run_report(date: Option<&str>) -> Result<()> {
    let date = match date {
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|e| anyhow::anyhow!("Invalid --date '{}', expected YYYY-MM-DD: {}", raw, e))?,
        None => Local::now().date_naive(),
    };

    let store = InventoryStore::open(&config::DATABASE_PATH)?;
    let report = {
        let conn = store.pool().get()?;
        report::generate(&conn, date)?
    };
    let path = report::write_csv(&report, Path::new(config::REPORTS_DIR.as_str()))?;

    println!("{}", report.summary_text());
    println!("Report written to {}", path.display());
    Ok(())
}

async fn run_import(file: &Path) -> Result<()> {
    let token = config::DISCOGS_TOKEN
        .as_ref()
        .map(|token| SecretString::from(token.expose_secret().to_owned()))
        .ok_or_else(|| anyhow::anyhow!("DISCOGS_TOKEN is required for import"))?;
    let catalog = DiscogsClient::from_env(token)?;
    let store = InventoryStore::open(&config::DATABASE_PATH)?;

    let summary = import::import_file(file, &catalog, &store).await?;
    log::info!("Import of {} finished: {} added, {} skipped", file.display(), summary.added, summary.skipped);
    println!("Added {} record(s), skipped {} row(s)", summary.added, summary.skipped);
    Ok(())
}

fn run_backup() -> Result<()> {
    let store = InventoryStore::open(&config::DATABASE_PATH)?;
    let path = create_backup(store.pool(), &config::DATABASE_PATH, Path::new(config::backup::BACKUP_DIR))?;
    println!("Backup written to {}", path.display());
    Ok(())
}
