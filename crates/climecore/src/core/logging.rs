//! Logging initialization and startup diagnostics

use anyhow::Result;
use simplelog::*;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file =
        fs_err::File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    let config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Info, config, log_file.into_parts().0),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs where the bot keeps its state. Token values are never printed, only their presence.
pub fn log_startup_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("💿 Clime record store bot");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Database: {}", config::DATABASE_PATH.as_str());
    log::info!("Reports directory: {}", config::REPORTS_DIR.as_str());
    log::info!("Discogs API: {}", config::catalog::API_URL.as_str());
    log::info!(
        "BOT_TOKEN: {}",
        if config::BOT_TOKEN.is_some() { "set" } else { "NOT SET" }
    );
    log::info!(
        "DISCOGS_TOKEN: {}",
        if config::DISCOGS_TOKEN.is_some() { "set" } else { "NOT SET" }
    );
    log::info!(
        "Cart timeout: {}s (sweep every {}s)",
        *config::session::TIMEOUT_SECS,
        *config::session::SWEEP_SECS
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    #[test]
    fn test_init_logger_creates_log_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        // A second init in the same process fails; only the file side effect is checked.
        let _ = init_logger(path);

        assert!(temp_file.path().exists());
    }
}
