//! Configuration read once from the environment (`.env` is loaded by the binary first).

use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: clime.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "clime.sqlite".to_string()));

/// Directory for generated daily reports
/// Read from REPORTS_DIR environment variable
/// Default: reports
pub static REPORTS_DIR: Lazy<String> = Lazy::new(|| env::var("REPORTS_DIR").unwrap_or_else(|_| "reports".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: clime.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "clime.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<Option<SecretString>> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
});

/// Discogs personal access token
/// Read from DISCOGS_TOKEN environment variable
pub static DISCOGS_TOKEN: Lazy<Option<SecretString>> = Lazy::new(|| {
    env::var("DISCOGS_TOKEN")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
});

/// Both tokens, checked present.
pub struct Secrets {
    pub bot_token: SecretString,
    pub discogs_token: SecretString,
}

/// Fails with the names of the missing variables. Values are never formatted.
pub fn validate_secrets() -> AppResult<Secrets> {
    let copy = |secret: &SecretString| SecretString::from(secret.expose_secret().to_owned());
    match (BOT_TOKEN.as_ref().map(copy), DISCOGS_TOKEN.as_ref().map(copy)) {
        (Some(bot_token), Some(discogs_token)) => Ok(Secrets {
            bot_token,
            discogs_token,
        }),
        (bot, discogs) => {
            let mut missing = Vec::new();
            if bot.is_none() {
                missing.push("BOT_TOKEN");
            }
            if discogs.is_none() {
                missing.push("DISCOGS_TOKEN");
            }
            Err(AppError::Validation(format!(
                "Missing required environment variable(s): {}",
                missing.join(", ")
            )))
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

/// Cart/conversation session configuration
pub mod session {
    use super::{env_u64, Duration, Lazy};

    /// Idle time after which an open cart or /add draft is dropped
    /// Read from CART_TIMEOUT_SECS, default 30 minutes
    pub static TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| env_u64("CART_TIMEOUT_SECS", 30 * 60));

    /// Interval of the eviction sweep
    /// Read from SESSION_SWEEP_SECS, default 60 seconds
    pub static SWEEP_SECS: Lazy<u64> = Lazy::new(|| env_u64("SESSION_SWEEP_SECS", 60));

    pub fn timeout() -> Duration {
        Duration::from_secs(*TIMEOUT_SECS)
    }

    pub fn sweep_interval() -> Duration {
        Duration::from_secs(*SWEEP_SECS)
    }
}

/// Discogs catalog configuration
pub mod catalog {
    use super::{env, env_u64, Duration, Lazy};

    /// Discogs API base URL (overridable for tests and proxies)
    pub static API_URL: Lazy<String> =
        Lazy::new(|| env::var("DISCOGS_API_URL").unwrap_or_else(|_| "https://api.discogs.com".to_string()));

    /// Candidates per search page
    /// Read from CATALOG_PAGE_SIZE, default 10, capped at 50
    pub static PAGE_SIZE: Lazy<u32> = Lazy::new(|| env_u64("CATALOG_PAGE_SIZE", 10).clamp(1, 50) as u32);

    /// Discogs rejects requests without a descriptive User-Agent
    pub const USER_AGENT: &str = "ClimeRecordStore/1.0";

    /// Request timeout (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Inventory listing configuration
pub mod inventory {
    /// Records shown by /inventory
    pub const LIST_LIMIT: u32 = 20;

    /// Records per page in the /sell picker
    pub const SELL_PAGE_SIZE: u32 = 10;

    /// Quantity at or below which /lowstock lists a record
    pub const LOW_STOCK_THRESHOLD: u32 = 1;
}

/// Retry configuration
pub mod retry {
    /// Attempts for a checkout that hits a busy database
    pub const CHECKOUT_MAX_RETRIES: u32 = 2;
}

/// Backup configuration
pub mod backup {
    /// Maximum number of kept backups
    pub const MAX_BACKUPS: usize = 30;

    /// Backup directory
    pub const BACKUP_DIR: &str = "backups";
}
