use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::time::Duration;

use crate::core::error::AppResult;
use crate::storage::migrations::run_migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// How long a connection waits on a lock held by another writer before failing with BUSY.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 8 connections and runs schema migrations.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Returns
///
/// Returns a `DbPool` on success, or the pool/migration error.
///
/// # Example
///
/// ```no_run
/// use climecore::storage::create_pool;
///
/// let pool = create_pool("clime.sqlite")?;
/// # Ok::<(), climecore::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    });
    let pool = Pool::builder().max_size(8).build(manager)?;

    // Ensure schema is up to date before anyone reads
    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;
    log::info!("Database ready at {}", database_path);

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> AppResult<DbConnection> {
    Ok(pool.get()?)
}
