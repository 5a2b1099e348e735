//! Clime - inventory and point-of-sale core for a vinyl record store
//!
//! This library holds everything except the Telegram glue:
//!
//! - `core`: configuration, errors, logging, retry policy and domain types
//! - `storage`: SQLite pool, inventory store, sales log and backups
//! - `sale`: the cart state machine and the per-user session table
//! - `catalog`: Discogs release lookup
//! - `report`: daily sales report aggregation and CSV output
//! - `import`: bulk import of records through the catalog

pub mod catalog;
pub mod core;
pub mod import;
pub mod report;
pub mod sale;
pub mod storage;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use sale::{Cart, CartState, SessionTable};
pub use storage::{create_pool, get_connection, DbConnection, DbPool, InventoryStore};
