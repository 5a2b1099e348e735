pub mod backup;
pub mod db;
pub mod inventory;
pub mod migrations;
pub mod sales;

pub use db::{create_pool, get_connection, DbConnection, DbPool};
pub use inventory::{InventoryStats, InventoryStore};
pub use sales::{SaleLine, SaleRecord};
