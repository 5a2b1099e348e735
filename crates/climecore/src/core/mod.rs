//! Core utilities, configuration, errors, and domain types

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;
pub mod types;

// Re-exports for convenience
pub use error::{AppError, AppResult, StockShortfall};
pub use logging::{init_logger, log_startup_configuration};
pub use types::{Condition, InventoryItem, ItemId, NewInventoryItem, PaymentMethod};
