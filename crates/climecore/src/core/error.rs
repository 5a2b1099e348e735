use thiserror::Error;

use crate::core::types::ItemId;

/// A single cart line that the store can no longer satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockShortfall {
    pub item_id: ItemId,
    pub requested: u32,
    pub available: u32,
}

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
///
/// # Example
///
/// ```no_run
/// use climecore::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// HTTP errors talking to the catalog service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Identifier absent in the inventory
    #[error("Item {0} not found")]
    NotFound(ItemId),

    /// A delta would take stock below zero
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock { item_id: ItemId, requested: u32, available: u32 },

    /// Stock changed between building the cart and confirming it
    #[error("Stock conflict on {} item(s)", .0.len())]
    StockConflict(Vec<StockShortfall>),

    /// Quantity was zero, negative or not a whole number; carries the rejected input
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Cart operation not allowed in the current state
    #[error("Cannot {action} while cart is {state}")]
    InvalidTransition { action: &'static str, state: &'static str },

    /// Checkout requested on an empty cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Catalog service failed or returned garbage
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True for failures of the backing file (the sale can be retried as-is).
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::DatabasePool(_) | AppError::Io(_))
    }

    /// Text shown to the shop assistant in chat.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(id) => format!("Record #{} is no longer in the inventory.", id),
            AppError::InsufficientStock {
                requested, available, ..
            } => format!("Only {} in stock, {} requested.", available, requested),
            AppError::StockConflict(shortfalls) => {
                let mut text = String::from("Stock changed while the cart was open:\n");
                for s in shortfalls {
                    text.push_str(&format!(
                        "• #{}: wanted {}, {} left\n",
                        s.item_id, s.requested, s.available
                    ));
                }
                text.push_str("The cart was adjusted, please confirm again.");
                text
            }
            AppError::InvalidQuantity(_) => "Quantity must be a whole number of at least 1.".to_string(),
            AppError::InvalidTransition { .. } => "That action is not available right now.".to_string(),
            AppError::EmptyCart => "Cart is empty.".to_string(),
            AppError::CatalogUnavailable(_) | AppError::Http(_) => {
                "Discogs is not reachable right now. Try again later or enter the record manually.".to_string()
            }
            AppError::Validation(msg) => msg.clone(),
            _ if self.is_persistence_failure() => {
                "Could not save to the inventory database. Nothing was lost, please try again.".to_string()
            }
            _ => "Something went wrong, please try again.".to_string(),
        }
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(err: rust_decimal::Error) -> Self {
        AppError::Validation(format!("Invalid amount: {}", err))
    }
}
