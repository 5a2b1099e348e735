//! Dispatcher schema and handlers for the bot commands

pub mod commands;
pub mod schema;
pub mod types;

pub use schema::schema;
pub use types::{message_user_key, user_key, HandlerDeps, HandlerError};
