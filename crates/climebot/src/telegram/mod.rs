//! Telegram bot integration and handlers

pub mod add;
pub mod bot;
pub mod callbacks;
pub mod conversation;
pub mod handlers;
pub mod keyboards;
pub mod sell;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use conversation::{Conversation, Conversations};
pub use handlers::{schema, HandlerDeps, HandlerError};

pub type Bot = teloxide::Bot;
