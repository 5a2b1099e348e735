//! Handler types and dependencies

use std::path::PathBuf;
use std::sync::Arc;

use climecore::catalog::CatalogLookup;
use climecore::InventoryStore;
use teloxide::types::{Message, User};

use crate::telegram::conversation::Conversations;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub store: Arc<InventoryStore>,
    pub catalog: Arc<dyn CatalogLookup>,
    pub conversations: Arc<Conversations>,
    pub reports_dir: PathBuf,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(
        store: Arc<InventoryStore>,
        catalog: Arc<dyn CatalogLookup>,
        conversations: Arc<Conversations>,
        reports_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            catalog,
            conversations,
            reports_dir,
        }
    }
}

/// Session key of a Telegram user.
pub fn user_key(user: &User) -> i64 {
    i64::try_from(user.id.0).unwrap_or(0)
}

/// Session key of the sender, falling back to the chat for anonymous senders.
pub fn message_user_key(msg: &Message) -> i64 {
    msg.from.as_ref().map(user_key).unwrap_or(msg.chat.id.0)
}
