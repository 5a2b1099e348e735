//! Per-user conversation state kept in the session table.

use climecore::catalog::CatalogCandidate;
use climecore::core::types::Condition;
use climecore::{Cart, SessionTable};
use rust_decimal::Decimal;

/// What a user is in the middle of. At most one per user.
#[derive(Debug, Clone)]
pub enum Conversation {
    Sale(SaleSession),
    Add(AddDraft),
}

pub type Conversations = SessionTable<Conversation>;

/// Reply to `/add` or `/sell` while a cart is open.
pub const SALE_OPEN_NOTICE: &str = "🛒 A sale is open. Finish it or /cancel first.";

/// Whether `user` has a live cart that a new conversation would overwrite.
pub async fn has_open_sale(conversations: &Conversations, user: i64) -> bool {
    matches!(conversations.get(user).await, Some(Conversation::Sale(_)))
}

/// An open `/sell`: the cart and the list page the user is looking at.
#[derive(Debug, Clone, Default)]
pub struct SaleSession {
    pub cart: Cart,
    pub page: u32,
}

/// Where an `/add` conversation stands.
#[derive(Debug, Clone)]
pub enum AddDraft {
    /// Waiting for the search text
    AwaitingQuery,
    /// Showing a page of catalog results
    Choosing {
        query: String,
        page: u32,
        results: Vec<CatalogCandidate>,
    },
    /// Catalog was unreachable; waiting for `Artist - Title | Format`
    AwaitingManual,
    ChoosingCondition { candidate: CatalogCandidate },
    AwaitingPrice {
        candidate: CatalogCandidate,
        condition: Condition,
        suggestion: Option<Decimal>,
    },
    AwaitingQuantity {
        candidate: CatalogCandidate,
        condition: Condition,
        price: Decimal,
    },
}
