//! The per-session cart and its checkout state machine.
//!
//! ```text
//! Empty --add--> Building --begin_checkout--> AwaitingPayment --confirm--> Completed
//!   ^              |   ^                          |
//!   +--remove------+   +-----resume / conflict----+
//!
//! Empty | Building | AwaitingPayment --cancel--> Cancelled
//! ```
//!
//! Nothing shared is touched until [`Cart::confirm`], which hands the whole cart to
//! [`InventoryStore::commit_sale`] in one atomic step.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::core::error::{AppError, AppResult, StockShortfall};
use crate::core::retry::{retry, RetryConfig};
use crate::core::types::{display_name, positive_quantity, Condition, ItemId, PaymentMethod};
use crate::storage::{InventoryStore, SaleLine, SaleRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartState {
    Empty,
    Building,
    AwaitingPayment(PaymentMethod),
    /// Holds the id of the recorded sale
    Completed(i64),
    Cancelled,
}

impl CartState {
    pub fn name(&self) -> &'static str {
        match self {
            CartState::Empty => "empty",
            CartState::Building => "building",
            CartState::AwaitingPayment(_) => "awaiting payment",
            CartState::Completed(_) => "completed",
            CartState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CartState::Completed(_) | CartState::Cancelled)
    }
}

/// One record in the cart. The price is frozen when the record is first added.
#[derive(Debug, Clone, PartialEq)]
pub struct CartEntry {
    pub item_id: ItemId,
    pub artist: String,
    pub title: String,
    pub condition: Condition,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl CartEntry {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn display_name(&self) -> String {
        display_name(&self.artist, &self.title)
    }

    fn to_sale_line(&self) -> SaleLine {
        SaleLine {
            item_id: self.item_id,
            artist: self.artist.clone(),
            title: self.title.clone(),
            condition: self.condition,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cart {
    entries: Vec<CartEntry>,
    state: CartState,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            state: CartState::Empty,
        }
    }

    pub fn state(&self) -> CartState {
        self.state
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: ItemId) -> Option<&CartEntry> {
        self.entries.iter().find(|e| e.item_id == id)
    }

    /// Quantity of `id` currently in the cart (0 when absent).
    pub fn quantity_of(&self, id: ItemId) -> u32 {
        self.entry(id).map(|e| e.quantity).unwrap_or(0)
    }

    pub fn total(&self) -> Decimal {
        self.entries.iter().map(CartEntry::line_total).sum()
    }

    pub fn total_quantity(&self) -> u32 {
        self.entries.iter().map(|e| e.quantity).sum()
    }

    fn invalid(&self, action: &'static str) -> AppError {
        AppError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    fn settle_after_removal(&mut self) {
        self.entries.retain(|e| e.quantity > 0);
        self.state = if self.entries.is_empty() {
            CartState::Empty
        } else {
            CartState::Building
        };
    }

    /// Adds `quantity` copies of a record, merging with an existing entry.
    ///
    /// Availability is checked against the store now and again at confirm time.
    /// On any error the cart is left untouched.
    pub fn add_item(&mut self, store: &InventoryStore, id: ItemId, quantity: i64) -> AppResult<&CartEntry> {
        let quantity = positive_quantity(quantity)?;
        if !matches!(self.state, CartState::Empty | CartState::Building) {
            return Err(self.invalid("add items"));
        }

        let item = store.find(id)?;
        let wanted = self.quantity_of(id).saturating_add(quantity);
        if wanted > item.quantity {
            return Err(AppError::InsufficientStock {
                item_id: id,
                requested: wanted,
                available: item.quantity,
            });
        }

        let index = match self.entries.iter().position(|e| e.item_id == id) {
            Some(index) => {
                self.entries[index].quantity = wanted;
                index
            }
            None => {
                self.entries.push(CartEntry {
                    item_id: id,
                    artist: item.artist,
                    title: item.title,
                    condition: item.condition,
                    quantity,
                    unit_price: item.price,
                });
                self.entries.len() - 1
            }
        };
        self.state = CartState::Building;
        log::debug!("Cart: {} x #{} (now {})", quantity, id, wanted);
        Ok(&self.entries[index])
    }

    /// Drops the whole entry for `id`.
    pub fn remove_item(&mut self, id: ItemId) -> AppResult<()> {
        if self.state != CartState::Building {
            return Err(self.invalid("remove items"));
        }
        let before = self.entries.len();
        self.entries.retain(|e| e.item_id != id);
        if self.entries.len() == before {
            return Err(AppError::NotFound(id));
        }
        self.settle_after_removal();
        Ok(())
    }

    /// Lowers the entry for `id` by `quantity`, dropping it when nothing is left.
    pub fn decrement_item(&mut self, id: ItemId, quantity: i64) -> AppResult<()> {
        let quantity = positive_quantity(quantity)?;
        if self.state != CartState::Building {
            return Err(self.invalid("remove items"));
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.item_id == id)
            .ok_or(AppError::NotFound(id))?;
        entry.quantity = entry.quantity.saturating_sub(quantity);
        self.settle_after_removal();
        Ok(())
    }

    /// Freezes the cart for payment and returns the amount due.
    pub fn begin_checkout(&mut self, payment_method: PaymentMethod) -> AppResult<Decimal> {
        match self.state {
            CartState::Empty => Err(AppError::EmptyCart),
            CartState::Building if self.entries.is_empty() => Err(AppError::EmptyCart),
            CartState::Building => {
                self.state = CartState::AwaitingPayment(payment_method);
                Ok(self.total())
            }
            _ => Err(self.invalid("check out")),
        }
    }

    /// Back from the payment step to editing.
    pub fn resume_editing(&mut self) -> AppResult<()> {
        match self.state {
            CartState::AwaitingPayment(_) => {
                self.state = CartState::Building;
                Ok(())
            }
            _ => Err(self.invalid("go back")),
        }
    }

    /// Records the sale.
    ///
    /// Busy-database failures are retried with [`RetryConfig::checkout`]. On a
    /// `StockConflict` every short entry is clamped to what is left (entries with
    /// nothing left are dropped) and the cart goes back to `Building`, or `Empty`
    /// when nothing is left at all. Any other failure also returns the cart to
    /// `Building` with its entries intact, so the user can simply confirm again.
    pub async fn confirm(&mut self, store: &InventoryStore, sold_at: NaiveDateTime) -> AppResult<SaleRecord> {
        let CartState::AwaitingPayment(payment_method) = self.state else {
            return Err(self.invalid("confirm"));
        };

        let lines: Vec<SaleLine> = self.entries.iter().map(CartEntry::to_sale_line).collect();
        let result = retry(&RetryConfig::checkout(), || {
            let lines = &lines;
            async move { store.commit_sale(lines, payment_method, sold_at) }
        })
        .await
        .into_result();

        match result {
            Ok(record) => {
                self.state = CartState::Completed(record.id);
                Ok(record)
            }
            Err(AppError::StockConflict(shortfalls)) => {
                self.clamp(&shortfalls);
                log::info!(
                    "Checkout refused, stock changed on {} record(s); cart clamped",
                    shortfalls.len()
                );
                Err(AppError::StockConflict(shortfalls))
            }
            Err(e) => {
                log::error!("Checkout failed, cart kept for retry: {}", e);
                self.state = CartState::Building;
                Err(e)
            }
        }
    }

    fn clamp(&mut self, shortfalls: &[StockShortfall]) {
        for shortfall in shortfalls {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.item_id == shortfall.item_id) {
                entry.quantity = entry.quantity.min(shortfall.available);
            }
        }
        self.settle_after_removal();
    }

    /// Abandons the cart. Valid until the cart is completed.
    pub fn cancel(&mut self) -> AppResult<()> {
        if self.state.is_terminal() {
            return Err(self.invalid("cancel"));
        }
        self.state = CartState::Cancelled;
        Ok(())
    }
}
