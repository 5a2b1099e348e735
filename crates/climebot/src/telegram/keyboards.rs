//! Message texts and inline keyboards for the sell and add flows.
//!
//! Everything here is pure so the views can be tested without a bot.

use climecore::catalog::CatalogCandidate;
use climecore::core::types::{format_money, Condition, InventoryItem, PaymentMethod};
use climecore::Cart;
use strum::IntoEnumIterator;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::callbacks::CallbackAction;

/// Longest button caption before it gets cut.
const MAX_BUTTON_CHARS: usize = 60;

pub fn cb(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.data())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn page_count(total: u32, page_size: u32) -> u32 {
    total.div_ceil(page_size.max(1)).max(1)
}

/// One page of the `/sell` record list.
pub fn sell_page_view(
    items: &[InventoryItem],
    page: u32,
    total_items: u32,
    page_size: u32,
    cart: &Cart,
) -> (String, InlineKeyboardMarkup) {
    let pages = page_count(total_items, page_size);
    let mut text = format!("🛒 Select records to add to the cart (page {}/{})", page + 1, pages);
    if items.is_empty() {
        text.push_str("\n\nNo records in stock.");
    }
    if !cart.is_empty() {
        text.push_str(&format!(
            "\n\nCart: {} record(s), {}",
            cart.total_quantity(),
            format_money(cart.total())
        ));
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = items
        .iter()
        .map(|item| {
            let left = item.quantity.saturating_sub(cart.quantity_of(item.id));
            let label = format!(
                "{} ({}) {} · {} left",
                item.display_name(),
                item.condition,
                format_money(item.price),
                left
            );
            vec![cb(truncate(&label, MAX_BUTTON_CHARS), CallbackAction::SellAdd(item.id))]
        })
        .collect();

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(cb("⬅️ Prev", CallbackAction::SellPage(page - 1)));
    }
    if page + 1 < pages {
        nav.push(cb("➡️ Next", CallbackAction::SellPage(page + 1)));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    rows.push(vec![
        cb("🛒 View cart / checkout", CallbackAction::SellCart),
        cb("❌ Cancel", CallbackAction::SellCancel),
    ]);

    (text, InlineKeyboardMarkup::new(rows))
}

/// Cart contents with per-record "−" / remove buttons and the payment choice.
pub fn cart_view(cart: &Cart) -> (String, InlineKeyboardMarkup) {
    if cart.is_empty() {
        return (
            "🛒 The cart is empty.".to_string(),
            InlineKeyboardMarkup::new(vec![vec![
                cb("🔙 Back", CallbackAction::SellBack),
                cb("❌ Cancel", CallbackAction::SellCancel),
            ]]),
        );
    }

    let mut text = String::from("🛒 Cart:\n\n");
    let mut rows = Vec::new();
    for entry in cart.entries() {
        text.push_str(&format!(
            "• {} ({}) × {} @ {} = {}\n",
            entry.display_name(),
            entry.condition,
            entry.quantity,
            format_money(entry.unit_price),
            format_money(entry.line_total())
        ));
        rows.push(vec![
            cb(
                truncate(&format!("➖ {}", entry.display_name()), MAX_BUTTON_CHARS),
                CallbackAction::SellDecrement(entry.item_id),
            ),
            cb("🗑 Remove", CallbackAction::SellRemove(entry.item_id)),
        ]);
    }
    text.push_str(&format!("\nTotal: {}", format_money(cart.total())));

    rows.push(vec![
        cb("💵 Pay with Cash", CallbackAction::SellPay(PaymentMethod::Cash)),
        cb("💳 Pay with POS", CallbackAction::SellPay(PaymentMethod::Pos)),
    ]);
    rows.push(vec![
        cb("🔙 Back", CallbackAction::SellBack),
        cb("❌ Cancel", CallbackAction::SellCancel),
    ]);

    (text, InlineKeyboardMarkup::new(rows))
}

/// Final confirmation before the sale is recorded.
pub fn payment_view(cart: &Cart, method: PaymentMethod) -> (String, InlineKeyboardMarkup) {
    let text = format!(
        "💰 {} record(s), total {} via {}.\nConfirm the sale?",
        cart.total_quantity(),
        format_money(cart.total()),
        method
    );
    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        cb("✅ Confirm", CallbackAction::SellConfirm),
        cb("🔙 Back", CallbackAction::SellCart),
    ]]);
    (text, keyboard)
}

/// Catalog results of one search page.
pub fn release_choice_keyboard(results: &[CatalogCandidate], page: u32, page_size: u32) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = results
        .iter()
        .enumerate()
        .map(|(idx, candidate)| vec![cb(candidate.caption(MAX_BUTTON_CHARS), CallbackAction::AddPick(idx))])
        .collect();

    let mut nav = Vec::new();
    if page > 1 {
        nav.push(cb("⬅️ Prev", CallbackAction::AddPage(page - 1)));
    }
    // a full page means there may be more
    if results.len() as u32 >= page_size {
        nav.push(cb("➡️ Next", CallbackAction::AddPage(page + 1)));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    rows.push(vec![
        cb("✍️ Enter manually", CallbackAction::AddManual),
        cb("❌ Cancel", CallbackAction::AddCancel),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// The eight grades, four per row.
pub fn condition_keyboard() -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = Condition::iter()
        .map(|c| cb(c.to_string(), CallbackAction::AddCondition(c)))
        .collect();
    let mut rows: Vec<Vec<InlineKeyboardButton>> = buttons.chunks(4).map(|row| row.to_vec()).collect();
    rows.push(vec![cb("❌ Cancel", CallbackAction::AddCancel)]);
    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use climecore::core::types::{ItemId, NewInventoryItem};
    use climecore::InventoryStore;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use teloxide::types::InlineKeyboardButtonKind;
    use tempfile::TempDir;

    fn callback_data(keyboard: &InlineKeyboardMarkup) -> Vec<Vec<String>> {
        keyboard
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| match &button.kind {
                        InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                        other => panic!("unexpected button kind {other:?}"),
                    })
                    .collect()
            })
            .collect()
    }

    fn store_with_records() -> (TempDir, InventoryStore, Vec<InventoryItem>) {
        let dir = TempDir::new().unwrap();
        let store = InventoryStore::open(dir.path().join("kb.sqlite").to_str().unwrap()).unwrap();
        let items = [("Can", "Tago Mago", 2000, 3), ("Neu!", "Neu! 75", 2500, 1)]
            .into_iter()
            .map(|(artist, title, cents, quantity)| {
                store
                    .add_item(NewInventoryItem {
                        artist: artist.to_string(),
                        title: title.to_string(),
                        condition: Some(Condition::VeryGoodPlus),
                        price: Decimal::new(cents, 2),
                        quantity,
                        ..Default::default()
                    })
                    .unwrap()
            })
            .collect();
        (dir, store, items)
    }

    #[test]
    fn test_sell_page_shows_what_is_left_and_paging() {
        let (_dir, store, items) = store_with_records();
        let mut cart = Cart::new();
        cart.add_item(&store, items[0].id, 2).unwrap();

        let (text, keyboard) = sell_page_view(&items, 0, 12, 10, &cart);
        assert!(text.contains("page 1/2"));
        assert!(text.contains("Cart: 2 record(s), $40.00"));

        let first = &keyboard.inline_keyboard[0][0];
        assert_eq!(first.text, "Can - Tago Mago (VG+) $20.00 · 1 left");

        let data = callback_data(&keyboard);
        assert_eq!(data[2], vec!["sell:page:1"]);
        assert_eq!(data[3], vec!["sell:cart", "sell:cancel"]);
    }

    #[test]
    fn test_cart_view_has_controls_per_entry() {
        let (_dir, store, items) = store_with_records();
        let mut cart = Cart::new();
        cart.add_item(&store, items[0].id, 2).unwrap();
        cart.add_item(&store, items[1].id, 1).unwrap();

        let (text, keyboard) = cart_view(&cart);
        assert!(text.contains("Can - Tago Mago (VG+) × 2 @ $20.00 = $40.00"));
        assert!(text.ends_with("Total: $65.00"));

        let data = callback_data(&keyboard);
        let ItemId(first) = items[0].id;
        assert_eq!(data[0], vec![format!("sell:dec:{first}"), format!("sell:rm:{first}")]);
        assert_eq!(data[2], vec!["sell:pay:cash", "sell:pay:pos"]);
        assert_eq!(data[3], vec!["sell:back", "sell:cancel"]);
    }

    #[test]
    fn test_condition_keyboard_layout() {
        let data = callback_data(&condition_keyboard());
        assert_eq!(data.len(), 3);
        assert_eq!(data[0], vec!["add:cond:m", "add:cond:nm", "add:cond:vg+", "add:cond:vg"]);
        assert_eq!(data[1].len(), 4);
        assert_eq!(data[2], vec!["add:cancel"]);
    }

    #[test]
    fn test_release_keyboard_next_only_on_full_page() {
        let candidate = CatalogCandidate::manual("Can - Tago Mago | LP").unwrap();
        let full = vec![candidate.clone(); 2];

        let data = callback_data(&release_choice_keyboard(&full, 1, 2));
        assert_eq!(data[2], vec!["add:page:2"]);

        let data = callback_data(&release_choice_keyboard(&full[..1], 2, 2));
        assert_eq!(data[1], vec!["add:page:1"]);
        assert_eq!(data[2], vec!["add:manual", "add:cancel"]);
    }
}
