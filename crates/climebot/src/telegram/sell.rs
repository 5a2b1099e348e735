//! `/sell`: paged record list → cart → payment method → confirm.

use chrono::Local;
use climecore::core::config;
use climecore::core::types::format_money;
use climecore::{AppError, AppResult, InventoryStore};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, Message, MessageId};

use super::callbacks::CallbackAction;
use super::conversation::{has_open_sale, Conversation, SaleSession, SALE_OPEN_NOTICE};
use super::handlers::{message_user_key, user_key, HandlerDeps, HandlerError};
use super::keyboards::{cart_view, payment_view, sell_page_view};
use super::Bot;

/// Renders the record list page of `session`, moving it back if stock shrank.
fn render_list(store: &InventoryStore, session: &mut SaleSession) -> AppResult<(String, InlineKeyboardMarkup)> {
    let page_size = config::inventory::SELL_PAGE_SIZE;
    let total = store.count_in_stock()?;
    let last_page = total.saturating_sub(1) / page_size;
    session.page = session.page.min(last_page);

    let items = store.list_in_stock(session.page * page_size, page_size)?;
    Ok(sell_page_view(&items, session.page, total, page_size, &session.cart))
}

async fn edit(bot: &Bot, chat_id: ChatId, message_id: MessageId, text: String, keyboard: Option<InlineKeyboardMarkup>) {
    let mut request = bot.edit_message_text(chat_id, message_id, text);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(keyboard);
    }
    if let Err(e) = request.await {
        // "message is not modified" when the same view is rendered twice
        log::debug!("Failed to edit sell message: {}", e);
    }
}

/// Handle /sell command
pub async fn start_sell(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user = message_user_key(msg);
    if has_open_sale(&deps.conversations, user).await {
        bot.send_message(msg.chat.id, SALE_OPEN_NOTICE).await?;
        return Ok(());
    }
    if deps.store.count_in_stock()? == 0 {
        bot.send_message(msg.chat.id, "📭 No records in stock.").await?;
        return Ok(());
    }

    let mut session = SaleSession::default();
    let (text, keyboard) = render_list(&deps.store, &mut session)?;

    bot.send_message(msg.chat.id, text).reply_markup(keyboard).await?;
    deps.conversations.insert(user, Conversation::Sale(session)).await;
    log::info!("User {} started a sale", user);
    Ok(())
}

/// Handles a `sell:*` button press.
pub async fn handle_sell_callback(
    bot: &Bot,
    q: &CallbackQuery,
    action: CallbackAction,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let user = user_key(&q.from);
    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let (chat_id, message_id) = (message.chat().id, message.id());

    let mut session = match deps.conversations.take(user).await {
        Some(Conversation::Sale(session)) => session,
        other => {
            if let Some(other) = other {
                deps.conversations.insert(user, other).await;
            }
            bot.answer_callback_query(q.id.clone())
                .text("This sale has expired. Start again with /sell.")
                .await?;
            edit(bot, chat_id, message_id, "⌛ Sale expired.".to_string(), None).await;
            return Ok(());
        }
    };

    let mut notice: Option<String> = None;
    let outcome = apply_action(bot, (chat_id, message_id), user, action, &mut session, &mut notice, deps).await;

    // the cart survives every failure, only a finished or cancelled sale is dropped
    if !matches!(outcome, Ok(Outcome::Closed)) {
        deps.conversations.insert(user, Conversation::Sale(session)).await;
    }

    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(text) = notice {
        answer = answer.text(text);
    }
    answer.await?;
    outcome.map(|_| ())
}

enum Outcome {
    Open,
    Closed,
}

async fn apply_action(
    bot: &Bot,
    (chat_id, message_id): (ChatId, MessageId),
    user: i64,
    action: CallbackAction,
    session: &mut SaleSession,
    notice: &mut Option<String>,
    deps: &HandlerDeps,
) -> Result<Outcome, HandlerError> {
    match action {
        CallbackAction::SellAdd(id) => match session.cart.add_item(&deps.store, id, 1) {
            Ok(entry) => {
                *notice = Some(format!("Added ✅ ({} in cart)", entry.quantity));
                let (text, keyboard) = render_list(&deps.store, session)?;
                edit(bot, chat_id, message_id, text, Some(keyboard)).await;
            }
            Err(e) => *notice = Some(e.user_message()),
        },
        CallbackAction::SellPage(page) => {
            session.page = page;
            let (text, keyboard) = render_list(&deps.store, session)?;
            edit(bot, chat_id, message_id, text, Some(keyboard)).await;
        }
        CallbackAction::SellCart => {
            // "Back" from the payment step lands here as well
            if session.cart.resume_editing().is_ok() {
                log::debug!("User {} went back to the cart", user);
            }
            let (text, keyboard) = cart_view(&session.cart);
            edit(bot, chat_id, message_id, text, Some(keyboard)).await;
        }
        CallbackAction::SellDecrement(id) | CallbackAction::SellRemove(id) => {
            let result = if matches!(action, CallbackAction::SellDecrement(_)) {
                session.cart.decrement_item(id, 1)
            } else {
                session.cart.remove_item(id)
            };
            if let Err(e) = result {
                *notice = Some(e.user_message());
            }
            let (text, keyboard) = cart_view(&session.cart);
            edit(bot, chat_id, message_id, text, Some(keyboard)).await;
        }
        CallbackAction::SellPay(method) => match session.cart.begin_checkout(method) {
            Ok(_) => {
                let (text, keyboard) = payment_view(&session.cart, method);
                edit(bot, chat_id, message_id, text, Some(keyboard)).await;
            }
            Err(e) => *notice = Some(e.user_message()),
        },
        CallbackAction::SellConfirm => {
            let sold_at = Local::now().naive_local();
            match session.cart.confirm(&deps.store, sold_at).await {
                Ok(sale) => {
                    log::info!("User {} sold {} record(s) as sale #{}", user, sale.item_count(), sale.id);
                    let text = format!(
                        "✅ Sale #{}: {} record(s) sold via {}, total {}.\nInventory updated.",
                        sale.id,
                        sale.item_count(),
                        sale.payment_method,
                        format_money(sale.total)
                    );
                    edit(bot, chat_id, message_id, text, None).await;
                    return Ok(Outcome::Closed);
                }
                Err(e) => {
                    if !matches!(e, AppError::StockConflict(_)) {
                        log::error!("Sale of user {} failed: {}", user, e);
                    }
                    let (cart_text, keyboard) = cart_view(&session.cart);
                    let text = format!("⚠️ {}\n\n{}", e.user_message(), cart_text);
                    edit(bot, chat_id, message_id, text, Some(keyboard)).await;
                }
            }
        }
        CallbackAction::SellBack => {
            if session.cart.resume_editing().is_ok() {
                log::debug!("User {} left the payment step", user);
            }
            let (text, keyboard) = render_list(&deps.store, session)?;
            edit(bot, chat_id, message_id, text, Some(keyboard)).await;
        }
        CallbackAction::SellCancel => {
            if let Err(e) = session.cart.cancel() {
                log::debug!("Cancel on a closed cart: {}", e);
            }
            edit(bot, chat_id, message_id, "❌ Sale cancelled. Nothing was sold.".to_string(), None).await;
            return Ok(Outcome::Closed);
        }
        other => {
            log::warn!("Unexpected action {:?} in sell flow", other);
        }
    }

    Ok(Outcome::Open)
}
