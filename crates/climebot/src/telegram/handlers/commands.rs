//! Simple command handlers: /start, /inventory, /stats, /lowstock, /report, /cancel

use chrono::Local;
use climecore::core::config;
use climecore::core::types::format_money;
use climecore::report;
use teloxide::prelude::*;
use teloxide::types::{InputFile, Message};
use teloxide::utils::command::BotCommands;

use super::types::{message_user_key, HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::conversation::Conversation;
use crate::telegram::Bot;

/// Handle /start command
pub async fn handle_start_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    let text = format!(
        "🎶 Clime record store\n\n{}\n\nWhile adding or selling, /cancel stops at any step.",
        Command::descriptions()
    );
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Handle /inventory command: the first records in stock
pub async fn handle_inventory_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let limit = config::inventory::LIST_LIMIT;
    let items = deps.store.list_in_stock(0, limit)?;
    if items.is_empty() {
        bot.send_message(msg.chat.id, "📭 No records in stock.").await?;
        return Ok(());
    }

    let total = deps.store.count_in_stock()?;
    let mut text = format!("📦 Inventory ({} in stock):\n\n", total);
    for item in &items {
        text.push_str(&format!(
            "#{} {} | {} | {} | {} | qty {}\n",
            item.id,
            item.display_name(),
            item.format,
            item.condition,
            format_money(item.price),
            item.quantity
        ));
    }
    if total > limit {
        text.push_str(&format!("\n…and {} more.", total - limit));
    }

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn handle_stats_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let stats = deps.store.stats()?;
    let text = format!(
        "📊 Stats\n\nRecords in stock: {}\nCopies on hand: {}\nSales recorded: {}",
        stats.records, stats.total_quantity, stats.sales
    );
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn handle_lowstock_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let threshold = config::inventory::LOW_STOCK_THRESHOLD;
    let items = deps.store.low_stock(threshold)?;
    if items.is_empty() {
        bot.send_message(msg.chat.id, "✅ Nothing is running low.").await?;
        return Ok(());
    }

    let mut text = format!("⚠️ Low stock (≤ {}):\n\n", threshold);
    for item in &items {
        text.push_str(&format!("• {} ({}): {}\n", item.display_name(), item.condition, item.quantity));
    }
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Handle /report command: today's summary plus the CSV file
pub async fn handle_report_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let today = Local::now().date_naive();
    let report = {
        let conn = deps.store.pool().get()?;
        report::generate(&conn, today)?
    };

    if report.is_empty() {
        bot.send_message(msg.chat.id, "📭 No sales yet today.").await?;
        return Ok(());
    }

    let path = report::write_csv(&report, &deps.reports_dir)?;
    bot.send_message(msg.chat.id, report.summary_text()).await?;
    bot.send_document(msg.chat.id, InputFile::file(path)).await?;
    Ok(())
}

/// Handle /cancel command: ends whatever the user is doing
pub async fn handle_cancel_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user = message_user_key(msg);
    let text = match deps.conversations.take(user).await {
        Some(Conversation::Sale(mut sale)) => {
            // cancelling an open cart never touches stock
            if let Err(e) = sale.cart.cancel() {
                log::debug!("Cart of user {} already closed: {}", user, e);
            }
            "❌ Sale cancelled. Nothing was sold."
        }
        Some(Conversation::Add(_)) => "❌ Adding cancelled.",
        None => "Nothing to cancel.",
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
