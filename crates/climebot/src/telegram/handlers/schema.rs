//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{
    handle_cancel_command, handle_inventory_command, handle_lowstock_command, handle_report_command,
    handle_start_command, handle_stats_command,
};
use super::types::{message_user_key, HandlerDeps, HandlerError};
use crate::telegram::add::{handle_add_callback, handle_add_text, is_adding, start_add};
use crate::telegram::bot::Command;
use crate::telegram::callbacks::CallbackAction;
use crate::telegram::sell::{handle_sell_callback, start_sell};
use crate::telegram::Bot;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Commands come first, then free text of an `/add` conversation, then button presses.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_add_text = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(add_text_handler(deps_add_text))
        .branch(callback_handler(deps_callback))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);

                let result = match cmd {
                    Command::Start => handle_start_command(&bot, &msg).await,
                    Command::Inventory => handle_inventory_command(&bot, &msg, &deps).await,
                    Command::Add => start_add(&bot, &msg, &deps).await,
                    Command::Sell => start_sell(&bot, &msg, &deps).await,
                    Command::Report => handle_report_command(&bot, &msg, &deps).await,
                    Command::Stats => handle_stats_command(&bot, &msg, &deps).await,
                    Command::Lowstock => handle_lowstock_command(&bot, &msg, &deps).await,
                    Command::Cancel => handle_cancel_command(&bot, &msg, &deps).await,
                };

                if let Err(e) = result {
                    log::error!("❌ Command {:?} failed for chat {}: {}", cmd, msg.chat.id, e);
                    let _ = bot
                        .send_message(msg.chat.id, "⚠️ Something went wrong, please try again.")
                        .await;
                }
                Ok(())
            }
        },
    ))
}

/// Plain text while an `/add` conversation is open
fn add_text_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_filter = deps.clone();

    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some_and(|text| !text.starts_with('/')))
        .filter_async(move |msg: Message| {
            let deps = deps_filter.clone();
            async move { is_adding(&deps, message_user_key(&msg)).await }
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_add_text(&bot, &msg, &deps).await {
                    log::error!("❌ /add step failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let Some(data) = q.data.as_deref() else {
                bot.answer_callback_query(q.id.clone()).await?;
                return Ok(());
            };

            let action = match data.parse::<CallbackAction>() {
                Ok(action) => action,
                Err(e) => {
                    log::warn!("{}", e);
                    bot.answer_callback_query(q.id.clone())
                        .text("This button is no longer valid.")
                        .await?;
                    return Ok(());
                }
            };

            if action.is_sell() {
                handle_sell_callback(&bot, &q, action, &deps).await
            } else {
                handle_add_callback(&bot, &q, action, &deps).await
            }
        }
    })
}
