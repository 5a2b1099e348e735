//! `/add`: catalog search → release → condition → price → quantity.

use climecore::catalog::{search_with_retry, CatalogCandidate};
use climecore::core::config;
use climecore::core::types::{format_money, parse_price, parse_quantity};
use climecore::AppError;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, Message, MessageId};

use super::callbacks::CallbackAction;
use super::conversation::{has_open_sale, AddDraft, Conversation, SALE_OPEN_NOTICE};
use super::handlers::{message_user_key, user_key, HandlerDeps, HandlerError};
use super::keyboards::{condition_keyboard, release_choice_keyboard};
use super::Bot;

const QUERY_PROMPT: &str = "Enter album name (Artist - Title):";
const MANUAL_PROMPT: &str = "Type the record as: Artist - Title | Format";

/// What a step left behind: the next draft (or none when finished) and the reply.
struct Step {
    draft: Option<AddDraft>,
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
}

impl Step {
    fn next(draft: AddDraft, text: impl Into<String>) -> Self {
        Self {
            draft: Some(draft),
            text: text.into(),
            keyboard: None,
        }
    }

    fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    fn done(text: impl Into<String>) -> Self {
        Self {
            draft: None,
            text: text.into(),
            keyboard: None,
        }
    }
}

/// Handle /add command
pub async fn start_add(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user = message_user_key(msg);
    let text = if begin_add(deps, user).await {
        QUERY_PROMPT
    } else {
        SALE_OPEN_NOTICE
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Opens a fresh draft unless the user has a cart open, which is left untouched.
async fn begin_add(deps: &HandlerDeps, user: i64) -> bool {
    if has_open_sale(&deps.conversations, user).await {
        log::info!("User {} tried /add during an open sale", user);
        return false;
    }
    deps.conversations
        .insert(user, Conversation::Add(AddDraft::AwaitingQuery))
        .await;
    true
}

/// Whether `user` is in the middle of `/add`.
pub async fn is_adding(deps: &HandlerDeps, user: i64) -> bool {
    matches!(deps.conversations.get(user).await, Some(Conversation::Add(_)))
}

async fn search_step(deps: &HandlerDeps, query: String, page: u32) -> Step {
    match search_with_retry(deps.catalog.as_ref(), &query, page).await {
        Ok(results) if results.is_empty() && page <= 1 => Step::next(
            AddDraft::AwaitingQuery,
            format!("🔍 Nothing found for \"{}\". Try another search:", query),
        ),
        Ok(results) if results.is_empty() => {
            Step::next(AddDraft::AwaitingQuery, "🔍 No more results. Try another search:")
        }
        Ok(results) => {
            let keyboard = release_choice_keyboard(&results, page, *config::catalog::PAGE_SIZE);
            let text = format!("🔍 Results for \"{}\" (page {}). Pick a release:", query, page);
            Step::next(AddDraft::Choosing { query, page, results }, text).with_keyboard(keyboard)
        }
        Err(e) => {
            log::warn!("Catalog search for '{}' failed: {}", query, e);
            Step::next(
                AddDraft::AwaitingManual,
                format!("⚠️ Discogs is unavailable right now.\n{}", MANUAL_PROMPT),
            )
        }
    }
}

fn condition_step(candidate: CatalogCandidate) -> Step {
    let text = format!("💿 {}\nPick the condition:", candidate.caption(200));
    Step::next(AddDraft::ChoosingCondition { candidate }, text).with_keyboard(condition_keyboard())
}

/// Applies one text reply to the draft. Input errors keep the draft where it was.
async fn text_step(deps: &HandlerDeps, user: i64, draft: AddDraft, input: &str) -> Result<Step, AppError> {
    match draft {
        AddDraft::AwaitingQuery => {
            if input.is_empty() {
                return Ok(Step::next(AddDraft::AwaitingQuery, QUERY_PROMPT));
            }
            Ok(search_step(deps, input.to_string(), 1).await)
        }
        AddDraft::AwaitingManual => match CatalogCandidate::manual(input) {
            Ok(candidate) => Ok(condition_step(candidate)),
            Err(e) => Ok(Step::next(AddDraft::AwaitingManual, e.user_message())),
        },
        AddDraft::AwaitingPrice {
            candidate,
            condition,
            suggestion,
        } => {
            let price = if input.eq_ignore_ascii_case("ok") {
                suggestion.ok_or_else(|| AppError::Validation("There is no suggested price, type one".to_string()))
            } else {
                parse_price(input)
            };
            match price {
                Ok(price) => Ok(Step::next(
                    AddDraft::AwaitingQuantity {
                        candidate,
                        condition,
                        price,
                    },
                    format!("Price set to {}. How many copies?", format_money(price)),
                )),
                Err(e) => Ok(Step::next(
                    AddDraft::AwaitingPrice {
                        candidate,
                        condition,
                        suggestion,
                    },
                    e.user_message(),
                )),
            }
        }
        AddDraft::AwaitingQuantity {
            candidate,
            condition,
            price,
        } => {
            let quantity = match parse_quantity(input) {
                Ok(quantity) => quantity,
                Err(e) => {
                    return Ok(Step::next(
                        AddDraft::AwaitingQuantity {
                            candidate,
                            condition,
                            price,
                        },
                        e.user_message(),
                    ))
                }
            };
            let item = deps
                .store
                .add_item(candidate.to_new_item(condition, price, i64::from(quantity)))?;
            log::info!("User {} added #{} {} × {}", user, item.id, item.display_name(), item.quantity);
            Ok(Step::done(format!(
                "✅ Added {} ({}) at {}, quantity {}.",
                item.display_name(),
                condition,
                format_money(item.price),
                item.quantity
            )))
        }
        other @ (AddDraft::Choosing { .. } | AddDraft::ChoosingCondition { .. }) => {
            Ok(Step::next(other, "Use the buttons above, or /cancel."))
        }
    }
}

/// Handles a plain text message from a user who is in `/add`.
pub async fn handle_add_text(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user = message_user_key(msg);
    let input = msg.text().unwrap_or_default().trim().to_string();

    let draft = match deps.conversations.take(user).await {
        Some(Conversation::Add(draft)) => draft,
        other => {
            if let Some(other) = other {
                deps.conversations.insert(user, other).await;
            }
            return Ok(());
        }
    };

    let keep = draft.clone();
    let step = match text_step(deps, user, draft, &input).await {
        Ok(step) => step,
        Err(e) => {
            log::error!("Saving a record for user {} failed: {}", user, e);
            Step::next(keep, format!("⚠️ {}", e.user_message()))
        }
    };

    if let Some(draft) = step.draft {
        deps.conversations.insert(user, Conversation::Add(draft)).await;
    }
    let mut request = bot.send_message(msg.chat.id, step.text);
    if let Some(keyboard) = step.keyboard {
        request = request.reply_markup(keyboard);
    }
    request.await?;
    Ok(())
}

async fn callback_step(deps: &HandlerDeps, draft: AddDraft, action: CallbackAction) -> Step {
    match (draft, action) {
        (_, CallbackAction::AddCancel) => Step::done("❌ Adding cancelled."),
        (AddDraft::Choosing { results, .. }, CallbackAction::AddPick(idx)) if idx < results.len() => {
            let candidate = results[idx].clone();
            condition_step(candidate)
        }
        (AddDraft::Choosing { query, .. }, CallbackAction::AddPage(page)) => search_step(deps, query, page.max(1)).await,
        (AddDraft::Choosing { .. } | AddDraft::AwaitingQuery, CallbackAction::AddManual) => {
            Step::next(AddDraft::AwaitingManual, MANUAL_PROMPT)
        }
        (AddDraft::ChoosingCondition { candidate }, CallbackAction::AddCondition(condition)) => {
            let suggestion = match candidate.external_id {
                Some(id) => deps.catalog.price_suggestion(id, condition).await,
                None => None,
            };
            let text = match suggestion {
                Some(price) => format!(
                    "Condition: {}.\n💡 Suggested price: {}. Send ok to accept or type a price:",
                    condition.full_name(),
                    format_money(price)
                ),
                None => format!("Condition: {}.\nEnter the price:", condition.full_name()),
            };
            Step::next(
                AddDraft::AwaitingPrice {
                    candidate,
                    condition,
                    suggestion,
                },
                text,
            )
        }
        (draft, action) => {
            log::debug!("Ignoring {:?} while in {:?}", action, draft);
            Step::next(draft, "")
        }
    }
}

/// Handles an `add:*` button press.
pub async fn handle_add_callback(
    bot: &Bot,
    q: &CallbackQuery,
    action: CallbackAction,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let user = user_key(&q.from);
    bot.answer_callback_query(q.id.clone()).await?;

    let Some((chat_id, message_id)) = q.message.as_ref().map(|m| (m.chat().id, m.id())) else {
        return Ok(());
    };

    let draft = match deps.conversations.take(user).await {
        Some(Conversation::Add(draft)) => draft,
        other => {
            if let Some(other) = other {
                deps.conversations.insert(user, other).await;
            }
            edit(bot, chat_id, message_id, "⌛ This search has expired. Start again with /add.", None).await;
            return Ok(());
        }
    };

    let step = callback_step(deps, draft, action).await;
    if let Some(draft) = step.draft {
        deps.conversations.insert(user, Conversation::Add(draft)).await;
    }
    if !step.text.is_empty() {
        edit(bot, chat_id, message_id, &step.text, step.keyboard).await;
    }
    Ok(())
}

async fn edit(bot: &Bot, chat_id: ChatId, message_id: MessageId, text: &str, keyboard: Option<InlineKeyboardMarkup>) {
    let mut request = bot.edit_message_text(chat_id, message_id, text);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(keyboard);
    }
    if let Err(e) = request.await {
        log::debug!("Failed to edit add message: {}", e);
    }
}
