use std::sync::Arc;

use teloxide::prelude::*;

use crate::broadcast::outbound::TelegramOutbound;
use crate::broadcast::state::{BroadcastState, confirm_selection, toggle_selection};
use crate::broadcast::types::{ChatCategory, Destination, Payload, SendMode};
use crate::broadcast::traits::DestinationCatalog;
use crate::database::DatabasePool;
use crate::handlers::broadcast::{BroadcastDialogue, execute_broadcast};
use crate::keyboards::{cancel_keyboard, chat_selection_keyboard, main_admin_menu};

/// Manual-selection callbacks while the dialogue is in `SelectingChats`.
pub async fn selection_callback(
    bot: Bot,
    dialogue: BroadcastDialogue,
    q: CallbackQuery,
    db_pool: Arc<DatabasePool>,
    (available, selected): (Vec<Destination>, Vec<i64>),
) -> anyhow::Result<()> {
    let Some(data) = q.data.clone() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let Some(message) = q.message.as_ref().and_then(|m| m.regular_message()).cloned() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    match data.as_str() {
        "back_to_menu" | "cancel_selection" => {
            bot.answer_callback_query(q.id).text("❌ Cancelled").await?;
            bot.edit_message_text(message.chat.id, message.id, "❌ Process cancelled.")
                .await?;
            bot.send_message(message.chat.id, "📋 Main menu:")
                .reply_markup(main_admin_menu())
                .await?;
            dialogue.exit().await?;
        }

        "select_channels" | "select_groups" | "select_all_chats" => {
            let (chats, label) = match data.as_str() {
                "select_channels" => (
                    db_pool.list_by_category(ChatCategory::Channel).await?,
                    "📺 Channels",
                ),
                "select_groups" => (
                    db_pool.list_by_category(ChatCategory::Group).await?,
                    "👥 Groups",
                ),
                _ => (db_pool.list_active().await?, "📋 All chats"),
            };
            bot.answer_callback_query(q.id).await?;

            if chats.is_empty() {
                bot.edit_message_text(message.chat.id, message.id, "❌ No chats found!")
                    .await?;
                return Ok(());
            }

            bot.edit_message_text(
                message.chat.id,
                message.id,
                format!("{label} ({}):", chats.len()),
            )
            .reply_markup(chat_selection_keyboard(&chats, &[]))
            .await?;

            dialogue
                .update(BroadcastState::SelectingChats {
                    available: chats,
                    selected: Vec::new(),
                })
                .await?;
        }

        _ if data.starts_with("toggle_chat_") => {
            let Ok(chat_id) = data["toggle_chat_".len()..].parse::<i64>() else {
                bot.answer_callback_query(q.id).await?;
                return Ok(());
            };

            let mut selected = selected;
            let now_selected = toggle_selection(&mut selected, chat_id);
            bot.answer_callback_query(q.id)
                .text(if now_selected { "✅ Selected" } else { "❌ Removed" })
                .await?;

            bot.edit_message_text(
                message.chat.id,
                message.id,
                format!("Selected: {} chats", selected.len()),
            )
            .reply_markup(chat_selection_keyboard(&available, &selected))
            .await?;

            dialogue
                .update(BroadcastState::SelectingChats {
                    available,
                    selected,
                })
                .await?;
        }

        "confirm_selected" => {
            if selected.is_empty() {
                // Rejected in place, no transition.
                bot.answer_callback_query(q.id)
                    .text("❌ No chats selected!")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }

            let targets = confirm_selection(&available, &selected);
            bot.answer_callback_query(q.id).await?;
            bot.edit_message_text(
                message.chat.id,
                message.id,
                format!("✅ {} chats selected.", targets.len()),
            )
            .await?;
            bot.send_message(message.chat.id, "📝 Send your message.")
                .reply_markup(cancel_keyboard())
                .await?;

            let target_label = format!("{} selected chats", targets.len());
            dialogue
                .update(BroadcastState::AwaitingPayload {
                    targets,
                    target_label,
                })
                .await?;
        }

        _ => {
            bot.answer_callback_query(q.id).await?;
        }
    }

    Ok(())
}

/// Copy/forward choice after a verified PIN. Picking a mode runs the fan-out
/// to completion; there is no cancellation once dispatch starts.
pub async fn send_mode_callback(
    bot: Bot,
    dialogue: BroadcastDialogue,
    q: CallbackQuery,
    db_pool: Arc<DatabasePool>,
    (targets, payload): (Vec<Destination>, Payload),
) -> anyhow::Result<()> {
    let Some(data) = q.data.clone() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let Some(message) = q.message.as_ref().and_then(|m| m.regular_message()).cloned() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let mode = match data.as_str() {
        "send_copy" => SendMode::Copy,
        "send_forward" => SendMode::Forward,
        "cancel_broadcast" => {
            bot.answer_callback_query(q.id)
                .text("❌ Broadcast cancelled")
                .await?;
            let _ = bot
                .edit_message_reply_markup(message.chat.id, message.id)
                .await;
            bot.send_message(message.chat.id, "📋 Main menu:")
                .reply_markup(main_admin_menu())
                .await?;
            dialogue.exit().await?;
            return Ok(());
        }
        _ => {
            bot.answer_callback_query(q.id).await?;
            return Ok(());
        }
    };

    bot.answer_callback_query(q.id)
        .text("🚀 Starting broadcast...")
        .await?;
    let _ = bot
        .edit_message_reply_markup(message.chat.id, message.id)
        .await;
    bot.send_message(message.chat.id, "🚀 Broadcasting...")
        .await?;

    let operator = q.from.id.0 as i64;
    let client = TelegramOutbound::new(bot.clone());
    let report = execute_broadcast(
        &client,
        db_pool.as_ref(),
        operator,
        &targets,
        &payload,
        mode,
    )
    .await;

    bot.send_message(
        message.chat.id,
        format!(
            "✅ Broadcast completed!\n📊 Sent: {}/{}\n❌ Failed: {}",
            report.success, report.total, report.failed
        ),
    )
    .reply_markup(main_admin_menu())
    .await?;

    dialogue.exit().await?;
    Ok(())
}

/// Callback arriving outside any broadcast stage (stale keyboard).
pub async fn stale_callback(bot: Bot, q: CallbackQuery) -> anyhow::Result<()> {
    bot.answer_callback_query(q.id)
        .text("Nothing in progress.")
        .await?;
    Ok(())
}
