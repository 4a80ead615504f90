use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ChatMemberUpdated;

use crate::broadcast::types::{ChatCategory, Destination};
use crate::database::DatabasePool;

/// Keeps the destination catalog in sync with the bot's own membership:
/// promotion to administrator registers the chat, removal deletes it.
pub async fn chat_member_handler(
    bot: Bot,
    update: ChatMemberUpdated,
    db_pool: Arc<DatabasePool>,
) -> anyhow::Result<()> {
    let chat = &update.chat;
    if chat.is_private() {
        return Ok(());
    }

    let category = if chat.is_channel() {
        ChatCategory::Channel
    } else if chat.is_supergroup() {
        ChatCategory::Supergroup
    } else {
        ChatCategory::Group
    };
    let title = chat.title().unwrap_or("Untitled").to_string();

    let was_admin = update.old_chat_member.is_administrator();
    let is_admin_now = update.new_chat_member.is_administrator();
    let is_gone = update.new_chat_member.is_left() || update.new_chat_member.is_banned();

    if is_admin_now && !was_admin {
        let destination = Destination {
            chat_id: chat.id.0,
            category,
            title: title.clone(),
            username: chat.username().map(String::from),
        };
        db_pool.upsert_chat(destination).await?;

        let counts = db_pool.get_chat_counts().await?;
        log::info!(
            "Registered {} {} ({}), {} chats total",
            category.as_str(),
            title,
            chat.id,
            counts.total
        );
        notify_admins(
            &bot,
            &db_pool,
            format!(
                "✅ Bot became ADMIN in a {}!\n\n🏷 Title: {}\n🆔 ID: {}\n\n📊 Total chats: {}",
                category.as_str(),
                title,
                chat.id.0,
                counts.total
            ),
        )
        .await;
    } else if is_gone && was_admin {
        db_pool.delete_chat(chat.id.0).await?;

        let counts = db_pool.get_chat_counts().await?;
        log::info!(
            "Removed {} {} ({}), {} chats left",
            category.as_str(),
            title,
            chat.id,
            counts.total
        );
        notify_admins(
            &bot,
            &db_pool,
            format!(
                "❌ Bot was REMOVED from a {}!\n\n🏷 Title: {}\n🆔 ID: {}\n\n📊 Total chats: {}",
                category.as_str(),
                title,
                chat.id.0,
                counts.total
            ),
        )
        .await;
    }

    Ok(())
}

/// Best-effort fan-out of a service notice to every admin.
pub async fn notify_admins(bot: &Bot, db_pool: &Arc<DatabasePool>, text: String) {
    let admins = match db_pool.get_all_admins().await {
        Ok(admins) => admins,
        Err(e) => {
            log::error!("Failed to load admins for notification: {}", e);
            return;
        }
    };

    for admin in admins {
        if let Err(e) = bot.send_message(ChatId(admin.user_id), &text).await {
            log::warn!("Failed to notify admin {}: {}", admin.user_id, e);
        }
    }
}
