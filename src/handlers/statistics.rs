use std::sync::Arc;

use teloxide::prelude::*;

use crate::broadcast::types::ChatCategory;
use crate::database::DatabasePool;

/// Safe chunk size below Telegram's 4096-character message limit.
const MAX_LEN: usize = 3900;

pub async fn show_statistics(
    bot: Bot,
    msg: Message,
    db_pool: Arc<DatabasePool>,
) -> anyhow::Result<()> {
    let chats = db_pool.get_chat_counts().await?;
    let totals = db_pool.get_broadcast_totals().await?;
    let buckets = db_pool.get_broadcast_time_stats().await?;
    let admins = db_pool.get_all_admins().await?;
    let today_admins = db_pool.get_today_broadcast_admins().await?;

    let mut text = format!(
        "📊 BOT STATISTICS\n\n\
         💬 Chats:\n\
         ├ 📺 Channels: {}\n\
         ├ 👥 Groups: {}\n\
         ├ 🔥 Supergroups: {}\n\
         └ 📋 Total: {}\n\n\
         📨 Broadcasts by time:\n\
         ├ 📅 Today: {}\n\
         ├ 🗓 This week: {}\n\
         ├ 📆 This month: {}\n\
         └ 🧮 Total: {}\n\n\
         📢 Delivery results:\n\
         ├ ✅ Successful: {}\n\
         └ ❌ Failed: {}\n\n\
         👨‍💼 Total admins: {}\n",
        chats.channels,
        chats.groups,
        chats.supergroups,
        chats.total,
        buckets.today,
        buckets.week,
        buckets.month,
        buckets.total,
        totals.success,
        totals.failed,
        admins.len()
    );

    if today_admins.is_empty() {
        text.push_str("\n📅 No broadcasts were sent today.");
    } else {
        text.push_str("\n📅 Admins who sent broadcasts today:\n");
        for name in today_admins {
            text.push_str(&format!("• {name}\n"));
        }
    }

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Chunked listing of one destination category.
pub async fn show_chat_list(
    bot: Bot,
    msg: Message,
    db_pool: Arc<DatabasePool>,
    category: ChatCategory,
) -> anyhow::Result<()> {
    let chats = db_pool.get_chats_by_type(category).await?;

    if chats.is_empty() {
        bot.send_message(
            msg.chat.id,
            format!(
                "No {}s found yet.\n\nAdd the bot as an admin to register one.",
                category.as_str()
            ),
        )
        .await?;
        return Ok(());
    }

    let header = format!("📋 {}S ({})\n\n", category.as_str().to_uppercase(), chats.len());
    let mut text = header.clone();

    for (idx, chat) in chats.iter().enumerate() {
        let username = chat
            .username
            .as_deref()
            .map(|u| format!("@{u}"))
            .unwrap_or_else(|| "no username".to_string());
        let block = format!(
            "{}. {}\n   🆔 {}\n   🔗 {}\n\n",
            idx + 1,
            chat.title,
            chat.chat_id,
            username
        );

        if text.len() + block.len() > MAX_LEN {
            bot.send_message(msg.chat.id, text).await?;
            text = header.clone();
        }
        text.push_str(&block);
    }

    if text != header {
        bot.send_message(msg.chat.id, text).await?;
    }
    Ok(())
}

pub async fn show_users(bot: Bot, msg: Message, db_pool: Arc<DatabasePool>) -> anyhow::Result<()> {
    let users = db_pool.get_all_users().await?;

    if users.is_empty() {
        bot.send_message(msg.chat.id, "❌ No users found in the database.")
            .await?;
        return Ok(());
    }

    let header = "👤 Users list:\n\n".to_string();
    let mut text = header.clone();

    for (idx, user) in users.iter().enumerate() {
        let username = user
            .username
            .as_deref()
            .map(|u| format!("@{u}"))
            .unwrap_or_else(|| "no username".to_string());
        let block = format!(
            "{}. {} | 🆔 {} | {} | first seen {}\n",
            idx + 1,
            user.full_name.as_deref().unwrap_or("Unknown"),
            user.user_id,
            username,
            user.first_seen
        );

        if text.len() + block.len() > MAX_LEN {
            bot.send_message(msg.chat.id, text).await?;
            text = header.clone();
        }
        text.push_str(&block);
    }

    if text != header {
        bot.send_message(msg.chat.id, text).await?;
    }

    bot.send_message(msg.chat.id, format!("📊 Total users: {}", users.len()))
        .await?;
    Ok(())
}
