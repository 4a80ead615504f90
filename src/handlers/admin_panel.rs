use std::sync::Arc;

use teloxide::prelude::*;

use crate::broadcast::traits::PinVault;
use crate::commands::AdminCommand;
use crate::database::DatabasePool;
use crate::handlers::admin::{is_admin, is_super_admin};
use crate::handlers::broadcast::is_valid_pin;
use crate::handlers::chat_member::notify_admins;

/// "👨‍💼 Admins" menu button: list admins, marking super admins.
pub async fn show_admins(bot: Bot, msg: Message, db_pool: Arc<DatabasePool>) -> anyhow::Result<()> {
    let admins = db_pool.get_all_admins().await?;
    let super_ids = db_pool.get_super_admin_ids().await?;

    if admins.is_empty() {
        bot.send_message(msg.chat.id, "❌ No admins found!").await?;
        return Ok(());
    }

    let mut text = "👨‍💼 ADMINS LIST\n\n".to_string();
    for (idx, admin) in admins.iter().enumerate() {
        let name = admin
            .username
            .as_deref()
            .map(|u| format!("@{u}"))
            .or_else(|| admin.full_name.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        text.push_str(&format!(
            "{}. {}\n🆔 {}\n📅 Added: {}\n",
            idx + 1,
            name,
            admin.user_id,
            admin.added_date
        ));
        if super_ids.contains(&admin.user_id) {
            text.push_str("👑 Super Admin\n");
        }
        text.push('\n');
    }
    text.push_str("➕ Add admin: /add_admin <id>\n➖ Remove admin: /remove_admin <id>\n");

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn admin_command_handler(
    bot: Bot,
    msg: Message,
    cmd: AdminCommand,
    db_pool: Arc<DatabasePool>,
) -> anyhow::Result<()> {
    if !is_admin(&db_pool, &msg).await {
        bot.send_message(
            msg.chat.id,
            "❌ You do not have permission to perform this action.",
        )
        .await?;
        return Ok(());
    }
    let caller = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or_default();

    match cmd {
        AdminCommand::AddAdmin { user_id } => {
            if !is_super_admin(&db_pool, caller).await {
                bot.send_message(msg.chat.id, "⛔ Only a super admin can add admins!")
                    .await?;
                return Ok(());
            }
            let Ok(new_admin_id) = user_id.trim().parse::<i64>() else {
                bot.send_message(msg.chat.id, "❌ Invalid ID! Usage: /add_admin 123456789")
                    .await?;
                return Ok(());
            };
            if db_pool.is_admin(new_admin_id).await? {
                bot.send_message(msg.chat.id, "⚠ This user is already an admin!")
                    .await?;
                return Ok(());
            }

            let pin = db_pool.add_admin(new_admin_id, None, None).await?;
            bot.send_message(
                msg.chat.id,
                format!("✅ Admin added!\n\n🆔 ID: {new_admin_id}\n🔐 PIN: {pin}"),
            )
            .await?;

            // The new admin may never have messaged the bot yet.
            if let Err(e) = bot
                .send_message(
                    ChatId(new_admin_id),
                    format!(
                        "🎉 You have been added as an admin.\n\n\
                         🔐 Your PIN code: {pin}\n❗ Keep your PIN secret!"
                    ),
                )
                .await
            {
                log::warn!("Could not greet new admin {}: {}", new_admin_id, e);
            }
            notify_admins(
                &bot,
                &db_pool,
                format!("🆕 New admin added\n\n🆔 ID: {new_admin_id}\n➕ Added by: {caller}"),
            )
            .await;
        }

        AdminCommand::RemoveAdmin { user_id } => {
            if !is_super_admin(&db_pool, caller).await {
                bot.send_message(msg.chat.id, "⛔ Only a super admin can remove admins!")
                    .await?;
                return Ok(());
            }
            let Ok(admin_id) = user_id.trim().parse::<i64>() else {
                bot.send_message(msg.chat.id, "❌ Invalid ID format!").await?;
                return Ok(());
            };
            if db_pool.is_super_admin(admin_id).await? {
                bot.send_message(msg.chat.id, "⛔ A super admin cannot be removed!")
                    .await?;
                return Ok(());
            }
            if !db_pool.is_admin(admin_id).await? {
                bot.send_message(msg.chat.id, "❌ Admin not found!").await?;
                return Ok(());
            }

            db_pool.remove_admin(admin_id).await?;
            bot.send_message(msg.chat.id, format!("✅ Admin removed!\n\n🆔 {admin_id}"))
                .await?;
            if let Err(e) = bot
                .send_message(ChatId(admin_id), "⛔ You have been removed from the admin role.")
                .await
            {
                log::warn!("Could not notify removed admin {}: {}", admin_id, e);
            }
        }

        AdminCommand::MyPin => match db_pool.get_admin_pin(caller).await? {
            Some(pin) => {
                bot.send_message(msg.chat.id, format!("🔐 Your PIN code: {pin}"))
                    .await?;
            }
            None => {
                bot.send_message(msg.chat.id, "❌ You are not an admin!").await?;
            }
        },

        AdminCommand::ChangePin { old, new } => {
            if !is_valid_pin(old.trim()) || !is_valid_pin(new.trim()) {
                bot.send_message(
                    msg.chat.id,
                    "❌ Wrong format. Usage: /change_pin <old> <new>, 4 digits each.",
                )
                .await?;
                return Ok(());
            }
            match db_pool.get_admin_pin(caller).await? {
                Some(stored) if stored == old.trim() => {
                    db_pool.update_pin(caller, new.trim().to_string()).await?;
                    bot.send_message(msg.chat.id, "✅ PIN updated successfully!")
                        .await?;
                }
                _ => {
                    bot.send_message(msg.chat.id, "❌ Incorrect PIN!").await?;
                }
            }
        }

        AdminCommand::DeleteChat { chat_id, pin } => {
            if !is_super_admin(&db_pool, caller).await {
                bot.send_message(msg.chat.id, "⛔ Only a super admin can delete chats!")
                    .await?;
                return Ok(());
            }
            let Ok(chat_id) = chat_id.trim().parse::<i64>() else {
                bot.send_message(
                    msg.chat.id,
                    "❌ Invalid ID! Usage: /delete_chat -1001234567890 <PIN>",
                )
                .await?;
                return Ok(());
            };
            if !is_valid_pin(pin.trim()) {
                bot.send_message(msg.chat.id, "❌ Wrong format. The PIN is exactly 4 digits.")
                    .await?;
                return Ok(());
            }
            if !db_pool.verify_pin(caller, pin.trim()).await? {
                bot.send_message(msg.chat.id, "⛔ Wrong PIN. Chat not deleted.")
                    .await?;
                return Ok(());
            }

            if !db_pool.delete_chat(chat_id).await? {
                bot.send_message(msg.chat.id, "❌ Chat not found!").await?;
                return Ok(());
            }
            bot.send_message(msg.chat.id, format!("✅ Chat deleted!\n\n🆔 {chat_id}"))
                .await?;
            notify_admins(
                &bot,
                &db_pool,
                format!("🗑 Chat removed from broadcasts\n\n🆔 ID: {chat_id}\n➖ Removed by: {caller}"),
            )
            .await;
        }

        AdminCommand::ListSuperAdmins => {
            let super_ids = db_pool.get_super_admin_ids().await?;
            if super_ids.is_empty() {
                bot.send_message(msg.chat.id, "❌ No super admins found!").await?;
                return Ok(());
            }
            let mut text = "👑 SUPER ADMINS\n\n".to_string();
            for (i, id) in super_ids.iter().enumerate() {
                text.push_str(&format!("{}. 🆔 {}\n", i + 1, id));
            }
            bot.send_message(msg.chat.id, text).await?;
        }
    }

    Ok(())
}
