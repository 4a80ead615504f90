use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::KeyboardMarkup;
use teloxide::utils::command::BotCommands;

use crate::broadcast::types::ChatCategory;
use crate::commands::Command;
use crate::database::DatabasePool;
use crate::handlers::admin::is_admin;
use crate::handlers::broadcast::{
    BroadcastDialogue, choose_target, open_broadcast_menu, start_manual_selection,
};
use crate::handlers::{admin_panel, statistics, ui};
use crate::keyboards::main_admin_menu;

const HELP_TEXT: &str = "❓ HELP\n\n\
    📢 Broadcast: pick a target (all / channels / groups / supergroups / manual \
    selection), send one message, confirm with your 4-digit PIN, then choose \
    forward or copy mode.\n\
    Albums are not supported as broadcast input — send a single message.\n\n\
    📊 Statistics: chat counts, broadcast history and today's senders.\n\n\
    🔐 PIN: view with /my_pin, change with /change_pin <old> <new>.\n\
    👨‍💼 Admins: /add_admin and /remove_admin (super admin only).\n\
    🗑 Chats: /delete_chat <id> <PIN> removes a dead chat (super admin only).";

/// The admin reply keyboard is only restored for admins; a cancel from
/// anyone else gets a bare reply.
fn cancel_menu(admin: bool) -> Option<KeyboardMarkup> {
    admin.then(main_admin_menu)
}

pub async fn command_handler(
    bot: Bot,
    dialogue: BroadcastDialogue,
    msg: Message,
    cmd: Command,
    db_pool: Arc<DatabasePool>,
) -> anyhow::Result<()> {
    match cmd {
        Command::Start => {
            let Some(user) = msg.from.as_ref() else {
                return Ok(());
            };
            let user_id = user.id.0 as i64;
            let is_new = db_pool
                .add_user(
                    user_id,
                    user.username.clone(),
                    Some(user.full_name()),
                )
                .await?;
            if is_new {
                log::info!("New user {} ({})", user.full_name(), user_id);
            }

            if is_admin(&db_pool, &msg).await {
                bot.send_message(
                    msg.chat.id,
                    format!("👋 Welcome, {}!\n\n✅ You are logged in as admin.", user.full_name()),
                )
                .reply_markup(main_admin_menu())
                .await?;
            } else {
                bot.send_message(msg.chat.id, "👋 Welcome!").await?;
            }
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
            bot.send_message(msg.chat.id, HELP_TEXT).await?;
        }
        Command::Cancel => {
            dialogue.exit().await?;
            let request = bot.send_message(msg.chat.id, "❌ Cancelled.");
            match cancel_menu(is_admin(&db_pool, &msg).await) {
                Some(kb) => request.reply_markup(kb).await?,
                None => request.await?,
            };
        }
    }
    Ok(())
}

/// Routes reply-keyboard button presses. Everything here is admin-only.
pub async fn menu_text_handler(
    bot: Bot,
    dialogue: BroadcastDialogue,
    msg: Message,
    db_pool: Arc<DatabasePool>,
) -> anyhow::Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if ui::is_cancel(text) {
        dialogue.exit().await?;
        let request = bot.send_message(msg.chat.id, "❌ Cancelled.");
        match cancel_menu(is_admin(&db_pool, &msg).await) {
            Some(kb) => request.reply_markup(kb).await?,
            None => request.await?,
        };
        return Ok(());
    }

    let known_button = matches!(
        text,
        ui::BTN_STATISTICS
            | ui::BTN_BROADCAST
            | ui::BTN_CHANNELS
            | ui::BTN_GROUPS
            | ui::BTN_SUPERGROUPS
            | ui::BTN_USERS
            | ui::BTN_ADMINS
            | ui::BTN_HELP
            | ui::BTN_ALL
            | ui::BTN_CHANNELS_ONLY
            | ui::BTN_GROUPS_ONLY
            | ui::BTN_SUPERGROUPS_ONLY
            | ui::BTN_MANUAL
            | ui::BTN_BACK
    );
    if !known_button {
        return Ok(());
    }

    if !is_admin(&db_pool, &msg).await {
        bot.send_message(
            msg.chat.id,
            "❌ You do not have permission to perform this action.",
        )
        .await?;
        return Ok(());
    }

    match text {
        ui::BTN_BROADCAST => open_broadcast_menu(bot, msg).await?,
        ui::BTN_ALL => choose_target(bot, dialogue, msg, db_pool, None).await?,
        ui::BTN_CHANNELS_ONLY => {
            choose_target(bot, dialogue, msg, db_pool, Some(ChatCategory::Channel)).await?
        }
        ui::BTN_GROUPS_ONLY => {
            choose_target(bot, dialogue, msg, db_pool, Some(ChatCategory::Group)).await?
        }
        ui::BTN_SUPERGROUPS_ONLY => {
            choose_target(bot, dialogue, msg, db_pool, Some(ChatCategory::Supergroup)).await?
        }
        ui::BTN_MANUAL => start_manual_selection(bot, dialogue, msg).await?,
        ui::BTN_STATISTICS => statistics::show_statistics(bot, msg, db_pool).await?,
        ui::BTN_CHANNELS => {
            statistics::show_chat_list(bot, msg, db_pool, ChatCategory::Channel).await?
        }
        ui::BTN_GROUPS => {
            statistics::show_chat_list(bot, msg, db_pool, ChatCategory::Group).await?
        }
        ui::BTN_SUPERGROUPS => {
            statistics::show_chat_list(bot, msg, db_pool, ChatCategory::Supergroup).await?
        }
        ui::BTN_USERS => statistics::show_users(bot, msg, db_pool).await?,
        ui::BTN_ADMINS => admin_panel::show_admins(bot, msg, db_pool).await?,
        ui::BTN_HELP => {
            bot.send_message(msg.chat.id, HELP_TEXT).await?;
        }
        ui::BTN_BACK => {
            bot.send_message(msg.chat.id, "📋 Main menu:")
                .reply_markup(main_admin_menu())
                .await?;
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_keyboard_is_admin_only() {
        assert!(cancel_menu(false).is_none());

        let kb = cancel_menu(true).expect("admin keyboard");
        assert_eq!(kb.keyboard[0][0].text, ui::BTN_STATISTICS);
    }
}
