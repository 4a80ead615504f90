use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

use crate::broadcast::types::{ChatCategory, Destination};
use crate::handlers::ui::{
    BTN_ADMINS, BTN_ALL, BTN_BACK, BTN_BROADCAST, BTN_CANCEL, BTN_CHANNELS, BTN_CHANNELS_ONLY,
    BTN_GROUPS, BTN_GROUPS_ONLY, BTN_HELP, BTN_MANUAL, BTN_STATISTICS, BTN_SUPERGROUPS,
    BTN_SUPERGROUPS_ONLY, BTN_USERS,
};

pub fn main_admin_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(BTN_STATISTICS),
            KeyboardButton::new(BTN_BROADCAST),
        ],
        vec![
            KeyboardButton::new(BTN_CHANNELS),
            KeyboardButton::new(BTN_GROUPS),
        ],
        vec![
            KeyboardButton::new(BTN_SUPERGROUPS),
            KeyboardButton::new(BTN_USERS),
        ],
        vec![
            KeyboardButton::new(BTN_ADMINS),
            KeyboardButton::new(BTN_HELP),
        ],
    ])
    .resize_keyboard()
}

pub fn broadcast_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(BTN_ALL)],
        vec![
            KeyboardButton::new(BTN_CHANNELS_ONLY),
            KeyboardButton::new(BTN_GROUPS_ONLY),
            KeyboardButton::new(BTN_SUPERGROUPS_ONLY),
        ],
        vec![KeyboardButton::new(BTN_MANUAL)],
        vec![KeyboardButton::new(BTN_BACK)],
    ])
    .resize_keyboard()
}

pub fn cancel_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(BTN_CANCEL)]]).resize_keyboard()
}

/// Candidate category picker for manual targeting.
pub fn chat_type_selection_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("📺 Channels", "select_channels"),
            InlineKeyboardButton::callback("👥 Groups", "select_groups"),
        ],
        vec![InlineKeyboardButton::callback(
            "📋 All chats",
            "select_all_chats",
        )],
        vec![InlineKeyboardButton::callback("🔙 Back", "back_to_menu")],
    ])
}

/// Checkbox-style destination picker. The confirm button only appears once
/// something is selected, so an empty confirmation cannot be sent from a
/// fresh keyboard.
pub fn chat_selection_keyboard(
    available: &[Destination],
    selected: &[i64],
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = available
        .iter()
        .map(|chat| {
            let checkbox = if selected.contains(&chat.chat_id) {
                "✅"
            } else {
                "⬜"
            };
            let icon = match chat.category {
                ChatCategory::Channel => "📺",
                ChatCategory::Group | ChatCategory::Supergroup => "👥",
            };
            vec![InlineKeyboardButton::callback(
                format!("{checkbox} {icon} {}", chat.title),
                format!("toggle_chat_{}", chat.chat_id),
            )]
        })
        .collect();

    let mut bottom = Vec::new();
    if !selected.is_empty() {
        bottom.push(InlineKeyboardButton::callback(
            format!("✅ Send ({})", selected.len()),
            "confirm_selected",
        ));
    }
    bottom.push(InlineKeyboardButton::callback(
        "❌ Cancel",
        "cancel_selection",
    ));
    rows.push(bottom);

    InlineKeyboardMarkup::new(rows)
}

/// Copy/forward choice shown after the PIN is verified.
pub fn send_mode_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📨 Forward", "send_forward")],
        vec![InlineKeyboardButton::callback(
            "📋 Copy (no forward)",
            "send_copy",
        )],
        vec![InlineKeyboardButton::callback(
            "❌ Cancel",
            "cancel_broadcast",
        )],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest(chat_id: i64) -> Destination {
        Destination {
            chat_id,
            category: ChatCategory::Channel,
            title: format!("chat {chat_id}"),
            username: None,
        }
    }

    #[test]
    fn selection_keyboard_marks_selected_rows() {
        let kb = chat_selection_keyboard(&[dest(1), dest(2)], &[2]);
        // One row per chat plus the bottom row.
        assert_eq!(kb.inline_keyboard.len(), 3);
        assert!(kb.inline_keyboard[0][0].text.starts_with("⬜"));
        assert!(kb.inline_keyboard[1][0].text.starts_with("✅"));
    }

    #[test]
    fn confirm_button_requires_a_selection() {
        let empty = chat_selection_keyboard(&[dest(1)], &[]);
        assert_eq!(empty.inline_keyboard.last().unwrap().len(), 1);

        let picked = chat_selection_keyboard(&[dest(1)], &[1]);
        let bottom = picked.inline_keyboard.last().unwrap();
        assert_eq!(bottom.len(), 2);
        assert!(bottom[0].text.contains("(1)"));
    }
}
