//! Reply-keyboard button labels. Handlers match on these, keyboards render
//! them; keep the two in sync through this module only.

// Main admin menu.
pub const BTN_STATISTICS: &str = "📊 Statistics";
pub const BTN_BROADCAST: &str = "📢 Broadcast";
pub const BTN_CHANNELS: &str = "📋 Channels";
pub const BTN_GROUPS: &str = "👥 Groups";
pub const BTN_SUPERGROUPS: &str = "🔥 Supergroups";
pub const BTN_USERS: &str = "👤 Users";
pub const BTN_ADMINS: &str = "👨‍💼 Admins";
pub const BTN_HELP: &str = "❓ Help";

// Broadcast target menu.
pub const BTN_ALL: &str = "📢 Send to all";
pub const BTN_CHANNELS_ONLY: &str = "📺 Channels only";
pub const BTN_GROUPS_ONLY: &str = "👥 Groups only";
pub const BTN_SUPERGROUPS_ONLY: &str = "🔥 Supergroups only";
pub const BTN_MANUAL: &str = "🎯 Select manually";

pub const BTN_BACK: &str = "🔙 Back";
pub const BTN_CANCEL: &str = "❌ Cancel";

/// A cancel token aborts the current broadcast stage wherever it shows up.
pub fn is_cancel(text: &str) -> bool {
    matches!(text, BTN_CANCEL | "/cancel")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_tokens_are_recognized() {
        assert!(is_cancel(BTN_CANCEL));
        assert!(is_cancel("/cancel"));
        assert!(!is_cancel("cancel"));
        assert!(!is_cancel(BTN_BACK));
    }
}
