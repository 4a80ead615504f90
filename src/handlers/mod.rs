pub mod admin;
pub mod admin_panel;
pub mod broadcast;
pub mod callback;
pub mod chat_member;
pub mod command;
pub mod statistics;
pub mod ui;

pub use admin_panel::admin_command_handler;
pub use broadcast::{receive_payload, receive_pin};
pub use callback::{selection_callback, send_mode_callback, stale_callback};
pub use chat_member::chat_member_handler;
pub use command::{command_handler, menu_text_handler};
