use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
pub enum Command {
    #[command(description = "display this text.")]
    Help,
    #[command(description = "start the bot.")]
    Start,
    #[command(description = "abort the current action.")]
    Cancel,
}

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case")]
pub enum AdminCommand {
    #[command(description = "add an admin: /add_admin <user id>")]
    AddAdmin { user_id: String },
    #[command(description = "remove an admin: /remove_admin <user id>")]
    RemoveAdmin { user_id: String },
    #[command(description = "show your broadcast PIN.")]
    MyPin,
    #[command(description = "change your PIN: /change_pin <old> <new>", parse_with = "split")]
    ChangePin { old: String, new: String },
    #[command(description = "list super admins.")]
    ListSuperAdmins,
    #[command(
        description = "delete a chat: /delete_chat <chat id> <PIN>",
        parse_with = "split"
    )]
    DeleteChat { chat_id: String, pin: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_chat_takes_id_and_pin() {
        let cmd = AdminCommand::parse("/delete_chat -1001234 5678", "testbot").unwrap();
        match cmd {
            AdminCommand::DeleteChat { chat_id, pin } => {
                assert_eq!(chat_id, "-1001234");
                assert_eq!(pin, "5678");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn change_pin_takes_both_pins() {
        let cmd = AdminCommand::parse("/change_pin 1111 2222", "testbot").unwrap();
        match cmd {
            AdminCommand::ChangePin { old, new } => {
                assert_eq!(old, "1111");
                assert_eq!(new, "2222");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
