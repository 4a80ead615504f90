use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::prelude::*;

use crate::broadcast::capture::RejectionCooldown;
use crate::broadcast::dispatcher::run_broadcast;
use crate::broadcast::outbound::OutboundClient;
use crate::broadcast::state::BroadcastState;
use crate::broadcast::traits::{BroadcastRecord, DestinationCatalog, PinVault, StatsRecorder};
use crate::broadcast::types::{ChatCategory, Destination, DispatchReport, Payload, SendMode};
use crate::database::DatabasePool;
use crate::handlers::ui;
use crate::keyboards::{broadcast_menu, cancel_keyboard, chat_type_selection_keyboard, main_admin_menu};

pub type BroadcastDialogue = Dialogue<BroadcastState, InMemStorage<BroadcastState>>;

lazy_static! {
    static ref PIN_FORMAT: Regex = Regex::new(r"^\d{4}$").expect("valid PIN regex");
}

pub fn is_valid_pin(candidate: &str) -> bool {
    PIN_FORMAT.is_match(candidate)
}

fn operator_id(msg: &Message) -> i64 {
    msg.from
        .as_ref()
        .map(|u| u.id.0 as i64)
        .unwrap_or(msg.chat.id.0)
}

/// "📢 Broadcast" menu button: show the target selection menu.
pub async fn open_broadcast_menu(bot: Bot, msg: Message) -> anyhow::Result<()> {
    bot.send_message(
        msg.chat.id,
        "📢 Broadcast message\n\nChoose where you want to send the message:",
    )
    .reply_markup(broadcast_menu())
    .await?;
    Ok(())
}

/// All-mode or category-only targeting: resolves the full target set right
/// away. An empty resolution reports and leaves the dialogue in Idle.
pub async fn choose_target(
    bot: Bot,
    dialogue: BroadcastDialogue,
    msg: Message,
    db_pool: Arc<DatabasePool>,
    category: Option<ChatCategory>,
) -> anyhow::Result<()> {
    let (targets, label) = match category {
        None => (db_pool.list_active().await?, "all chats".to_string()),
        Some(cat) => (
            db_pool.list_by_category(cat).await?,
            format!("{}s", cat.as_str()),
        ),
    };

    if targets.is_empty() {
        bot.send_message(msg.chat.id, format!("❌ No {label} found!"))
            .await?;
        return Ok(());
    }

    bot.send_message(
        msg.chat.id,
        format!(
            "📨 Message will be sent to {} {label}.\n\n📝 Send your message.",
            targets.len()
        ),
    )
    .reply_markup(cancel_keyboard())
    .await?;

    dialogue
        .update(BroadcastState::AwaitingPayload {
            targets,
            target_label: label,
        })
        .await?;
    Ok(())
}

/// Manual targeting entry: ask which candidate category to snapshot.
pub async fn start_manual_selection(
    bot: Bot,
    dialogue: BroadcastDialogue,
    msg: Message,
) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, "🎯 Select chat type:")
        .reply_markup(chat_type_selection_keyboard())
        .await?;

    dialogue
        .update(BroadcastState::SelectingChats {
            available: Vec::new(),
            selected: Vec::new(),
        })
        .await?;
    Ok(())
}

/// AwaitingPayload: the next message becomes the broadcast payload, unless it
/// is a cancel token or part of an album.
pub async fn receive_payload(
    bot: Bot,
    dialogue: BroadcastDialogue,
    msg: Message,
    cooldown: Arc<RejectionCooldown>,
    (targets, target_label): (Vec<Destination>, String),
) -> anyhow::Result<()> {
    if let Some(text) = msg.text() {
        if ui::is_cancel(text) {
            bot.send_message(msg.chat.id, "❌ Process cancelled.")
                .reply_markup(main_admin_menu())
                .await?;
            dialogue.exit().await?;
            return Ok(());
        }
    }

    let operator = operator_id(&msg);

    // Albums arrive as several physical messages; the whole submission is
    // rejected and only the first part produces a notice.
    if msg.media_group_id().is_some() {
        dialogue.exit().await?;
        if cooldown.should_notify(operator) {
            bot.send_message(
                msg.chat.id,
                "❌ Album messages are not supported.\n\n\
                 Please send only one message, photo, video or file.",
            )
            .reply_markup(main_admin_menu())
            .await?;
        }
        return Ok(());
    }
    cooldown.clear(operator);

    let Some(payload) = Payload::from_message(&msg) else {
        bot.send_message(
            msg.chat.id,
            "❌ Unsupported message type. Send text, a photo, video, document, \
             audio, voice message, video note or sticker.",
        )
        .await?;
        return Ok(());
    };

    bot.send_message(
        msg.chat.id,
        format!("🔐 Message will be sent to {target_label}.\n\nEnter your PIN code:"),
    )
    .reply_markup(cancel_keyboard())
    .await?;

    dialogue
        .update(BroadcastState::AwaitingPin { targets, payload })
        .await?;
    Ok(())
}

/// AwaitingPin: format errors are rejected in place without consulting the
/// credentials store; a well-formed wrong PIN aborts the whole broadcast.
pub async fn receive_pin(
    bot: Bot,
    dialogue: BroadcastDialogue,
    msg: Message,
    db_pool: Arc<DatabasePool>,
    (targets, payload): (Vec<Destination>, Payload),
) -> anyhow::Result<()> {
    let text = msg.text().unwrap_or_default().trim();

    if ui::is_cancel(text) {
        bot.send_message(msg.chat.id, "❌ Process cancelled.")
            .reply_markup(main_admin_menu())
            .await?;
        dialogue.exit().await?;
        return Ok(());
    }

    if !is_valid_pin(text) {
        bot.send_message(msg.chat.id, "❌ Wrong format. The PIN is exactly 4 digits.")
            .await?;
        return Ok(());
    }

    let operator = operator_id(&msg);
    if !db_pool.verify_pin(operator, text).await? {
        // Fail closed: one mismatch discards the session, no retries.
        bot.send_message(msg.chat.id, "⛔ Wrong PIN. Broadcast aborted.")
            .reply_markup(main_admin_menu())
            .await?;
        dialogue.exit().await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, "✅ PIN accepted. Choose how to deliver the message:")
        .reply_markup(crate::keyboards::send_mode_keyboard())
        .await?;

    dialogue
        .update(BroadcastState::ChoosingSendMode { targets, payload })
        .await?;
    Ok(())
}

/// Runs the fan-out and persists the tally, exactly one record per run.
/// Recorder failures are logged but never hide the delivery report from the
/// operator.
pub async fn execute_broadcast(
    client: &dyn OutboundClient,
    recorder: &dyn StatsRecorder,
    operator: i64,
    targets: &[Destination],
    payload: &Payload,
    mode: SendMode,
) -> DispatchReport {
    let report = run_broadcast(client, targets, payload, mode).await;

    let record = BroadcastRecord {
        admin_id: operator,
        total: report.total as i64,
        success: report.success as i64,
        failed: report.failed as i64,
        mode,
        message_type: payload.kind.as_str(),
        message_text: payload.snippet.clone(),
    };
    if let Err(e) = recorder.record(&record).await {
        log::error!("Failed to record broadcast stats: {}", e);
    }

    log::info!(
        "Broadcast by {} ({}): {}/{} delivered, {} failed",
        operator,
        mode.as_str(),
        report.success,
        report.total,
        report.failed
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::outbound::SendError;
    use crate::broadcast::types::PayloadKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct OneDeniedClient {
        denied: i64,
    }

    #[async_trait]
    impl OutboundClient for OneDeniedClient {
        async fn send_copy(&self, destination: i64, _payload: &Payload) -> Result<(), SendError> {
            if destination == self.denied {
                Err(SendError::Denied)
            } else {
                Ok(())
            }
        }

        async fn send_forward(
            &self,
            destination: i64,
            _payload: &Payload,
        ) -> Result<(), SendError> {
            if destination == self.denied {
                Err(SendError::Denied)
            } else {
                Ok(())
            }
        }
    }

    struct CountingRecorder {
        records: Mutex<Vec<BroadcastRecord>>,
    }

    #[async_trait]
    impl StatsRecorder for CountingRecorder {
        async fn record(&self, record: &BroadcastRecord) -> anyhow::Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn targets(ids: &[i64]) -> Vec<Destination> {
        ids.iter()
            .map(|&chat_id| Destination {
                chat_id,
                category: ChatCategory::Group,
                title: format!("chat {chat_id}"),
                username: None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn run_is_recorded_exactly_once_with_the_tally() {
        let client = OneDeniedClient { denied: -2 };
        let recorder = CountingRecorder {
            records: Mutex::new(Vec::new()),
        };
        let targets = targets(&[-1, -2, -3]);
        let payload = Payload {
            source_chat: 50,
            message_id: 9,
            kind: PayloadKind::Text,
            snippet: Some("hello".into()),
        };

        let report =
            execute_broadcast(&client, &recorder, 100, &targets, &payload, SendMode::Copy).await;

        assert_eq!(
            report,
            DispatchReport {
                total: 3,
                success: 2,
                failed: 1
            }
        );

        let records = recorder.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].admin_id, 100);
        assert_eq!(records[0].total, 3);
        assert_eq!(records[0].success, 2);
        assert_eq!(records[0].failed, 1);
        assert_eq!(records[0].mode, SendMode::Copy);
        assert_eq!(records[0].message_type, "text");
        assert_eq!(records[0].message_text.as_deref(), Some("hello"));
    }

    #[test]
    fn pin_format_is_exactly_four_digits() {
        assert!(is_valid_pin("0000"));
        assert!(is_valid_pin("1234"));
        assert!(!is_valid_pin("123"));
        assert!(!is_valid_pin("12345"));
        assert!(!is_valid_pin("12a4"));
        assert!(!is_valid_pin(" 1234"));
        assert!(!is_valid_pin(""));
    }
}
