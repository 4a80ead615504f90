use std::sync::Arc;

use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::prelude::*;

use crate::broadcast::capture::RejectionCooldown;
use crate::broadcast::state::BroadcastState;
use crate::commands::{AdminCommand, Command};
use crate::database::DatabasePool;

mod broadcast;
mod commands;
mod config;
mod database;
mod handlers;
mod keyboards;

fn init_logging() {
    use log::LevelFilter;
    use std::io::Write;

    let console_level = match std::env::var("CONSOLE_LOG_LEVEL")
        .unwrap_or_else(|_| "INFO".to_string())
        .to_uppercase()
        .as_str()
    {
        "ERROR" => LevelFilter::Error,
        "WARN" => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        _ => LevelFilter::Info,
    };

    pretty_env_logger::formatted_builder()
        .filter(None, console_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_logging();
    log::info!("Starting broadcast bot...");

    if let Err(e) = config::load_environment() {
        log::error!("Failed to load environment: {}", e);
        return Err(e);
    }

    let db_path = database::get_database_path();
    if let Err(e) = database::init_database(&db_path) {
        log::error!("Failed to initialize the database: {}", e);
        return Err(e);
    }
    log::info!("Database initialized at {:?}", db_path);

    // Maximum 3 simultaneous database connections.
    let db_pool = Arc::new(DatabasePool::new(db_path, 3));

    if let Some(super_admin) = config::super_admin_id() {
        db_pool.ensure_admin(super_admin).await?;
        db_pool.add_super_admin(super_admin).await?;
        log::info!(
            "Super admin {} is seeded; the broadcast PIN is available via /my_pin",
            super_admin
        );
    }

    let cooldown = Arc::new(RejectionCooldown::default());
    let bot = Bot::from_env();

    let handler = dialogue::enter::<Update, InMemStorage<BroadcastState>, BroadcastState, _>()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::case![BroadcastState::AwaitingPayload {
                        targets,
                        target_label
                    }]
                    .endpoint(handlers::receive_payload),
                )
                .branch(
                    dptree::case![BroadcastState::AwaitingPin { targets, payload }]
                        .endpoint(handlers::receive_pin),
                )
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handlers::command_handler),
                )
                .branch(
                    dptree::entry()
                        .filter_command::<AdminCommand>()
                        .endpoint(handlers::admin_command_handler),
                )
                .endpoint(handlers::menu_text_handler),
        )
        .branch(
            Update::filter_callback_query()
                .branch(
                    dptree::case![BroadcastState::SelectingChats {
                        available,
                        selected
                    }]
                    .endpoint(handlers::selection_callback),
                )
                .branch(
                    dptree::case![BroadcastState::ChoosingSendMode { targets, payload }]
                        .endpoint(handlers::send_mode_callback),
                )
                .endpoint(handlers::stale_callback),
        )
        .branch(Update::filter_my_chat_member().endpoint(handlers::chat_member_handler));

    log::info!("Starting to dispatch updates...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![
            InMemStorage::<BroadcastState>::new(),
            db_pool,
            cooldown
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Bot shutdown complete");
    Ok(())
}
