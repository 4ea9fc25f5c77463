//! Telegram front end: the dispatcher, update handlers, admin commands, and
//! the [`TelegramChannel`] transport adapter.

pub mod admin;
pub mod handlers;
pub mod telegram;

use crate::{checkout::Engine, config::AppConfig};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use teloxide::{dptree, prelude::*};
use telegram::TelegramChannel;

/// Everything the update handlers need, injected through dptree.
pub struct App {
    pub engine: Engine<TelegramChannel>,
}

/// Builds the dispatcher and runs it until Ctrl-C.
pub async fn run_bot(bot: Bot, db: DatabaseConnection, config: AppConfig) {
    let app = Arc::new(App {
        engine: Engine::new(db, config, TelegramChannel::new(bot.clone())),
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback));

    tracing::info!("starting bot dispatcher");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .default_handler(|update: Arc<Update>| async move {
            tracing::debug!(?update, "unhandled update");
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
