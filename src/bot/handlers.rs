//! Update handlers: decode raw Telegram updates into engine events.
//!
//! Everything string-shaped is resolved here. The engine only ever sees a
//! typed [`Event`]; malformed callback data and non-text payloads never make
//! it past this module.

use crate::{
    bot::{App, admin},
    checkout::{
        channel::MessageHandle,
        event::{CallbackAction, Command, Event, ImageRef, MenuButton},
    },
    core::user::ChatProfile,
    errors::Result,
};
use std::sync::Arc;
use teloxide::{prelude::*, types::User};

fn profile_for(chat_id: i64, from: &User) -> ChatProfile {
    ChatProfile {
        telegram_id: chat_id.to_string(),
        username: from.username.clone(),
        first_name: Some(from.first_name.clone()),
        last_name: from.last_name.clone(),
    }
}

/// Handles a plain message: admin commands first, then the buyer flow.
pub async fn handle_message(bot: Bot, msg: Message, app: Arc<App>) -> Result<()> {
    let chat_id = msg.chat.id.0;
    // Channel posts and service messages carry no sender; ignore them
    let Some(from) = &msg.from else {
        return Ok(());
    };
    let profile = profile_for(chat_id, from);

    if admin::try_handle(&msg, &app).await? {
        return Ok(());
    }

    let event = if let Some(text) = msg.text() {
        if let Some(command) = Command::parse(text) {
            Event::Command(command)
        } else if let Some(button) = MenuButton::parse(text) {
            Event::MenuButton(button)
        } else {
            Event::Text(text.to_string())
        }
    } else if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        Event::Photo(ImageRef(photo.file.id.clone()))
    } else {
        // Stickers, voice notes and the like
        return Ok(());
    };

    dispatch(&bot, &app, chat_id, &profile, event).await
}

/// Handles an inline button press. Undecodable data is acknowledged and
/// dropped; it usually means the button predates a deploy.
pub async fn handle_callback(bot: Bot, query: CallbackQuery, app: Arc<App>) -> Result<()> {
    bot.answer_callback_query(query.id.clone()).await?;

    let Some(message) = query.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id.0;
    let source = MessageHandle(i64::from(message.id().0));
    let Some(action) = query.data.as_deref().and_then(CallbackAction::decode) else {
        tracing::debug!(data = ?query.data, "ignoring undecodable callback data");
        return Ok(());
    };

    let profile = profile_for(chat_id, &query.from);
    dispatch(&bot, &app, chat_id, &profile, Event::Callback(action, Some(source))).await
}

async fn dispatch(
    bot: &Bot,
    app: &App,
    chat_id: i64,
    profile: &ChatProfile,
    event: Event,
) -> Result<()> {
    if let Err(error) = app.engine.handle(chat_id, profile, event).await {
        tracing::error!(%error, chat_id, "checkout engine failed");
        // Best effort; the original failure is what matters in the logs
        let _ = bot
            .send_message(
                teloxide::types::ChatId(chat_id),
                "Something went wrong on our side. Please try again.",
            )
            .await;
    }
    Ok(())
}
