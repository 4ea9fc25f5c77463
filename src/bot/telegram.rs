//! Telegram implementation of the [`Channel`] trait.
//!
//! Converts the engine's transport-neutral keyboards and image sources into
//! teloxide types and handles file downloads for payment proofs.

use crate::{
    checkout::{
        channel::{Button, ButtonAction, Channel, ImageSource, Keyboard, MessageHandle},
        event::{ImageRef, MenuButton},
    },
    errors::Result,
};
use std::time::Duration;
use teloxide::{
    net::Download,
    prelude::*,
    types::{
        ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton,
        KeyboardMarkup, MessageId, ReplyMarkup,
    },
};

pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn inline_markup(rows: Vec<Vec<Button>>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.into_iter().map(|row| {
        row.into_iter()
            .filter_map(|button| match button.action {
                ButtonAction::Callback(action) => {
                    Some(InlineKeyboardButton::callback(button.label, action.encode()))
                }
                ButtonAction::Link(link) => match url::Url::parse(&link) {
                    Ok(parsed) => Some(InlineKeyboardButton::url(button.label, parsed)),
                    Err(error) => {
                        tracing::warn!(%error, link, "dropping button with unparseable link");
                        None
                    }
                },
            })
            .collect::<Vec<_>>()
    }))
}

fn main_menu_markup() -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = MenuButton::ALL
        .chunks(2)
        .map(|pair| pair.iter().map(|button| KeyboardButton::new(button.label())).collect())
        .collect();
    KeyboardMarkup::new(rows).resize_keyboard()
}

fn cancel_markup() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(MenuButton::Cancel.label())]])
        .resize_keyboard()
}

fn reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(rows) => ReplyMarkup::InlineKeyboard(inline_markup(rows)),
        Keyboard::MainMenu => ReplyMarkup::Keyboard(main_menu_markup()),
        Keyboard::RequestCancel => ReplyMarkup::Keyboard(cancel_markup()),
    }
}

fn input_file(image: &ImageSource) -> Result<InputFile> {
    match image {
        ImageSource::Url(link) => {
            let parsed = url::Url::parse(link).map_err(|error| crate::errors::Error::Validation {
                message: format!("Bad image link '{link}': {error}"),
            })?;
            Ok(InputFile::url(parsed))
        }
        ImageSource::File(path) => Ok(InputFile::file(path.clone())),
    }
}

#[async_trait::async_trait]
impl Channel for TelegramChannel {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageHandle> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        let message = match keyboard {
            Some(keyboard) => request.reply_markup(reply_markup(keyboard)).await?,
            None => request.await?,
        };
        Ok(MessageHandle(i64::from(message.id.0)))
    }

    async fn send_image(
        &self,
        chat_id: i64,
        image: &ImageSource,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageHandle> {
        let request = self
            .bot
            .send_photo(ChatId(chat_id), input_file(image)?)
            .caption(caption);
        let message = match keyboard {
            Some(keyboard) => request.reply_markup(reply_markup(keyboard)).await?,
            None => request.await?,
        };
        Ok(MessageHandle(i64::from(message.id.0)))
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message: MessageHandle,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        let request =
            self.bot
                .edit_message_text(ChatId(chat_id), MessageId(message.0 as i32), text);
        match keyboard {
            Some(Keyboard::Inline(rows)) => {
                request.reply_markup(inline_markup(rows)).await?;
            }
            Some(Keyboard::MainMenu | Keyboard::RequestCancel) => {
                // Telegram only allows inline markups on edits
                tracing::debug!(chat_id, "dropping reply keyboard on message edit");
                request.await?;
            }
            None => {
                request.await?;
            }
        }
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message: MessageHandle) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message.0 as i32))
            .await?;
        Ok(())
    }

    async fn download_image(&self, image: &ImageRef) -> Result<Vec<u8>> {
        let file = self.bot.get_file(image.0.clone()).await?;
        let mut bytes = Vec::new();
        self.bot
            .download_file(&file.path, &mut std::io::Cursor::new(&mut bytes))
            .await?;
        Ok(bytes)
    }

    async fn schedule_delete(&self, chat_id: i64, message: MessageHandle, after: Duration) {
        let bot = self.bot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Err(error) = bot
                .delete_message(ChatId(chat_id), MessageId(message.0 as i32))
                .await
            {
                // The buyer may have cleared the chat already
                tracing::debug!(%error, chat_id, "scheduled cleanup delete failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::event::CallbackAction;

    #[test]
    fn test_inline_markup_carries_wire_data() {
        let markup = inline_markup(vec![vec![
            Button::callback("Buy", CallbackAction::Buy(7)),
            Button::link("Demo", "https://example.com/demo"),
        ]]);

        let row = &markup.inline_keyboard[0];
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].text, "Buy");
        assert_eq!(row[1].text, "Demo");
    }

    #[test]
    fn test_bad_link_buttons_are_dropped() {
        let markup = inline_markup(vec![vec![Button::link("Demo", "not a url")]]);
        assert!(markup.inline_keyboard[0].is_empty());
    }

    #[test]
    fn test_main_menu_has_all_buttons() {
        let markup = main_menu_markup();
        let labels: Vec<&str> = markup
            .keyboard
            .iter()
            .flatten()
            .map(|button| button.text.as_str())
            .collect();
        assert_eq!(labels.len(), MenuButton::ALL.len());
        assert!(labels.contains(&MenuButton::Courses.label()));
    }
}
