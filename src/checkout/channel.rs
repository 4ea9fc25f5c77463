//! The outbound chat abstraction the engine talks through.
//!
//! Keeping this behind a trait lets the state machine run against an
//! in-memory fake in tests while production wires it to Telegram.

use crate::checkout::event::{CallbackAction, ImageRef};
use crate::errors::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Opaque handle to a sent message, used for later edits or deletion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MessageHandle(pub i64);

/// What pressing an inline button does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(CallbackAction),
    Link(String),
}

/// One inline button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    #[must_use]
    pub fn callback(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(action),
        }
    }

    #[must_use]
    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Link(url.into()),
        }
    }
}

/// Keyboard attached to an outgoing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Keyboard {
    /// Inline buttons under the message, one Vec per row
    Inline(Vec<Vec<Button>>),
    /// The persistent main-menu reply keyboard
    MainMenu,
    /// A reply keyboard with only the cancel button, shown while the flow
    /// waits for free-text or photo input
    RequestCancel,
}

/// Where an outgoing image comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    File(PathBuf),
}

/// Transport-side operations the checkout engine needs.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageHandle>;

    async fn send_image(
        &self,
        chat_id: i64,
        image: &ImageSource,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageHandle>;

    /// Rewrites an already-sent message in place. Only inline keyboards can
    /// be attached to an edit; reply keyboards are ignored by adapters.
    async fn edit_text(
        &self,
        chat_id: i64,
        message: MessageHandle,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()>;

    async fn delete_message(&self, chat_id: i64, message: MessageHandle) -> Result<()>;

    /// Fetches the bytes behind an incoming image reference.
    async fn download_image(&self, image: &ImageRef) -> Result<Vec<u8>>;

    /// Arranges for the message to be deleted after the delay. Fire and
    /// forget; a failed cleanup is logged, never surfaced to the buyer.
    async fn schedule_delete(&self, chat_id: i64, message: MessageHandle, after: Duration);
}
