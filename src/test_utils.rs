//! Shared helpers for unit tests: an in-memory database, fixture builders,
//! and a recording [`Channel`] implementation.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use crate::{
    checkout::{
        channel::{Channel, ImageSource, Keyboard, MessageHandle},
        event::ImageRef,
    },
    config::AppConfig,
    core::user::ChatProfile,
    entities::{category, course, payment},
    errors::Result,
};
use sea_orm::{Database, DatabaseConnection};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Fresh in-memory database with all tables created.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Chat profile for the given telegram id.
#[must_use]
pub fn test_profile(telegram_id: &str) -> ChatProfile {
    ChatProfile {
        telegram_id: telegram_id.to_string(),
        username: Some(format!("user_{telegram_id}")),
        first_name: Some("Test".to_string()),
        last_name: None,
    }
}

/// Engine configuration for tests: UPI and gift cards enabled, one admin
/// chat, no link shortening or delayed deletes, uploads under the temp dir.
#[must_use]
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.payments.upi_id = Some("store@upi".to_string());
    config.payments.gift_card_available = true;
    config.admin_chat_ids = vec![999];
    config.shorten_links = false;
    config.auto_delete = Duration::ZERO;
    config.upload_dir = std::env::temp_dir().join("coursebot-test-uploads");
    config
}

pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<category::Model> {
    crate::core::category::create(db, name).await
}

/// Creates an active paid course (or a free one when `price` is zero) with a
/// file link derived from the title.
pub async fn create_test_course(
    db: &DatabaseConnection,
    title: &str,
    price: f64,
    category_id: Option<i32>,
) -> Result<course::Model> {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    crate::core::course::create(
        db,
        crate::core::course::CourseDraft {
            title: title.to_string(),
            price,
            is_free: price == 0.0,
            file_link: format!("https://example.com/{slug}"),
            category_id,
            ..Default::default()
        },
    )
    .await
}

/// Creates a pending proof payment with a unique fingerprint.
pub async fn create_test_payment(
    db: &DatabaseConnection,
    user_id: i32,
    course_id: i32,
    amount: f64,
) -> Result<payment::Model> {
    let nonce: u64 = rand::random();
    crate::core::payment::submit_proof(
        db,
        user_id,
        course_id,
        crate::entities::PaymentMethod::Upi,
        amount,
        &format!("proof-{nonce}.png"),
        &format!("hash-{nonce}"),
    )
    .await
}

/// A valid 1x1 PNG, used wherever tests need real image bytes.
#[must_use]
pub fn tiny_png() -> Vec<u8> {
    let pixel = image::RgbImage::from_pixel(1, 1, image::Rgb([120, 30, 200]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(pixel)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("png encoding cannot fail");
    bytes
}

/// Everything a [`MockChannel`] has been asked to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    Text {
        chat_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Image {
        chat_id: i64,
        image: ImageSource,
        caption: String,
        keyboard: Option<Keyboard>,
    },
    Edited {
        chat_id: i64,
        message: MessageHandle,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Deleted {
        chat_id: i64,
        message: MessageHandle,
    },
    ScheduledDelete {
        chat_id: i64,
        message: MessageHandle,
        after: Duration,
    },
}

/// In-memory [`Channel`] that records every outbound call and serves a fixed
/// image for downloads.
pub struct MockChannel {
    outgoing: Mutex<Vec<Outgoing>>,
    next_handle: AtomicI64,
    download_bytes: Vec<u8>,
    fail_images: bool,
}

impl MockChannel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            outgoing: Mutex::new(Vec::new()),
            next_handle: AtomicI64::new(1),
            download_bytes: tiny_png(),
            fail_images: false,
        }
    }

    /// Replaces the bytes served for downloads.
    #[must_use]
    pub fn with_download(mut self, bytes: Vec<u8>) -> Self {
        self.download_bytes = bytes;
        self
    }

    /// Makes every `send_image` call fail, for fallback-path tests.
    #[must_use]
    pub fn with_failing_images(mut self) -> Self {
        self.fail_images = true;
        self
    }

    pub async fn sent(&self) -> Vec<Outgoing> {
        self.outgoing.lock().await.clone()
    }

    /// Text of the most recent message (or image caption).
    pub async fn last_text(&self) -> String {
        self.outgoing
            .lock()
            .await
            .iter()
            .rev()
            .find_map(|outgoing| match outgoing {
                Outgoing::Text { text, .. } => Some(text.clone()),
                Outgoing::Image { caption, .. } => Some(caption.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn handle(&self) -> MessageHandle {
        MessageHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Channel for MockChannel {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageHandle> {
        self.outgoing.lock().await.push(Outgoing::Text {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
        Ok(self.handle())
    }

    async fn send_image(
        &self,
        chat_id: i64,
        image: &ImageSource,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageHandle> {
        if self.fail_images {
            return Err(crate::errors::Error::Validation {
                message: "image sends are disabled in this test".to_string(),
            });
        }
        self.outgoing.lock().await.push(Outgoing::Image {
            chat_id,
            image: image.clone(),
            caption: caption.to_string(),
            keyboard,
        });
        Ok(self.handle())
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message: MessageHandle,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        self.outgoing.lock().await.push(Outgoing::Edited {
            chat_id,
            message,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message: MessageHandle) -> Result<()> {
        self.outgoing
            .lock()
            .await
            .push(Outgoing::Deleted { chat_id, message });
        Ok(())
    }

    async fn download_image(&self, _image: &ImageRef) -> Result<Vec<u8>> {
        Ok(self.download_bytes.clone())
    }

    async fn schedule_delete(&self, chat_id: i64, message: MessageHandle, after: Duration) {
        self.outgoing.lock().await.push(Outgoing::ScheduledDelete {
            chat_id,
            message,
            after,
        });
    }
}
