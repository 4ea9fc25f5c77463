//! Key/value bot settings, upserted from the back-office.

use crate::{
    entities::{BotSetting, bot_setting},
    errors::Result,
};
use sea_orm::{Set, prelude::*};

/// Setting key holding the DMCA / policy text shown by the bot.
pub const DMCA_POLICY_KEY: &str = "dmca_policy_text";

/// Looks up a setting value by key.
pub async fn get(db: &DatabaseConnection, key: &str) -> Result<Option<String>> {
    Ok(BotSetting::find()
        .filter(bot_setting::Column::Key.eq(key))
        .one(db)
        .await?
        .and_then(|setting| setting.value))
}

/// Creates or updates a setting.
pub async fn set(db: &DatabaseConnection, key: &str, value: &str) -> Result<bot_setting::Model> {
    let existing = BotSetting::find()
        .filter(bot_setting::Column::Key.eq(key))
        .one(db)
        .await?;

    match existing {
        Some(setting) => {
            let mut active: bot_setting::ActiveModel = setting.into();
            active.value = Set(Some(value.to_string()));
            active.update(db).await.map_err(Into::into)
        }
        None => bot_setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(Some(value.to_string())),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(Into::into),
    }
}
