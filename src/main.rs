//! Binary entry point: load configuration, prepare the database, start the
//! Telegram dispatcher.

use coursebot::{
    bot,
    config::{self, AppConfig},
    errors::{Error, Result},
};
use dotenvy::dotenv;
use std::env;
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Non-fatal; env vars can be set externally
    dotenv().ok();

    let app_config = AppConfig::from_env()?;
    info!("loaded application configuration");

    let db = config::database::create_connection().await?;
    config::database::create_tables(&db).await?;
    info!("database ready");

    // The token is read directly before use, never stored in AppConfig
    let token = env::var("BOT_TOKEN").map_err(Error::EnvVar)?;
    bot::run_bot(Bot::new(token), db, app_config).await;

    Ok(())
}
