//! Configuration management for database and application settings.

/// Database connection and table creation
pub mod database;

use crate::entities::PaymentMethod;
use crate::errors::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Globally configured payment options. A method is offered to buyers only
/// when its detail is configured (UPI id, crypto address, PayPal email) or
/// its flag is enabled (COD, gift cards). Course-level allow-lists override
/// this set.
#[derive(Debug, Clone, Default)]
pub struct PaymentConfig {
    pub upi_id: Option<String>,
    pub crypto_address: Option<String>,
    pub paypal_email: Option<String>,
    pub cod_available: bool,
    pub gift_card_available: bool,
}

impl PaymentConfig {
    /// Methods enabled by the global configuration, in the fixed fallback
    /// order: UPI, crypto, PayPal, COD, gift.
    #[must_use]
    pub fn enabled_methods(&self) -> Vec<PaymentMethod> {
        let mut methods = Vec::new();
        if self.upi_id.is_some() {
            methods.push(PaymentMethod::Upi);
        }
        if self.crypto_address.is_some() {
            methods.push(PaymentMethod::Crypto);
        }
        if self.paypal_email.is_some() {
            methods.push(PaymentMethod::Paypal);
        }
        if self.cod_available {
            methods.push(PaymentMethod::Cod);
        }
        if self.gift_card_available {
            methods.push(PaymentMethod::Gift);
        }
        methods
    }

    /// Payment instructions shown after the buyer picks a method.
    #[must_use]
    pub fn instructions_for(&self, method: PaymentMethod) -> String {
        match method {
            PaymentMethod::Upi => {
                format!("UPI ID: {}", self.upi_id.as_deref().unwrap_or("not configured"))
            }
            PaymentMethod::Crypto => format!(
                "Crypto Address: {}",
                self.crypto_address.as_deref().unwrap_or("not configured")
            ),
            PaymentMethod::Paypal => format!(
                "PayPal: {}",
                self.paypal_email.as_deref().unwrap_or("not configured")
            ),
            PaymentMethod::Cod => "Cash on Delivery: Please provide your address.".to_string(),
            PaymentMethod::Gift => "Please enter your gift card code.".to_string(),
        }
    }
}

/// Application configuration, loaded once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Greeting shown on `/start`
    pub welcome_message: String,
    /// Optional global password gate; None disables the gate
    pub bot_password: Option<String>,
    /// When set, non-gift payments are approved at submission time
    pub auto_approve: bool,
    /// Delay before ephemeral replies are deleted; zero disables the cleanup
    pub auto_delete: Duration,
    /// Directory payment-proof images are saved under
    pub upload_dir: PathBuf,
    /// Chat ids allowed to run the approval commands
    pub admin_chat_ids: Vec<i64>,
    /// Whether deliverable links go through the URL shortener
    pub shorten_links: bool,
    pub payments: PaymentConfig,
    /// Idle checkout sessions are dropped after this long
    pub session_ttl: Duration,
    /// Upper bound on concurrently tracked sessions
    pub session_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            welcome_message: "Welcome to the Course Delivery Bot! Browse our courses and \
                              purchase them securely."
                .to_string(),
            bot_password: None,
            auto_approve: false,
            auto_delete: Duration::from_secs(300),
            upload_dir: PathBuf::from("uploads"),
            admin_chat_ids: Vec::new(),
            shorten_links: true,
            payments: PaymentConfig::default(),
            session_ttl: Duration::from_secs(3600),
            session_capacity: 10_000,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    env_opt(key).is_some_and(|v| v.to_lowercase() == "true")
}

impl AppConfig {
    /// Loads the configuration from environment variables, falling back to
    /// the defaults above for anything unset.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when a numeric variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let auto_delete_secs = match env_opt("AUTO_DELETE_SECONDS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| Error::Config {
                message: format!("AUTO_DELETE_SECONDS is not a number: {raw}"),
            })?,
            None => defaults.auto_delete.as_secs(),
        };

        let session_ttl_secs = match env_opt("SESSION_TTL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| Error::Config {
                message: format!("SESSION_TTL_SECS is not a number: {raw}"),
            })?,
            None => defaults.session_ttl.as_secs(),
        };

        let session_capacity = match env_opt("SESSION_CAPACITY") {
            Some(raw) => raw.parse::<usize>().map_err(|_| Error::Config {
                message: format!("SESSION_CAPACITY is not a number: {raw}"),
            })?,
            None => defaults.session_capacity,
        };

        let admin_chat_ids = env_opt("ADMIN_CHAT_IDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| {
                        part.parse::<i64>().map_err(|_| Error::Config {
                            message: format!("ADMIN_CHAT_IDS entry is not a chat id: {part}"),
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            welcome_message: env_opt("WELCOME_MESSAGE").unwrap_or(defaults.welcome_message),
            bot_password: env_opt("BOT_PASSWORD"),
            auto_approve: env_flag("AUTO_APPROVE"),
            auto_delete: Duration::from_secs(auto_delete_secs),
            upload_dir: env_opt("UPLOAD_DIR").map_or(defaults.upload_dir, PathBuf::from),
            admin_chat_ids,
            shorten_links: env_opt("SHORTEN_LINKS").is_none_or(|v| v.to_lowercase() != "false"),
            payments: PaymentConfig {
                upi_id: env_opt("UPI_ID"),
                crypto_address: env_opt("CRYPTO_ADDRESS"),
                paypal_email: env_opt("PAYPAL_EMAIL"),
                cod_available: env_flag("COD_AVAILABLE"),
                gift_card_available: env_flag("GIFT_CARD_AVAILABLE"),
            },
            session_ttl: Duration::from_secs(session_ttl_secs),
            session_capacity,
        })
    }

    /// Whether the given chat id may run admin commands.
    #[must_use]
    pub fn is_admin(&self, chat_id: i64) -> bool {
        self.admin_chat_ids.contains(&chat_id)
    }
}
