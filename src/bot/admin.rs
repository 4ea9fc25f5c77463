//! In-chat admin commands for the payment review queue.
//!
//! Only chats listed in `ADMIN_CHAT_IDS` may use these. Approval and
//! rejection delegate to the engine so the buyer is notified and the course
//! delivered through the same path the auto-approve flow uses.

use crate::{
    bot::App,
    checkout::Channel,
    core,
    errors::{Error, Result},
};
use teloxide::{prelude::*, utils::command::BotCommands};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum AdminCommand {
    #[command(description = "list payments awaiting review")]
    Pending,
    #[command(description = "approve a payment by id")]
    Approve(i32),
    #[command(description = "reject a payment by id")]
    Reject(i32),
}

/// Runs the message as an admin command when the sender is an admin chat and
/// the text parses as one. Returns true when the message was consumed.
pub async fn try_handle(msg: &Message, app: &App) -> Result<bool> {
    let chat_id = msg.chat.id.0;
    if !app.engine.config().is_admin(chat_id) {
        return Ok(false);
    }
    let Some(text) = msg.text() else {
        return Ok(false);
    };
    let Ok(command) = AdminCommand::parse(text, "") else {
        return Ok(false);
    };

    match command {
        AdminCommand::Pending => send_pending_queue(app, chat_id).await?,
        AdminCommand::Approve(payment_id) => {
            match app.engine.approve_payment(payment_id).await {
                Ok(payment) => {
                    reply(app, chat_id, &format!("Payment #{payment_id} is now {:?}.", payment.status))
                        .await?;
                }
                Err(Error::PaymentNotFound { id }) => {
                    reply(app, chat_id, &format!("No payment #{id} exists.")).await?;
                }
                Err(error) => return Err(error),
            }
        }
        AdminCommand::Reject(payment_id) => match app.engine.reject_payment(payment_id).await {
            Ok(payment) => {
                reply(app, chat_id, &format!("Payment #{payment_id} is now {:?}.", payment.status))
                    .await?;
            }
            Err(Error::PaymentNotFound { id }) => {
                reply(app, chat_id, &format!("No payment #{id} exists.")).await?;
            }
            Err(error) => return Err(error),
        },
    }
    Ok(true)
}

async fn send_pending_queue(app: &App, chat_id: i64) -> Result<()> {
    let pending = core::payment::list_pending(app.engine.db()).await?;
    if pending.is_empty() {
        return reply(app, chat_id, "No payments are waiting for review.").await;
    }

    let mut text = format!("🧾 {} payment(s) awaiting review:\n", pending.len());
    for payment in &pending {
        let title = core::course::get_by_id(app.engine.db(), payment.course_id)
            .await?
            .map_or_else(|| "(deleted course)".to_string(), |course| course.title);
        text.push_str(&format!(
            "\n#{} — {} — ₹{:.2} via {}\n  /approve {}  /reject {}\n",
            payment.id,
            title,
            payment.amount,
            payment.payment_method.label(),
            payment.id,
            payment.id,
        ));
    }
    reply(app, chat_id, &text).await
}

async fn reply(app: &App, chat_id: i64, text: &str) -> Result<()> {
    app.engine.channel().send_text(chat_id, text, None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_command_parsing() {
        #![allow(clippy::unwrap_used)]
        assert_eq!(AdminCommand::parse("/pending", "").unwrap(), AdminCommand::Pending);
        assert_eq!(AdminCommand::parse("/approve 12", "").unwrap(), AdminCommand::Approve(12));
        assert_eq!(AdminCommand::parse("/reject 12", "").unwrap(), AdminCommand::Reject(12));
        assert!(AdminCommand::parse("/approve twelve", "").is_err());
        assert!(AdminCommand::parse("/courses", "").is_err());
    }
}
