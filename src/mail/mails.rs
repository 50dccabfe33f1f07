use sqlx::types::BigDecimal;

use super::sendmail::{send_email, MailError};
use crate::{config::Config, utils::money::to_money};

const RESET_PASSWORD_TEMPLATE: &str = include_str!("templates/ResetPassword-email.html");
const BID_ACCEPTED_TEMPLATE: &str = include_str!("templates/BidAccepted-email.html");

pub const RESET_TOKEN_MINUTES: i64 = 30;

pub fn reset_password_link(app_url: &str, token: &str) -> String {
    format!(
        "{}/auth/reset-password?token={}",
        app_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

pub async fn send_forgot_password_email(
    config: &Config,
    to_email: &str,
    full_name: &str,
    token: &str,
) -> Result<(), MailError> {
    let placeholders = vec![
        ("{{full_name}}".to_string(), full_name.to_string()),
        ("{{reset_link}}".to_string(), reset_password_link(&config.app_url, token)),
        ("{{expires_in}}".to_string(), RESET_TOKEN_MINUTES.to_string()),
    ];

    send_email(config, to_email, "Reset your password", RESET_PASSWORD_TEMPLATE, &placeholders).await
}

pub async fn send_bid_accepted_email(
    config: &Config,
    to_email: &str,
    full_name: &str,
    amount: &BigDecimal,
    origin: &str,
    destination: &str,
    chat_id: &str,
) -> Result<(), MailError> {
    let placeholders = vec![
        ("{{full_name}}".to_string(), full_name.to_string()),
        ("{{amount}}".to_string(), to_money(amount).to_string()),
        ("{{origin}}".to_string(), origin.to_string()),
        ("{{destination}}".to_string(), destination.to_string()),
        ("{{chat_link}}".to_string(), format!("{}/dashboard/chat/{}", config.app_url, chat_id)),
    ];

    send_email(config, to_email, "Your bid was accepted", BID_ACCEPTED_TEMPLATE, &placeholders).await
}
