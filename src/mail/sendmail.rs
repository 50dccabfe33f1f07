use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use crate::config::Config;

pub type MailError = Box<dyn std::error::Error + Send + Sync>;

pub fn render_template(template: &str, placeholders: &[(String, String)]) -> String {
    let mut html = template.to_string();
    for (key, value) in placeholders {
        html = html.replace(key, value);
    }
    html
}

pub async fn send_email(
    config: &Config,
    to_email: &str,
    subject: &str,
    template: &str,
    placeholders: &[(String, String)],
) -> Result<(), MailError> {
    if !to_email.contains('@') {
        return Err(format!("Invalid email address: {}", to_email).into());
    }

    let html_body = render_template(template, placeholders);

    let Some(smtp_host) = config.smtp_host.clone() else {
        tracing::info!(
            "SMTP_HOST not set, mail to {} not sent. Subject: {}\n{}",
            to_email,
            subject,
            html_body
        );
        return Ok(());
    };

    let email = Message::builder()
        .from(config.smtp_from.parse()?)
        .to(to_email.parse()?)
        .subject(subject)
        .multipart(
            MultiPart::alternative().singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(html_body),
            ),
        )?;

    let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
    let mailer = SmtpTransport::relay(&smtp_host)?.credentials(creds).build();

    // SmtpTransport blocks
    let recipient = to_email.to_string();
    tokio::task::spawn_blocking(move || mailer.send(&email))
        .await?
        .map_err(|e| {
            tracing::error!("SMTP send to {} failed: {}", recipient, e);
            e
        })?;

    tracing::info!("email sent to {}", to_email);
    Ok(())
}
