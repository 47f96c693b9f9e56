use std::{fs, path::Path};

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use super::{MailSettings, MailTransport, OutgoingEmail, CHART_CONTENT_ID};
use crate::artifacts::PDF_FILE_NAME;

/// SMTP relay transport (TLS, authenticated with the sender credentials).
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpMailTransport;

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, settings: &MailSettings, email: &OutgoingEmail) -> Result<()> {
        let message = build_message(settings, email)?;
        let credentials = Credentials::new(settings.sender.clone(), settings.password.clone());
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .with_context(|| format!("failed to create SMTP transport for {}", settings.smtp_host))?
            .credentials(credentials);
        if let Some(port) = settings.smtp_port {
            builder = builder.port(port);
        }
        let mailer = builder.build();
        debug!(host = %settings.smtp_host, recipient = %email.recipient, "submitting report email");
        mailer
            .send(message)
            .await
            .context("SMTP server rejected the message")?;
        Ok(())
    }
}

/// Assemble the MIME message: HTML body with the chart inline, PDF as attachment.
pub fn build_message(settings: &MailSettings, email: &OutgoingEmail) -> Result<Message> {
    let from: Mailbox = settings
        .sender
        .parse()
        .with_context(|| format!("invalid sender address `{}`", settings.sender))?;
    let to: Mailbox = email
        .recipient
        .parse()
        .with_context(|| format!("invalid recipient address `{}`", email.recipient))?;

    let html = SinglePart::html(email.html.clone());
    let body = match &email.inline_image {
        Some(image) => {
            let bytes = read_artifact(&image.path)?;
            let content_type = ContentType::parse(image.content_type)
                .with_context(|| format!("invalid chart content type `{}`", image.content_type))?;
            MultiPart::related().singlepart(html).singlepart(
                Attachment::new_inline(CHART_CONTENT_ID.to_string()).body(bytes, content_type),
            )
        }
        None => MultiPart::related().singlepart(html),
    };

    let mut mixed = MultiPart::mixed().multipart(body);
    if let Some(path) = &email.attachment {
        let bytes = read_artifact(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(PDF_FILE_NAME)
            .to_string();
        let content_type =
            ContentType::parse("application/pdf").context("invalid PDF content type")?;
        mixed = mixed.singlepart(Attachment::new(file_name).body(bytes, content_type));
    }

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .multipart(mixed)
        .context("failed to build email")
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read artifact {}", path.display()))
}
