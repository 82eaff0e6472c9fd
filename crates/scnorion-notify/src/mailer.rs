//! SMTP dispatch via `lettre` (async, rustls transport), replacing the
//! source system's `go-mail` client
//! (`original_source/internal/common/notifications/notifications.go`).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use handlebars::Handlebars;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use scnorion_core::{Notification, SmtpAuthMode, SmtpSettings};

use crate::error::{NotifyError, NotifyResult};
use crate::template;

/// Turns a [`Notification`] envelope into a ready-to-send MIME message,
/// matching `notifications.PrepareMessage`: HTML body from the shared
/// template, plus up to two base64-encoded attachments under their
/// client-supplied filenames.
pub fn prepare_message(
    hb: &Handlebars<'static>,
    notification: &Notification,
    settings: &SmtpSettings,
    default_sender: &str,
) -> NotifyResult<Message> {
    let from = if notification.from.is_empty() {
        default_sender
    } else {
        &notification.from
    };

    let html_body = template::render(hb, notification)?;
    let mut multipart = MultiPart::mixed().singlepart(SinglePart::html(html_body));

    if !notification.message_attach_file_name.is_empty() {
        multipart = multipart.singlepart(attachment(
            &notification.message_attach_file_name,
            &notification.message_attach_file,
        )?);
    }
    if !notification.message_attach_file_name_2.is_empty() {
        multipart = multipart.singlepart(attachment(
            &notification.message_attach_file_name_2,
            &notification.message_attach_file_2,
        )?);
    }

    let message = Message::builder()
        .from(from.parse::<Mailbox>()?)
        .to(notification.to.parse::<Mailbox>()?)
        .subject(notification.subject.clone())
        .multipart(multipart)?;

    Ok(message)
}

fn attachment(filename: &str, base64_content: &str) -> NotifyResult<SinglePart> {
    let bytes = BASE64.decode(base64_content)?;
    let content_type = ContentType::parse("application/octet-stream").expect("valid literal mime type");
    Ok(Attachment::new(filename.to_owned()).body(bytes, content_type))
}

/// Builds the SMTP transport for one send, per
/// `notifications.PrepareSMTPClient`: `NOAUTH` (or an empty
/// username/password pair) skips credentials entirely.
pub fn prepare_transport(settings: &SmtpSettings) -> NotifyResult<AsyncSmtpTransport<Tokio1Executor>> {
    let host = settings.host.trim();

    let mut builder = if settings.tls || settings.starttls {
        AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(NotifyError::Transport)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
    };
    builder = builder.port(settings.port);

    let unauthenticated = matches!(settings.auth_mode, SmtpAuthMode::NoAuth)
        || (settings.username.is_empty() && settings.password.is_empty());

    if !unauthenticated {
        let mechanism = match settings.auth_mode {
            SmtpAuthMode::Login => Mechanism::Login,
            _ => Mechanism::Plain,
        };
        builder = builder
            .credentials(Credentials::new(settings.username.clone(), settings.password.clone()))
            .authentication(vec![mechanism]);
    }

    Ok(builder.build())
}

pub async fn send(transport: &AsyncSmtpTransport<Tokio1Executor>, message: Message) -> NotifyResult<()> {
    transport.send(message).await?;
    Ok(())
}
