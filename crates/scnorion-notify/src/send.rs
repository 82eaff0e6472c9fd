//! `notification.confirm_email` and `notification.send_certificate`
//! (`spec.md` §4.6): both subjects run the identical render-then-send
//! sequence in the source system
//! (`original_source/internal/common/notification.go`'s
//! `SendConfirmEmailHandler` / `SendUserCertificateHandler` are the same
//! body twice), so this rewrite keeps one function and two subject
//! constants instead of duplicating it.

use std::sync::Arc;
use std::time::Duration;

use handlebars::Handlebars;
use scnorion_bus::IncomingMessage;
use scnorion_core::Notification;
use tracing::error;

use crate::mailer;
use crate::settings_cache::SettingsCache;

pub const CONFIRM_EMAIL_SUBJECT: &str = "notification.confirm_email";
pub const SEND_CERTIFICATE_SUBJECT: &str = "notification.send_certificate";
pub const QUEUE: &str = "scnorion-notification";

const RETRY_DELAY: Duration = Duration::from_secs(5 * 60);

pub async fn handle(cache: &Arc<SettingsCache>, hb: &Arc<Handlebars<'static>>, msg: &mut IncomingMessage) {
    let Some(settings) = cache.get() else {
        error!("no SMTP settings found, retry in 5 minutes");
        let _ = msg.nak_with_delay(RETRY_DELAY).await;
        return;
    };
    let Some(smtp) = settings.smtp.as_ref() else {
        error!("no SMTP settings found, retry in 5 minutes");
        let _ = msg.nak_with_delay(RETRY_DELAY).await;
        return;
    };

    let notification: Notification = match serde_json::from_slice(&msg.payload) {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, "could not unmarshal notification request");
            let _ = msg.nak_with_delay(RETRY_DELAY).await;
            return;
        }
    };

    let message = match mailer::prepare_message(hb, &notification, smtp, &settings.default_sender) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "could not prepare notification message");
            let _ = msg.nak_with_delay(RETRY_DELAY).await;
            return;
        }
    };

    let transport = match mailer::prepare_transport(smtp) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "could not prepare SMTP client");
            let _ = msg.nak_with_delay(RETRY_DELAY).await;
            return;
        }
    };

    match mailer::send(&transport, message).await {
        Ok(()) => msg.ack(),
        Err(e) => {
            error!(error = %e, "could not connect and send message");
            let _ = msg.nak_with_delay(RETRY_DELAY).await;
        }
    }
}
