//! Notification emitter (`spec.md` §4.6 / C6): consumes outbound
//! notification requests, renders templated mail, and dispatches over
//! SMTP.

pub mod error;
pub mod mailer;
pub mod reload_settings;
pub mod send;
pub mod settings_cache;
pub mod template;

pub use error::{NotifyError, NotifyResult};
pub use settings_cache::SettingsCache;

pub const PING_SUBJECT: &str = "ping.notificationworker";

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scnorion_core::{Notification, Settings, SmtpAuthMode, SmtpSettings};
    use scnorion_store::{FakeStore, Store};

    use super::*;

    fn smtp_settings() -> SmtpSettings {
        SmtpSettings {
            host: "localhost".into(),
            port: 2525,
            auth_mode: SmtpAuthMode::NoAuth,
            username: String::new(),
            password: String::new(),
            starttls: false,
            tls: false,
        }
    }

    #[tokio::test]
    async fn cache_starts_empty_and_loads_on_reload() {
        let cache = Arc::new(SettingsCache::empty());
        assert!(cache.get().is_none());

        let fake = FakeStore::new();
        fake.seed_settings(Settings {
            default_sender: "noreply@scnorion.eu".into(),
            smtp: Some(smtp_settings()),
            ..Default::default()
        });
        let store: Arc<dyn Store> = Arc::new(fake);
        cache.reload(&store).await;
        assert!(cache.get().is_some());
    }

    #[test]
    fn prepare_message_renders_html_body_and_attachment() {
        let hb = Arc::new(template::registry());
        let notification = Notification {
            to: "user@example.eu".into(),
            subject: "Your certificate".into(),
            message_title: "scnorion | Your certificate".into(),
            message_greeting: "Hi Alice".into(),
            message_text: "See attached.".into(),
            message_action: "Go to console".into(),
            message_action_url: "https://console.scnorion.eu".into(),
            message_attach_file_name: "alice.pfx".into(),
            message_attach_file: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b"fake-pfx-bytes"),
            ..Default::default()
        };

        let message = mailer::prepare_message(&hb, &notification, &smtp_settings(), "noreply@scnorion.eu").unwrap();
        assert!(!message.headers().is_empty());
    }
}
