//! HTML mail body rendering. One template covers both
//! `notification.confirm_email` and `notification.send_certificate` since
//! both flow through the same [`scnorion_core::Notification`] envelope
//! (title, greeting, action button + URL), replacing the source system's
//! Go-templ-generated `EmailTemplate`
//! (`original_source/internal/common/notifications/notifications.go`).

use handlebars::Handlebars;
use scnorion_core::Notification;
use serde_json::json;

use crate::error::NotifyResult;

const TEMPLATE_NAME: &str = "notification";

const TEMPLATE_SOURCE: &str = r#"
<!DOCTYPE html>
<html>
<body style="font-family: sans-serif; color: #1a1a1a;">
  <h2>{{title}}</h2>
  <p>{{greeting}}</p>
  <p>{{{text}}}</p>
  {{#if action}}
  <p><a href="{{action_url}}" style="display:inline-block;padding:10px 18px;background:#2a6df4;color:#fff;text-decoration:none;border-radius:4px;">{{action}}</a></p>
  {{/if}}
</body>
</html>
"#;

pub fn registry() -> Handlebars<'static> {
    let mut hb = Handlebars::new();
    hb.register_template_string(TEMPLATE_NAME, TEMPLATE_SOURCE)
        .expect("notification template source is valid");
    hb
}

pub fn render(hb: &Handlebars<'static>, notification: &Notification) -> NotifyResult<String> {
    let data = json!({
        "title": notification.message_title,
        "greeting": notification.message_greeting,
        "text": notification.message_text,
        "action": notification.message_action,
        "action_url": notification.message_action_url,
    });
    Ok(hb.render(TEMPLATE_NAME, &data)?)
}
