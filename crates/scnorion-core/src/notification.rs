//! The outbound mail envelope shared by every publisher on
//! `notification.confirm_email` / `notification.send_certificate`
//! (certificate issuance, email confirmation) and consumed by the
//! notification worker. One shape covers both subjects, matching
//! `original_source/internal/common/notifications/notifications.go`'s
//! single `Notification` struct.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    #[serde(default)]
    pub from: String,
    pub subject: String,
    pub message_title: String,
    pub message_text: String,
    pub message_greeting: String,
    #[serde(default)]
    pub message_action: String,
    #[serde(default)]
    pub message_action_url: String,
    /// Base64-encoded attachment payload and the filename it should be
    /// delivered under. Up to two attachments; the second slot exists for
    /// certificate delivery's CA-bundle zip (`spec.md` §4.5).
    #[serde(default)]
    pub message_attach_file_name: String,
    #[serde(default)]
    pub message_attach_file: String,
    #[serde(default)]
    pub message_attach_file_name_2: String,
    #[serde(default)]
    pub message_attach_file_2: String,
}
