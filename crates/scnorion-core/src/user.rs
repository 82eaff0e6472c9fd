use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Referenced only by certificate issuance/revocation. Authored by the
/// console; the core never creates or deletes a row here, only updates
/// the three fields a certificate issuance touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub tenant_id: i32,
    pub email: String,
    pub email_verified: bool,
    pub certificate_sent: bool,
    pub certificate_id: Option<i64>,
    pub certificate_expiry: Option<DateTime<Utc>>,
}
