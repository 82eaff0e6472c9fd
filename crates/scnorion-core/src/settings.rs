use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpAuthMode {
    NoAuth,
    Plain,
    Login,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub auth_mode: SmtpAuthMode,
    pub username: String,
    pub password: String,
    pub starttls: bool,
    pub tls: bool,
}

/// Tenant-scoped settings with a fallback to the global default row when a
/// tenant hasn't overridden a given concern. Exactly one global row
/// (`tenant_id == None`) exists; at most one row per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub tenant_id: Option<i32>,
    pub report_frequency_minutes: i32,
    pub profile_frequency_minutes: i32,
    pub sftp_disabled: bool,
    pub remote_assistance_disabled: bool,
    pub auto_admit_agents: bool,
    pub default_sender: String,
    pub smtp: Option<SmtpSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tenant_id: None,
            report_frequency_minutes: 5,
            profile_frequency_minutes: 60,
            sftp_disabled: false,
            remote_assistance_disabled: false,
            auto_admit_agents: false,
            default_sender: String::new(),
            smtp: None,
        }
    }
}
