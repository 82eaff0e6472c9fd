//! Agent and its child records/collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Admission lifecycle. Once an agent leaves `WaitingForAdmission`, it may
/// only toggle between `Enabled` and `Disabled` — reverting to
/// `WaitingForAdmission` requires explicit administrative action, never an
/// incoming report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionStatus {
    WaitingForAdmission,
    Enabled,
    Disabled,
}

impl AdmissionStatus {
    /// Apply an incoming report's `enabled` flag to the current status,
    /// honoring the one-way exit from `WaitingForAdmission`.
    pub fn next(self, report_enabled: bool) -> Self {
        match self {
            AdmissionStatus::WaitingForAdmission => AdmissionStatus::WaitingForAdmission,
            _ => {
                if report_enabled {
                    AdmissionStatus::Enabled
                } else {
                    AdmissionStatus::Disabled
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateTaskStatus {
    Success,
    Error,
}

/// State of the agent's self-update task, replayed on every report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskState {
    pub version: String,
    pub execution_time: Option<DateTime<Utc>>,
    pub status: Option<UpdateTaskStatus>,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub hostname: String,
    pub ip: String,
    pub mac: String,
    pub os: String,
    pub sftp_service: bool,
    pub remote_assistance: bool,
    pub is_wayland: bool,
    pub has_rustdesk: bool,
    pub debug_mode: bool,
    pub is_remote: bool,
    pub nickname: String,
    pub endpoint_type: String,
    pub description: String,
    pub admission_status: AdmissionStatus,
    pub first_contact: DateTime<Utc>,
    pub last_contact: DateTime<Utc>,
    pub update_task: UpdateTaskState,
    /// `None` only transiently, between creation and site binding within a
    /// single report transaction. The invariant `|sites(agent)| == 1` must
    /// hold once `SaveAgentInfo` returns.
    pub site_id: Option<i32>,
    pub release_id: Option<i64>,
    pub tags: Vec<i32>,
}

impl Agent {
    pub fn is_new(first_contact: DateTime<Utc>, last_contact: DateTime<Utc>) -> bool {
        first_contact == last_contact
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Computer {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub memory: i64,
    pub processor: String,
    pub processor_arch: String,
    pub processor_cores: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingSystem {
    pub version: String,
    pub description: String,
    pub edition: String,
    pub install_date: Option<DateTime<Utc>>,
    pub arch: String,
    pub username: String,
    pub last_bootup_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Antivirus {
    pub name: String,
    pub is_active: bool,
    pub is_updated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemUpdateSummary {
    pub status: String,
    pub last_install: Option<DateTime<Utc>>,
    pub last_search: Option<DateTime<Utc>>,
    pub pending_updates: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub version: String,
    pub publisher: String,
    pub install_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
    pub week_of_manufacture: i32,
    pub year_of_manufacture: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySlot {
    pub slot: String,
    pub memory_type: String,
    pub part_number: String,
    pub serial_number: String,
    pub size: i64,
    pub speed: i32,
    pub manufacturer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicalDisk {
    pub label: String,
    pub usage: String,
    pub volume_name: String,
    pub size_in_units: i64,
    pub filesystem: String,
    pub remaining_space_in_units: i64,
    pub bitlocker_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalDisk {
    pub device_id: String,
    pub model: String,
    pub serial_number: String,
    pub size_in_units: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Printer {
    pub name: String,
    pub port: String,
    pub is_default: bool,
    pub is_network: bool,
    pub is_shared: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkAdapter {
    pub name: String,
    pub mac_address: String,
    pub addresses: Vec<String>,
    pub subnet: Vec<String>,
    pub dns_domain: String,
    pub dns_servers: Vec<String>,
    pub default_gateway: Vec<String>,
    pub dhcp_enabled: bool,
    pub dhcp_lease_expired: Option<DateTime<Utc>>,
    pub dhcp_lease_obtained: Option<DateTime<Utc>>,
    pub speed: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub name: String,
    pub description: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsUpdate {
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    pub support_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_for_admission_never_reverts_or_advances_from_a_report() {
        assert_eq!(
            AdmissionStatus::WaitingForAdmission.next(true),
            AdmissionStatus::WaitingForAdmission
        );
        assert_eq!(
            AdmissionStatus::WaitingForAdmission.next(false),
            AdmissionStatus::WaitingForAdmission
        );
    }

    #[test]
    fn enabled_and_disabled_toggle_freely() {
        assert_eq!(AdmissionStatus::Enabled.next(false), AdmissionStatus::Disabled);
        assert_eq!(AdmissionStatus::Disabled.next(true), AdmissionStatus::Enabled);
    }
}
