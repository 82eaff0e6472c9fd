//! Wire payloads exchanged over the bus. These are intentionally separate
//! from the domain structs in `scnorion-core`: the wire shape is whatever
//! the agent binary sends, the domain shape is whatever the rest of this
//! system wants to reason about, and a handler's job is to translate
//! between the two.

use chrono::{DateTime, Utc};
use scnorion_core::DeployAction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentReportWire {
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
    pub enabled: bool,
    pub endpoint_type: String,
    /// Verbatim tenant id string, consulted only when the agent is unknown.
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub site_id: Option<i32>,
    #[serde(default)]
    pub site_tenant_id: Option<i32>,
    #[serde(default)]
    pub release_version: Option<String>,
    #[serde(default)]
    pub release_channel: Option<String>,
    #[serde(default)]
    pub release_os: Option<String>,
    #[serde(default)]
    pub release_arch: Option<String>,
    #[serde(default)]
    pub update_task_version: String,
    #[serde(default)]
    pub last_update_task_execution_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_task_result: String,
    #[serde(default)]
    pub update_task_success: Option<bool>,
    #[serde(default)]
    pub computer: Option<scnorion_core::agent::Computer>,
    #[serde(default)]
    pub operating_system: Option<scnorion_core::agent::OperatingSystem>,
    #[serde(default)]
    pub antivirus: Vec<scnorion_core::agent::Antivirus>,
    #[serde(default)]
    pub applications: Vec<scnorion_core::agent::Application>,
    #[serde(default)]
    pub monitors: Vec<scnorion_core::agent::Monitor>,
    #[serde(default)]
    pub memory_slots: Vec<scnorion_core::agent::MemorySlot>,
    #[serde(default)]
    pub logical_disks: Vec<scnorion_core::agent::LogicalDisk>,
    #[serde(default)]
    pub physical_disks: Vec<scnorion_core::agent::PhysicalDisk>,
    #[serde(default)]
    pub printers: Vec<scnorion_core::agent::Printer>,
    #[serde(default)]
    pub network_adapters: Vec<scnorion_core::agent::NetworkAdapter>,
    #[serde(default)]
    pub shares: Vec<scnorion_core::agent::Share>,
    #[serde(default)]
    pub system_updates: Option<scnorion_core::agent::SystemUpdateSummary>,
    #[serde(default)]
    pub os_updates: Vec<scnorion_core::agent::OsUpdate>,
}

/// Shared shape for `deployresult` and `wingetcfg.deploy` — the two
/// subjects feeding the deployment state machine (`spec.md` §4.4.2).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeployActionWireEnvelope {
    pub agent_id: String,
    pub package_id: String,
    pub action: DeployAction,
    #[serde(default)]
    pub failed: bool,
}

/// `wingetcfg.exclude` carries no action — it's always an exclusion.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExcludeWireEnvelope {
    pub agent_id: String,
    pub package_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AgentConfigRequestWire {
    Structured {
        agent_id: String,
        #[serde(default)]
        tenant_id: Option<i32>,
        #[serde(default)]
        site_id: Option<i32>,
    },
    BareAgentId(String),
}

impl AgentConfigRequestWire {
    pub fn agent_id(&self) -> &str {
        match self {
            AgentConfigRequestWire::Structured { agent_id, .. } => agent_id,
            AgentConfigRequestWire::BareAgentId(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentConfigResponseWire {
    pub ok: bool,
    pub report_frequency_minutes: i32,
    pub profile_frequency_minutes: i32,
    pub sftp_service: bool,
    pub remote_assistance: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CfgProfilesRequestWire {
    pub agent_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WingetCfgReportWire {
    pub profile_id: i64,
    pub agent_id: String,
    pub success: bool,
    #[serde(default)]
    pub error_text: String,
}
