use async_trait::async_trait;
use scnorion_core::{
    Agent, Certificate, Deployment, Profile, ProfileIssue, Release, ReleaseKey, RevocationReason,
    Settings, Site, Tenant, User, WinGetConfigExclusion,
};

use crate::error::StoreResult;

/// Everything a single agent report carries beyond the `Agent` row itself.
/// `SaveAgentInfo` persists the whole bundle in one transaction: every
/// child collection (computers, disks, printers, ...) is replaced
/// wholesale rather than diffed, matching the source system's
/// delete-then-insert approach to "this report is the full current state".
#[derive(Debug, Clone, Default)]
pub struct AgentReportBundle {
    pub computer: Option<scnorion_core::agent::Computer>,
    pub operating_system: Option<scnorion_core::agent::OperatingSystem>,
    pub antivirus: Vec<scnorion_core::agent::Antivirus>,
    pub applications: Vec<scnorion_core::agent::Application>,
    pub monitors: Vec<scnorion_core::agent::Monitor>,
    pub memory_slots: Vec<scnorion_core::agent::MemorySlot>,
    pub logical_disks: Vec<scnorion_core::agent::LogicalDisk>,
    pub physical_disks: Vec<scnorion_core::agent::PhysicalDisk>,
    pub printers: Vec<scnorion_core::agent::Printer>,
    pub network_adapters: Vec<scnorion_core::agent::NetworkAdapter>,
    pub shares: Vec<scnorion_core::agent::Share>,
    pub system_updates: Option<scnorion_core::agent::SystemUpdateSummary>,
    pub os_updates: Vec<scnorion_core::agent::OsUpdate>,
}

/// The fleet's persisted state. Every method that can legitimately find
/// nothing returns `StoreError::NotFound` rather than `Ok(None)`, so
/// callers can use `.is_not_found()` as the same kind of control-flow
/// branch the rest of the system uses for admission and fallback logic.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_default_tenant(&self) -> StoreResult<Tenant>;
    async fn get_default_site(&self, tenant_id: i32) -> StoreResult<Site>;
    async fn validate_tenant_and_site(&self, tenant_id: i32, site_id: i32) -> StoreResult<()>;

    /// Resolve the tenant owning `agent_id`. When the agent is unknown and
    /// `fallback_tenant_id` is non-empty, parse and use it instead of
    /// failing outright — the corrected fallback order (see `DESIGN.md`
    /// for the Open Question this resolves).
    async fn get_tenant_from_agent_id(
        &self,
        agent_id: &str,
        fallback_tenant_id: &str,
    ) -> StoreResult<i32>;

    /// Tenant-scoped settings, falling back to the single global row.
    async fn get_settings(&self, tenant_id: Option<i32>) -> StoreResult<Settings>;
    /// Same fallback rule, SMTP-only projection (what the notification
    /// worker actually needs on its hot path).
    async fn get_smtp_settings(&self, tenant_id: Option<i32>) -> StoreResult<Settings>;

    async fn get_agent(&self, agent_id: &str) -> StoreResult<Agent>;
    async fn save_agent_info(&self, agent: &Agent, bundle: &AgentReportBundle) -> StoreResult<()>;
    async fn set_agent_waiting_for_admission_again(&self, agent_id: &str) -> StoreResult<()>;
    async fn set_agent_connectivity_flags(
        &self,
        agent_id: &str,
        sftp_service: bool,
        remote_assistance: bool,
    ) -> StoreResult<()>;

    async fn get_release_by_key(&self, key: &ReleaseKey) -> StoreResult<Release>;
    async fn save_release_info(&self, release: &Release) -> StoreResult<i64>;

    async fn get_deployment(&self, agent_id: &str, package_id: &str) -> StoreResult<Deployment>;
    /// Overwrite-in-place by `(agent_id, package_id)`; the caller already
    /// decided whether this is a fresh row or a touch of an existing one.
    async fn upsert_deployment(&self, deployment: &Deployment) -> StoreResult<()>;
    /// Deletes the row if present and returns what was deleted, so the
    /// caller can inspect `by_profile` to decide whether an exclusion is
    /// owed.
    async fn delete_deployment(&self, agent_id: &str, package_id: &str) -> StoreResult<Option<Deployment>>;
    async fn get_deployed_packages(&self, agent_id: &str) -> StoreResult<Vec<Deployment>>;

    async fn upsert_winget_exclusion(&self, agent_id: &str, package_id: &str) -> StoreResult<()>;
    async fn delete_winget_exclusion(&self, agent_id: &str, package_id: &str) -> StoreResult<()>;
    async fn get_excluded_winget_packages(&self, agent_id: &str) -> StoreResult<Vec<WinGetConfigExclusion>>;

    /// Profiles applying to `agent_id`: all-scope profiles at its site
    /// first, then tag-matched ones, per the compiler's ordering
    /// requirement.
    async fn get_profiles_for_agent(&self, agent_id: &str) -> StoreResult<Vec<Profile>>;
    async fn upsert_profile_issue(&self, issue: &ProfileIssue) -> StoreResult<()>;
    async fn delete_profile_issue(&self, profile_id: i64, agent_id: &str) -> StoreResult<()>;

    async fn save_certificate(&self, certificate: &Certificate) -> StoreResult<i64>;
    /// Revokes every live certificate sharing `description`, returning
    /// the ids revoked (0 or 1 in practice — descriptions are meant to be
    /// unique per live certificate, see `spec.md` §8).
    async fn revoke_certificates_by_description(
        &self,
        description: &str,
        reason: RevocationReason,
    ) -> StoreResult<Vec<i64>>;

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User>;
    async fn set_certificate_sent(&self, user_id: i64, certificate_id: i64) -> StoreResult<()>;
    async fn set_email_verified(&self, user_id: i64) -> StoreResult<()>;
}
