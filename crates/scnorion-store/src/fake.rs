//! In-memory `Store` used by the ingest/CA/notify crates' own test suites,
//! so those crates can exercise handler logic without a live Postgres.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use scnorion_core::{
    Agent, Certificate, Deployment, Profile, ProfileIssue, Release, ReleaseKey, RevocationReason,
    RevocationRecord, Settings, Site, Tenant, User, WinGetConfigExclusion,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::{AgentReportBundle, Store};

#[derive(Default)]
struct Inner {
    tenants: Vec<Tenant>,
    sites: Vec<Site>,
    agents: HashMap<String, Agent>,
    agent_bundles: HashMap<String, AgentReportBundle>,
    settings: Vec<Settings>,
    releases: Vec<Release>,
    next_release_id: i64,
    deployments: Vec<Deployment>,
    exclusions: Vec<WinGetConfigExclusion>,
    profiles: Vec<Profile>,
    profile_issues: Vec<ProfileIssue>,
    certificates: Vec<Certificate>,
    next_certificate_id: i64,
    users: Vec<User>,
    revocation_records: Vec<RevocationRecord>,
}

pub struct FakeStore {
    inner: Mutex<Inner>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_release_id: 1,
                next_certificate_id: 1,
                ..Default::default()
            }),
        }
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_tenant(&self, tenant: Tenant) {
        self.inner.lock().unwrap().tenants.push(tenant);
    }

    pub fn seed_site(&self, site: Site) {
        self.inner.lock().unwrap().sites.push(site);
    }

    pub fn seed_settings(&self, settings: Settings) {
        self.inner.lock().unwrap().settings.push(settings);
    }

    pub fn seed_agent(&self, agent: Agent) {
        let mut guard = self.inner.lock().unwrap();
        guard.agents.insert(agent.agent_id.clone(), agent);
    }

    pub fn seed_profile(&self, profile: Profile) {
        self.inner.lock().unwrap().profiles.push(profile);
    }

    pub fn seed_user(&self, user: User) {
        self.inner.lock().unwrap().users.push(user);
    }

    pub fn seed_deployment(&self, deployment: Deployment) {
        self.inner.lock().unwrap().deployments.push(deployment);
    }

    /// The bundle of child records/collections last saved for `agent_id`,
    /// for tests asserting on `save_agent_info`'s replace-wholesale
    /// behavior.
    pub fn agent_bundle(&self, agent_id: &str) -> Option<AgentReportBundle> {
        self.inner.lock().unwrap().agent_bundles.get(agent_id).cloned()
    }

    /// Revocation records filed so far, for tests asserting a revocation
    /// happened without reaching into the (deleted) certificate row.
    pub fn revocation_records(&self) -> Vec<RevocationRecord> {
        self.inner.lock().unwrap().revocation_records.clone()
    }

    /// Whether a certificate row with this id is still live.
    pub fn has_certificate(&self, id: i64) -> bool {
        self.inner.lock().unwrap().certificates.iter().any(|c| c.id == id)
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn get_default_tenant(&self) -> StoreResult<Tenant> {
        self.inner
            .lock()
            .unwrap()
            .tenants
            .iter()
            .find(|t| t.is_default)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("default tenant".into()))
    }

    async fn get_default_site(&self, tenant_id: i32) -> StoreResult<Site> {
        self.inner
            .lock()
            .unwrap()
            .sites
            .iter()
            .find(|s| s.tenant_id == tenant_id && s.is_default)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("default site for tenant {tenant_id}")))
    }

    async fn validate_tenant_and_site(&self, tenant_id: i32, site_id: i32) -> StoreResult<()> {
        let guard = self.inner.lock().unwrap();
        guard
            .sites
            .iter()
            .any(|s| s.id == site_id && s.tenant_id == tenant_id)
            .then_some(())
            .ok_or_else(|| StoreError::NotFound(format!("site {site_id} under tenant {tenant_id}")))
    }

    async fn get_tenant_from_agent_id(
        &self,
        agent_id: &str,
        fallback_tenant_id: &str,
    ) -> StoreResult<i32> {
        let guard = self.inner.lock().unwrap();
        if let Some(agent) = guard.agents.get(agent_id) {
            if let Some(site_id) = agent.site_id {
                if let Some(site) = guard.sites.iter().find(|s| s.id == site_id) {
                    return Ok(site.tenant_id);
                }
            }
        }
        if !fallback_tenant_id.is_empty() {
            return fallback_tenant_id
                .parse::<i32>()
                .map_err(|_| StoreError::NotFound(format!("agent {agent_id}")));
        }
        Err(StoreError::NotFound(format!("agent {agent_id}")))
    }

    async fn get_settings(&self, tenant_id: Option<i32>) -> StoreResult<Settings> {
        self.get_smtp_settings(tenant_id).await
    }

    async fn get_smtp_settings(&self, tenant_id: Option<i32>) -> StoreResult<Settings> {
        let guard = self.inner.lock().unwrap();
        guard
            .settings
            .iter()
            .find(|s| s.tenant_id == tenant_id)
            .or_else(|| guard.settings.iter().find(|s| s.tenant_id.is_none()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound("settings".into()))
    }

    async fn get_agent(&self, agent_id: &str) -> StoreResult<Agent> {
        self.inner
            .lock()
            .unwrap()
            .agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("agent {agent_id}")))
    }

    async fn save_agent_info(&self, agent: &Agent, bundle: &AgentReportBundle) -> StoreResult<()> {
        let mut guard = self.inner.lock().unwrap();
        guard.agents.insert(agent.agent_id.clone(), agent.clone());
        // Every child collection is replaced wholesale, never merged with
        // what was there before (`spec.md` §4.4.1 step 7 / §8's "never a
        // mix" invariant) — a fresh `insert` over the keyed map already
        // gives us that, with no separate delete-then-insert needed since
        // there's nothing else sharing the old `AgentReportBundle` to leak
        // through.
        guard.agent_bundles.insert(agent.agent_id.clone(), bundle.clone());
        Ok(())
    }

    async fn set_agent_waiting_for_admission_again(&self, agent_id: &str) -> StoreResult<()> {
        let mut guard = self.inner.lock().unwrap();
        let agent = guard
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| StoreError::NotFound(format!("agent {agent_id}")))?;
        agent.admission_status = scnorion_core::AdmissionStatus::WaitingForAdmission;
        Ok(())
    }

    async fn set_agent_connectivity_flags(
        &self,
        agent_id: &str,
        sftp_service: bool,
        remote_assistance: bool,
    ) -> StoreResult<()> {
        let mut guard = self.inner.lock().unwrap();
        let agent = guard
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| StoreError::NotFound(format!("agent {agent_id}")))?;
        agent.sftp_service = sftp_service;
        agent.remote_assistance = remote_assistance;
        Ok(())
    }

    async fn get_release_by_key(&self, key: &ReleaseKey) -> StoreResult<Release> {
        self.inner
            .lock()
            .unwrap()
            .releases
            .iter()
            .find(|r| &r.key == key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("release {key:?}")))
    }

    async fn save_release_info(&self, release: &Release) -> StoreResult<i64> {
        let mut guard = self.inner.lock().unwrap();
        if let Some(existing) = guard.releases.iter_mut().find(|r| r.key == release.key) {
            existing.checksum = release.checksum.clone();
            existing.url = release.url.clone();
            return Ok(existing.id);
        }
        let id = guard.next_release_id;
        guard.next_release_id += 1;
        let mut stored = release.clone();
        stored.id = id;
        guard.releases.push(stored);
        Ok(id)
    }

    async fn get_deployment(&self, agent_id: &str, package_id: &str) -> StoreResult<Deployment> {
        self.inner
            .lock()
            .unwrap()
            .deployments
            .iter()
            .find(|d| d.agent_id == agent_id && d.package_id == package_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("deployment {agent_id}/{package_id}")))
    }

    async fn upsert_deployment(&self, deployment: &Deployment) -> StoreResult<()> {
        let mut guard = self.inner.lock().unwrap();
        match guard
            .deployments
            .iter_mut()
            .find(|d| d.agent_id == deployment.agent_id && d.package_id == deployment.package_id)
        {
            Some(existing) => *existing = deployment.clone(),
            None => guard.deployments.push(deployment.clone()),
        }
        Ok(())
    }

    async fn delete_deployment(&self, agent_id: &str, package_id: &str) -> StoreResult<Option<Deployment>> {
        let mut guard = self.inner.lock().unwrap();
        let idx = guard
            .deployments
            .iter()
            .position(|d| d.agent_id == agent_id && d.package_id == package_id);
        Ok(idx.map(|i| guard.deployments.remove(i)))
    }

    async fn get_deployed_packages(&self, agent_id: &str) -> StoreResult<Vec<Deployment>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .deployments
            .iter()
            .filter(|d| d.agent_id == agent_id)
            .cloned()
            .collect())
    }

    async fn upsert_winget_exclusion(&self, agent_id: &str, package_id: &str) -> StoreResult<()> {
        let mut guard = self.inner.lock().unwrap();
        if !guard
            .exclusions
            .iter()
            .any(|e| e.agent_id == agent_id && e.package_id == package_id)
        {
            guard.exclusions.push(WinGetConfigExclusion {
                agent_id: agent_id.to_owned(),
                package_id: package_id.to_owned(),
            });
        }
        Ok(())
    }

    async fn delete_winget_exclusion(&self, agent_id: &str, package_id: &str) -> StoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .exclusions
            .retain(|e| !(e.agent_id == agent_id && e.package_id == package_id));
        Ok(())
    }

    async fn get_excluded_winget_packages(&self, agent_id: &str) -> StoreResult<Vec<WinGetConfigExclusion>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .exclusions
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .cloned()
            .collect())
    }

    async fn get_profiles_for_agent(&self, agent_id: &str) -> StoreResult<Vec<Profile>> {
        let guard = self.inner.lock().unwrap();
        let agent = guard
            .agents
            .get(agent_id)
            .ok_or_else(|| StoreError::NotFound(format!("agent {agent_id}")))?;
        let site_id = agent
            .site_id
            .ok_or_else(|| StoreError::NotFound(format!("site for agent {agent_id}")))?;

        let mut all_scope: Vec<Profile> = guard
            .profiles
            .iter()
            .filter(|p| p.site_id == site_id && p.apply_to_all)
            .cloned()
            .collect();
        all_scope.sort_by_key(|p| p.id);

        let mut tag_matched: Vec<Profile> = guard
            .profiles
            .iter()
            .filter(|p| p.site_id == site_id && !p.apply_to_all && p.applies_to(&agent.tags))
            .cloned()
            .collect();
        tag_matched.sort_by_key(|p| p.id);

        all_scope.extend(tag_matched);
        Ok(all_scope)
    }

    async fn upsert_profile_issue(&self, issue: &ProfileIssue) -> StoreResult<()> {
        let mut guard = self.inner.lock().unwrap();
        match guard
            .profile_issues
            .iter_mut()
            .find(|i| i.profile_id == issue.profile_id && i.agent_id == issue.agent_id)
        {
            Some(existing) => *existing = issue.clone(),
            None => guard.profile_issues.push(issue.clone()),
        }
        Ok(())
    }

    async fn delete_profile_issue(&self, profile_id: i64, agent_id: &str) -> StoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .profile_issues
            .retain(|i| !(i.profile_id == profile_id && i.agent_id == agent_id));
        Ok(())
    }

    async fn save_certificate(&self, certificate: &Certificate) -> StoreResult<i64> {
        let mut guard = self.inner.lock().unwrap();
        let id = guard.next_certificate_id;
        guard.next_certificate_id += 1;
        let mut stored = certificate.clone();
        stored.id = id;
        guard.certificates.push(stored);
        Ok(id)
    }

    async fn revoke_certificates_by_description(
        &self,
        description: &str,
        reason: RevocationReason,
    ) -> StoreResult<Vec<i64>> {
        let mut guard = self.inner.lock().unwrap();
        let mut revoked = Vec::new();
        // Certificates are never updated in place (`spec.md` §3): a
        // superseded certificate's row is deleted, with a `RevocationRecord`
        // filed in its place, rather than an in-place `revoked` flag.
        guard.certificates.retain(|cert| {
            if cert.description == description {
                revoked.push(cert.id);
                false
            } else {
                true
            }
        });
        for &certificate_id in &revoked {
            guard.revocation_records.push(RevocationRecord {
                certificate_id,
                reason,
                revoked_at: Utc::now(),
            });
        }
        Ok(revoked)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        self.inner
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {email}")))
    }

    async fn set_certificate_sent(&self, user_id: i64, certificate_id: i64) -> StoreResult<()> {
        let mut guard = self.inner.lock().unwrap();
        let user = guard
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
        user.certificate_sent = true;
        user.certificate_id = Some(certificate_id);
        Ok(())
    }

    async fn set_email_verified(&self, user_id: i64) -> StoreResult<()> {
        let mut guard = self.inner.lock().unwrap();
        let user = guard
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
        user.email_verified = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tenant_fallback_is_used_only_when_agent_is_unknown() {
        let store = FakeStore::new();
        store.seed_tenant(Tenant {
            id: 7,
            name: "acme".into(),
            is_default: false,
        });

        let resolved = store
            .get_tenant_from_agent_id("missing-agent", "7")
            .await
            .unwrap();
        assert_eq!(resolved, 7);

        let err = store
            .get_tenant_from_agent_id("missing-agent", "")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn profiles_for_agent_put_all_scope_profiles_first() {
        let store = FakeStore::new();
        store.seed_site(Site {
            id: 1,
            tenant_id: 1,
            name: "hq".into(),
            is_default: true,
        });
        store.seed_agent(Agent {
            site_id: Some(1),
            tags: vec![9],
            ..sample_agent()
        });
        store.seed_profile(Profile {
            id: 2,
            name: "tagged".into(),
            site_id: 1,
            apply_to_all: false,
            tags: vec![9],
            tasks: vec![],
        });
        store.seed_profile(Profile {
            id: 1,
            name: "base".into(),
            site_id: 1,
            apply_to_all: true,
            tags: vec![],
            tasks: vec![],
        });

        let profiles = store.get_profiles_for_agent("A1").await.unwrap();
        assert_eq!(profiles.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn saving_agent_info_replaces_rather_than_unions_child_collections() {
        let store = FakeStore::new();
        let agent = sample_agent();

        let first_bundle = AgentReportBundle {
            applications: vec![
                scnorion_core::agent::Application {
                    name: "7-Zip".into(),
                    ..Default::default()
                },
                scnorion_core::agent::Application {
                    name: "Firefox".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        store.save_agent_info(&agent, &first_bundle).await.unwrap();
        assert_eq!(store.agent_bundle("A1").unwrap().applications.len(), 2);

        let second_bundle = AgentReportBundle {
            applications: vec![scnorion_core::agent::Application {
                name: "Firefox".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        store.save_agent_info(&agent, &second_bundle).await.unwrap();

        let stored = store.agent_bundle("A1").unwrap();
        assert_eq!(stored.applications.len(), 1);
        assert_eq!(stored.applications[0].name, "Firefox");
    }

    #[tokio::test]
    async fn revoking_by_description_deletes_the_row_and_files_a_revocation_record() {
        let store = FakeStore::new();
        let certificate_id = store
            .save_certificate(&Certificate {
                id: 0,
                serial: 42,
                cert_type: scnorion_core::CertType::Agent,
                description: "a1.example agent certificate".into(),
                user_id: None,
                not_before: chrono::Utc::now(),
                not_after: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let revoked = store
            .revoke_certificates_by_description("a1.example agent certificate", RevocationReason::Superseded)
            .await
            .unwrap();

        assert_eq!(revoked, vec![certificate_id]);
        assert!(!store.has_certificate(certificate_id));
        let records = store.revocation_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].certificate_id, certificate_id);
        assert_eq!(records[0].reason, RevocationReason::Superseded);
    }

    fn sample_agent() -> Agent {
        Agent {
            agent_id: "A1".into(),
            hostname: "a1".into(),
            ip: "10.0.0.1".into(),
            mac: String::new(),
            os: "windows".into(),
            sftp_service: false,
            remote_assistance: false,
            is_wayland: false,
            has_rustdesk: false,
            debug_mode: false,
            is_remote: false,
            nickname: "a1".into(),
            endpoint_type: "workstation".into(),
            description: String::new(),
            admission_status: scnorion_core::AdmissionStatus::Enabled,
            first_contact: chrono::Utc::now(),
            last_contact: chrono::Utc::now(),
            update_task: Default::default(),
            site_id: None,
            release_id: None,
            tags: vec![],
        }
    }
}
