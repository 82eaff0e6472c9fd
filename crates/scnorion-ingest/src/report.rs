//! Agent report ingestion: one inbound report updates the agent row,
//! every child collection, and its release linkage.
//!
//! Steps, per `spec.md` §4.4.1:
//! 1. Resolve the owning tenant (falling back to the report's own tenant
//!    hint only when the agent is unknown).
//! 2. Load settings for that tenant to extract `auto_admit_agents`.
//! 3. Load the existing agent row, if any, to carry forward user-owned
//!    fields and first contact.
//! 4. Bind the site: explicit id (validated) or the tenant's default; an
//!    agent that already has a site never gets a second one.
//! 5. New-agent branch: nickname = hostname, status per
//!    `auto_admit_agents`.
//! 6. Resolve whether the agent is calling in remotely.
//! 7. Fold the self-update task fields into `UpdateTaskState`.
//! 8. Persist the agent row and its child-collection bundle.
//! 9. Link the release (fetching its descriptor if unseen).
//! 10. Respond with `"Report received!"`.
//!
//! Each step logs and continues past its own failure — a failure linking
//! the release must not prevent the response from going out.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use scnorion_bus::IncomingMessage;
use scnorion_core::agent::{UpdateTaskState, UpdateTaskStatus};
use scnorion_core::{Agent, AdmissionStatus, Release, ReleaseKey};
use scnorion_store::{AgentReportBundle, Store};
use tracing::{error, info, warn};

use crate::error::IngestError;
use crate::release_directory::ReleaseDirectory;
use crate::wire::AgentReportWire;

pub const SUBJECT: &str = "report";
pub const QUEUE: &str = "scnorion-agents";

const RESPONSE_OK: &[u8] = b"Report received!";

/// Release kind this worker links; the releases endpoint serves other
/// artifact kinds too, but the fleet-management core only ever asks about
/// the agent binary itself.
const RELEASE_KIND: &str = "agent";

pub async fn handle(
    store: &Arc<dyn Store>,
    releases: &Arc<dyn ReleaseDirectory>,
    bus_url: &str,
    msg: &mut IncomingMessage,
) {
    if let Err(e) = handle_inner(store, releases, bus_url, &msg.payload).await {
        error!(error = %e, "could not process agent report");
    }
    msg.ack();
    if let Err(e) = msg.respond(Bytes::from_static(RESPONSE_OK)).await {
        error!(error = %e, "could not respond to report message");
    }
}

async fn handle_inner(
    store: &Arc<dyn Store>,
    releases: &Arc<dyn ReleaseDirectory>,
    bus_url: &str,
    payload: &[u8],
) -> Result<(), IngestError> {
    let wire: AgentReportWire = serde_json::from_slice(payload)?;
    let existing = store.get_agent(&wire.agent_id).await.ok();

    let tenant_id = store
        .get_tenant_from_agent_id(&wire.agent_id, wire.tenant.as_deref().unwrap_or(""))
        .await
        .ok();

    let auto_admit_agents = match store.get_settings(tenant_id).await {
        Ok(settings) => settings.auto_admit_agents,
        Err(e) => {
            warn!(error = %e, "could not load settings, defaulting auto_admit_agents=false");
            false
        }
    };

    let site_id = resolve_site(store, &existing, tenant_id, &wire).await?;
    let domain = derive_domain(bus_url);
    let is_remote = resolve_is_remote(&wire.hostname, &wire.ip, domain.as_deref()).await;
    let now = Utc::now();

    let (first_contact, nickname, description, endpoint_type, admission_status) = match &existing {
        Some(agent) => (
            agent.first_contact,
            agent.nickname.clone(),
            agent.description.clone(),
            agent.endpoint_type.clone(),
            agent.admission_status.next(wire.enabled),
        ),
        None => (
            now,
            wire.hostname.clone(),
            String::new(),
            wire.endpoint_type.clone(),
            if auto_admit_agents {
                AdmissionStatus::Enabled
            } else {
                AdmissionStatus::WaitingForAdmission
            },
        ),
    };

    let update_task = fold_update_task(existing.as_ref(), &wire, now);

    let agent = Agent {
        agent_id: wire.agent_id.clone(),
        hostname: wire.hostname.clone(),
        ip: wire.ip.clone(),
        mac: wire.mac.clone(),
        os: wire.os.clone(),
        sftp_service: wire.sftp_service,
        remote_assistance: wire.remote_assistance,
        is_wayland: wire.is_wayland,
        has_rustdesk: wire.has_rustdesk,
        debug_mode: wire.debug_mode,
        is_remote,
        nickname,
        endpoint_type,
        description,
        admission_status,
        first_contact,
        last_contact: now,
        update_task,
        site_id: Some(site_id),
        release_id: existing.as_ref().and_then(|a| a.release_id),
        tags: existing.as_ref().map(|a| a.tags.clone()).unwrap_or_default(),
    };

    let bundle = AgentReportBundle {
        computer: wire.computer.clone(),
        operating_system: wire.operating_system.clone(),
        antivirus: wire.antivirus.clone(),
        applications: wire.applications.clone(),
        monitors: wire.monitors.clone(),
        memory_slots: wire.memory_slots.clone(),
        logical_disks: wire.logical_disks.clone(),
        physical_disks: wire.physical_disks.clone(),
        printers: wire.printers.clone(),
        network_adapters: wire.network_adapters.clone(),
        shares: wire.shares.clone(),
        system_updates: wire.system_updates.clone(),
        os_updates: wire.os_updates.clone(),
    };

    if let Err(e) = store.save_agent_info(&agent, &bundle).await {
        error!(error = %e, agent_id = %wire.agent_id, "could not save agent info");
    } else {
        info!(agent_id = %agent.agent_id, admission_status = ?agent.admission_status, is_remote, "ingested agent report");
    }

    if let Some(version) = wire.release_version.as_deref() {
        if let Err(e) = link_release(store, releases, &wire, version).await {
            error!(error = %e, agent_id = %wire.agent_id, version, "could not link agent release");
        }
    }

    Ok(())
}

/// An existing agent keeps its site forever; a new one, or one not yet
/// bound, takes the requested site (validated) or the tenant's default.
async fn resolve_site(
    store: &Arc<dyn Store>,
    existing: &Option<Agent>,
    tenant_id: Option<i32>,
    wire: &AgentReportWire,
) -> Result<i32, IngestError> {
    if let Some(agent) = existing {
        if let Some(site_id) = agent.site_id {
            return Ok(site_id);
        }
    }

    let tenant_id = match tenant_id {
        Some(id) => id,
        None => store.get_default_tenant().await?.id,
    };

    match wire.site_id {
        Some(site_id) => {
            let owning_tenant = wire.site_tenant_id.unwrap_or(tenant_id);
            store.validate_tenant_and_site(owning_tenant, site_id).await?;
            Ok(site_id)
        }
        None => Ok(store.get_default_site(tenant_id).await?.id),
    }
}

/// If the report's task execution time is newer than what's stored, adopt
/// it and reconcile the reported status against the release version;
/// otherwise keep every stored field untouched.
fn fold_update_task(existing: Option<&Agent>, wire: &AgentReportWire, now: chrono::DateTime<Utc>) -> UpdateTaskState {
    let stored = existing.map(|a| a.update_task.clone()).unwrap_or_default();

    let Some(reported_time) = wire.last_update_task_execution_time else {
        return stored;
    };
    let is_newer = stored.execution_time.map(|t| reported_time > t).unwrap_or(true);
    if !is_newer {
        return stored;
    }

    let same_release = wire.release_version.as_deref() == Some(wire.update_task_version.as_str());
    let (status, result) = if same_release {
        match wire.update_task_success {
            Some(true) => (Some(UpdateTaskStatus::Success), String::new()),
            _ => (Some(UpdateTaskStatus::Error), wire.update_task_result.clone()),
        }
    } else {
        (Some(UpdateTaskStatus::Error), wire.update_task_result.clone())
    };

    UpdateTaskState {
        version: String::new(),
        execution_time: Some(now),
        status,
        result,
    }
}

/// Strips the leading host label and port from the first bus URL, leaving
/// the bare domain an agent's hostname is expected to live under — e.g.
/// `tls://nats.example.eu:4433` yields `.example.eu`. `None` if the host
/// has no further labels to strip (a bare hostname, an IP literal).
fn derive_domain(bus_url: &str) -> Option<String> {
    let host = bus_url.split("://").last()?.split(':').next()?;
    let mut labels = host.split('.');
    labels.next()?;
    let rest: Vec<&str> = labels.collect();
    if rest.is_empty() {
        None
    } else {
        Some(format!(".{}", rest.join(".")))
    }
}

/// An agent is considered remote when its reported IP doesn't appear
/// among the addresses its fully-qualified hostname (agent hostname plus
/// the bus's own domain) resolves to — a cheap proxy for "not on the same
/// network as the backend" that doesn't require the agent to self-report
/// connectivity type. Any parse/DNS failure yields `false`, per
/// `spec.md` §4.4.1 step 6.
async fn resolve_is_remote(hostname: &str, reported_ip: &str, domain: Option<&str>) -> bool {
    if reported_ip.parse::<std::net::Ipv4Addr>().is_err() {
        return false;
    }
    let fqdn = format!("{hostname}{}", domain.unwrap_or(""));
    let lookup_target = format!("{fqdn}:0");
    match tokio::net::lookup_host(lookup_target).await {
        Ok(addrs) => {
            let resolved: Vec<_> = addrs.map(|a| a.ip().to_string()).collect();
            !resolved.iter().any(|ip| ip == reported_ip)
        }
        Err(e) => {
            warn!(fqdn, error = %e, "could not resolve hostname, assuming not remote");
            false
        }
    }
}

async fn link_release(
    store: &Arc<dyn Store>,
    releases: &Arc<dyn ReleaseDirectory>,
    wire: &AgentReportWire,
    version: &str,
) -> Result<(), IngestError> {
    let key = ReleaseKey {
        kind: RELEASE_KIND.to_owned(),
        version: version.to_owned(),
        channel: wire.release_channel.clone().unwrap_or_default(),
        os: wire.release_os.clone().unwrap_or_default(),
        arch: wire.release_arch.clone().unwrap_or_default(),
    };

    let release = match store.get_release_by_key(&key).await {
        Ok(release) => release,
        Err(e) if e.is_not_found() => fetch_and_create_release(store, releases, &key).await?,
        Err(e) => return Err(e.into()),
    };

    let agent = store.get_agent(&wire.agent_id).await?;
    if agent.release_id != Some(release.id) {
        let mut updated = agent;
        updated.release_id = Some(release.id);
        store.save_agent_info(&updated, &AgentReportBundle::default()).await?;
    }

    Ok(())
}

async fn fetch_and_create_release(
    store: &Arc<dyn Store>,
    releases: &Arc<dyn ReleaseDirectory>,
    key: &ReleaseKey,
) -> Result<Release, IngestError> {
    let descriptor = releases.fetch(&key.version).await?;
    let file = descriptor
        .files
        .into_iter()
        .find(|f| f.os == key.os && f.arch == key.arch)
        .ok_or_else(|| IngestError::Compile(format!("no release file for {}/{}", key.os, key.arch)))?;

    let release = Release {
        id: 0,
        key: key.clone(),
        checksum: file.checksum,
        url: file.file_url,
    };
    let id = store.save_release_info(&release).await?;
    Ok(Release { id, ..release })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scnorion_store::FakeStore;

    #[test]
    fn derive_domain_strips_scheme_host_label_and_port() {
        assert_eq!(derive_domain("tls://nats.example.eu:4433").as_deref(), Some(".example.eu"));
    }

    #[test]
    fn derive_domain_is_none_for_a_bare_host_with_no_further_labels() {
        assert_eq!(derive_domain("tls://nats:4433"), None);
    }

    #[tokio::test]
    async fn remote_detection_matches_when_reported_ip_is_not_resolvable() {
        // `example.invalid` never resolves, so the lookup fails and the
        // fallback `false` applies — exercises the failure branch of
        // `spec.md` §4.4.1 step 6 rather than a live DNS round trip.
        let remote = resolve_is_remote("a1", "203.0.113.9", Some(".example.invalid")).await;
        assert!(!remote);
    }

    #[tokio::test]
    async fn remote_detection_is_false_for_a_non_ipv4_address() {
        let remote = resolve_is_remote("a1", "not-an-ip", Some(".example.eu")).await;
        assert!(!remote);
    }

    struct NullReleaseDirectory;

    #[async_trait::async_trait]
    impl ReleaseDirectory for NullReleaseDirectory {
        async fn fetch(&self, _version: &str) -> crate::error::IngestResult<crate::release_directory::ReleaseDescriptor> {
            Err(IngestError::Compile("no releases endpoint in tests".into()))
        }
    }

    fn seed_default_tenant_and_site(store: &FakeStore, auto_admit_agents: bool) {
        store.seed_tenant(scnorion_core::Tenant {
            id: 1,
            name: "default".into(),
            is_default: true,
        });
        store.seed_site(scnorion_core::Site {
            id: 1,
            tenant_id: 1,
            name: "default".into(),
            is_default: true,
        });
        store.seed_settings(scnorion_core::Settings {
            tenant_id: None,
            auto_admit_agents,
            ..Default::default()
        });
    }

    #[tokio::test]
    async fn new_agent_auto_admits_and_binds_the_default_site() {
        let store = FakeStore::new();
        seed_default_tenant_and_site(&store, true);
        let store: Arc<dyn Store> = Arc::new(store);
        let releases: Arc<dyn ReleaseDirectory> = Arc::new(NullReleaseDirectory);

        let payload = serde_json::to_vec(&serde_json::json!({
            "agent_id": "A1",
            "hostname": "a1",
            "ip": "203.0.113.9",
            "mac": "00:11:22:33:44:55",
            "os": "windows",
            "sftp_service": false,
            "remote_assistance": false,
            "is_wayland": false,
            "has_rustdesk": false,
            "debug_mode": false,
            "enabled": true,
            "endpoint_type": "workstation",
        }))
        .unwrap();

        handle_inner(&store, &releases, "tls://nats.example.eu:4433", &payload)
            .await
            .unwrap();

        let agent = store.get_agent("A1").await.unwrap();
        assert_eq!(agent.admission_status, AdmissionStatus::Enabled);
        assert_eq!(agent.nickname, "a1");
        let default_site = store.get_default_site(store.get_default_tenant().await.unwrap().id).await.unwrap();
        assert_eq!(agent.site_id, Some(default_site.id));
    }

    #[tokio::test]
    async fn waiting_for_admission_never_reverts_from_a_later_report() {
        let store = FakeStore::new();
        seed_default_tenant_and_site(&store, false);
        let store: Arc<dyn Store> = Arc::new(store);
        let releases: Arc<dyn ReleaseDirectory> = Arc::new(NullReleaseDirectory);

        let mut report = serde_json::json!({
            "agent_id": "A2",
            "hostname": "a2",
            "ip": "203.0.113.10",
            "mac": "00:11:22:33:44:56",
            "os": "windows",
            "sftp_service": false,
            "remote_assistance": false,
            "is_wayland": false,
            "has_rustdesk": false,
            "debug_mode": false,
            "enabled": false,
            "endpoint_type": "workstation",
        });
        let payload = serde_json::to_vec(&report).unwrap();
        handle_inner(&store, &releases, "tls://nats.example.eu:4433", &payload).await.unwrap();
        assert_eq!(store.get_agent("A2").await.unwrap().admission_status, AdmissionStatus::WaitingForAdmission);

        report["enabled"] = serde_json::json!(true);
        let payload = serde_json::to_vec(&report).unwrap();
        handle_inner(&store, &releases, "tls://nats.example.eu:4433", &payload).await.unwrap();
        assert_eq!(store.get_agent("A2").await.unwrap().admission_status, AdmissionStatus::WaitingForAdmission);
    }

    #[tokio::test]
    async fn a_later_report_never_clobbers_the_user_owned_endpoint_type() {
        let store = FakeStore::new();
        seed_default_tenant_and_site(&store, true);
        let store: Arc<dyn Store> = Arc::new(store);
        let releases: Arc<dyn ReleaseDirectory> = Arc::new(NullReleaseDirectory);

        let mut report = serde_json::json!({
            "agent_id": "A3",
            "hostname": "a3",
            "ip": "203.0.113.11",
            "mac": "00:11:22:33:44:57",
            "os": "windows",
            "sftp_service": false,
            "remote_assistance": false,
            "is_wayland": false,
            "has_rustdesk": false,
            "debug_mode": false,
            "enabled": true,
            "endpoint_type": "workstation",
        });
        let payload = serde_json::to_vec(&report).unwrap();
        handle_inner(&store, &releases, "tls://nats.example.eu:4433", &payload).await.unwrap();

        // An administrator edits the endpoint type out-of-band.
        let mut agent = store.get_agent("A3").await.unwrap();
        agent.endpoint_type = "server".into();
        store.save_agent_info(&agent, &AgentReportBundle::default()).await.unwrap();

        // The agent's own next report still says "workstation" — it must
        // not overwrite the administrator's edit.
        report["agent_id"] = serde_json::json!("A3");
        let payload = serde_json::to_vec(&report).unwrap();
        handle_inner(&store, &releases, "tls://nats.example.eu:4433", &payload).await.unwrap();

        assert_eq!(store.get_agent("A3").await.unwrap().endpoint_type, "server");
    }
}
