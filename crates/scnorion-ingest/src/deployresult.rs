//! Deployment state machine over `(agent, package)`, fed by three
//! subjects (`spec.md` §4.4.2):
//!
//! - `deployresult` — the agent reporting the outcome of a deployment it
//!   decided on itself (`by_profile = false`).
//! - `wingetcfg.deploy` — the same state machine, but profile-driven
//!   (`by_profile = true`).
//! - `wingetcfg.exclude` — a manual exclusion of a profile-installed
//!   package, independent of `action`.

use std::sync::Arc;

use chrono::Utc;
use scnorion_core::{Deployment, DeployAction};
use scnorion_store::Store;
use tracing::info;

use crate::error::IngestResult;
use crate::wire::{DeployActionWireEnvelope, ExcludeWireEnvelope};

pub const RESULT_SUBJECT: &str = "deployresult";
pub const DEPLOY_SUBJECT: &str = "wingetcfg.deploy";
pub const EXCLUDE_SUBJECT: &str = "wingetcfg.exclude";
pub const QUEUE: &str = "scnorion-agents";

pub async fn handle_result(store: &Arc<dyn Store>, payload: &[u8]) -> IngestResult<()> {
    apply(store, payload, false).await
}

pub async fn handle_deploy(store: &Arc<dyn Store>, payload: &[u8]) -> IngestResult<()> {
    apply(store, payload, true).await
}

async fn apply(store: &Arc<dyn Store>, payload: &[u8], by_profile: bool) -> IngestResult<()> {
    let wire: DeployActionWireEnvelope = serde_json::from_slice(payload)?;
    let now = Utc::now();
    let existing = store.get_deployment(&wire.agent_id, &wire.package_id).await.ok();

    match wire.action {
        DeployAction::Install => {
            let deployment = Deployment {
                agent_id: wire.agent_id.clone(),
                package_id: wire.package_id.clone(),
                installed_at: existing.as_ref().map(|d| d.installed_at).unwrap_or(now),
                updated_at: now,
                failed: wire.failed,
                by_profile: by_profile || existing.as_ref().map(|d| d.by_profile).unwrap_or(false),
            };
            store.upsert_deployment(&deployment).await?;
        }
        DeployAction::Update => {
            if let Some(mut deployment) = existing {
                deployment.updated_at = now;
                if !by_profile {
                    deployment.failed = wire.failed;
                }
                store.upsert_deployment(&deployment).await?;
            } else if !by_profile {
                let deployment = Deployment {
                    agent_id: wire.agent_id.clone(),
                    package_id: wire.package_id.clone(),
                    installed_at: now,
                    updated_at: now,
                    failed: wire.failed,
                    by_profile: false,
                };
                store.upsert_deployment(&deployment).await?;
            }
        }
        DeployAction::Uninstall => {
            if wire.failed {
                if let Some(mut deployment) = existing {
                    deployment.failed = true;
                    deployment.updated_at = now;
                    store.upsert_deployment(&deployment).await?;
                }
            } else {
                let deleted = store.delete_deployment(&wire.agent_id, &wire.package_id).await?;
                if deleted.map(|d| d.by_profile).unwrap_or(false) {
                    store
                        .upsert_winget_exclusion(&wire.agent_id, &wire.package_id)
                        .await?;
                }
            }
        }
    }

    info!(
        agent_id = %wire.agent_id,
        package_id = %wire.package_id,
        action = ?wire.action,
        by_profile,
        failed = wire.failed,
        "applied deployment state transition"
    );
    Ok(())
}

pub async fn handle_exclude(store: &Arc<dyn Store>, payload: &[u8]) -> IngestResult<()> {
    let wire: ExcludeWireEnvelope = serde_json::from_slice(payload)?;
    store.delete_deployment(&wire.agent_id, &wire.package_id).await?;
    store
        .upsert_winget_exclusion(&wire.agent_id, &wire.package_id)
        .await?;
    info!(agent_id = %wire.agent_id, package_id = %wire.package_id, "excluded package from profile-driven deployment");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scnorion_store::FakeStore;

    fn install_payload(agent: &str, package: &str, by_profile_hint: bool) -> Vec<u8> {
        let _ = by_profile_hint;
        serde_json::to_vec(&serde_json::json!({
            "agent_id": agent,
            "package_id": package,
            "action": "install",
            "failed": false,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn clean_uninstall_of_a_profile_package_creates_an_exclusion() {
        let store: Arc<dyn Store> = Arc::new(FakeStore::new());
        store
            .upsert_deployment(&Deployment {
                agent_id: "A1".into(),
                package_id: "7zip.7zip".into(),
                installed_at: Utc::now(),
                updated_at: Utc::now(),
                failed: false,
                by_profile: true,
            })
            .await
            .unwrap();

        let payload = serde_json::to_vec(&serde_json::json!({
            "agent_id": "A1",
            "package_id": "7zip.7zip",
            "action": "uninstall",
            "failed": false,
        }))
        .unwrap();
        handle_result(&store, &payload).await.unwrap();

        assert!(store.get_deployment("A1", "7zip.7zip").await.is_err());
        let exclusions = store.get_excluded_winget_packages("A1").await.unwrap();
        assert_eq!(exclusions.len(), 1);
    }

    #[tokio::test]
    async fn failed_uninstall_keeps_the_record_and_creates_no_exclusion() {
        let store: Arc<dyn Store> = Arc::new(FakeStore::new());
        handle_deploy(&store, &install_payload("A1", "7zip.7zip", true)).await.unwrap();

        let payload = serde_json::to_vec(&serde_json::json!({
            "agent_id": "A1",
            "package_id": "7zip.7zip",
            "action": "uninstall",
            "failed": true,
        }))
        .unwrap();
        handle_deploy(&store, &payload).await.unwrap();

        let deployment = store.get_deployment("A1", "7zip.7zip").await.unwrap();
        assert!(deployment.failed);
        assert!(store.get_excluded_winget_packages("A1").await.unwrap().is_empty());
    }
}
