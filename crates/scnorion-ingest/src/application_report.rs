//! Application-report handler (`spec.md` §4.4.5, subject
//! `wingetcfg.report`): an agent reports whether a profile-driven
//! deployment succeeded, independent of the package-level deployment
//! state machine in [`crate::deployresult`].

use std::sync::Arc;

use scnorion_core::ProfileIssue;
use scnorion_store::Store;
use tracing::info;

use crate::error::IngestResult;
use crate::wire::WingetCfgReportWire;

pub const SUBJECT: &str = "wingetcfg.report";
pub const QUEUE: &str = "scnorion-agents";

pub async fn handle(store: &Arc<dyn Store>, payload: &[u8]) -> IngestResult<()> {
    let wire: WingetCfgReportWire = serde_json::from_slice(payload)?;

    if wire.success {
        store.delete_profile_issue(wire.profile_id, &wire.agent_id).await?;
    } else {
        store
            .upsert_profile_issue(&ProfileIssue {
                profile_id: wire.profile_id,
                agent_id: wire.agent_id.clone(),
                message: wire.error_text.clone(),
            })
            .await?;
    }

    info!(profile_id = wire.profile_id, agent_id = %wire.agent_id, success = wire.success, "recorded profile application outcome");
    Ok(())
}
