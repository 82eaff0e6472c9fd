//! Agent-config request handler (`spec.md` §4.4.4): an agent asks what
//! cadence and connectivity flags it should be running with.

use std::sync::Arc;

use scnorion_store::Store;
use tracing::warn;

use crate::wire::{AgentConfigRequestWire, AgentConfigResponseWire};

pub const SUBJECT: &str = "agentconfig";
pub const QUEUE: &str = "scnorion-agents";

/// Assembles the response. `ok` is true iff every lookup succeeded; SFTP
/// and remote-assistance come from the agent row when known (and are
/// written back so the agent-side toggle propagates to storage), else
/// from settings.
pub async fn handle(store: &Arc<dyn Store>, payload: &[u8]) -> AgentConfigResponseWire {
    let request: Result<AgentConfigRequestWire, _> = serde_json::from_slice(payload);
    let request = match request {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "malformed agentconfig request");
            return AgentConfigResponseWire {
                ok: false,
                report_frequency_minutes: 0,
                profile_frequency_minutes: 0,
                sftp_service: false,
                remote_assistance: false,
            };
        }
    };

    let agent_id = request.agent_id();
    let tenant_id = store.get_tenant_from_agent_id(agent_id, "").await.ok();

    let settings = store.get_settings(tenant_id).await;
    let Ok(settings) = settings else {
        return AgentConfigResponseWire {
            ok: false,
            report_frequency_minutes: 0,
            profile_frequency_minutes: 0,
            sftp_service: false,
            remote_assistance: false,
        };
    };

    let agent = store.get_agent(agent_id).await.ok();
    let (sftp_service, remote_assistance) = match &agent {
        Some(agent) => (agent.sftp_service, agent.remote_assistance),
        None => (!settings.sftp_disabled, !settings.remote_assistance_disabled),
    };

    if agent.is_some() {
        if let Err(e) = store
            .set_agent_connectivity_flags(agent_id, sftp_service, remote_assistance)
            .await
        {
            warn!(error = %e, agent_id, "could not write back connectivity flags");
        }
    }

    AgentConfigResponseWire {
        ok: true,
        report_frequency_minutes: settings.report_frequency_minutes,
        profile_frequency_minutes: settings.profile_frequency_minutes,
        sftp_service,
        remote_assistance,
    }
}
