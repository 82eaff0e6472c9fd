//! `certificates.agent.*` handler (`spec.md` §4.5): issues a server-auth
//! certificate for one agent and publishes it directly to that agent.
//!
//! Per `spec.md` §9's REDESIGN FLAG, the wildcard segment in
//! `certificates.agent.*` is never trusted for routing — the agent id in
//! the request body is authoritative, matching
//! `original_source/internal/common/cert-manager.go`'s use of
//! `cr.AgentId` (not the subject tail) to build the publish subject.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use scnorion_bus::{Bus, IncomingMessage};
use scnorion_core::{Certificate, CertType, RevocationReason};
use scnorion_store::Store;
use tracing::{error, info, warn};

use crate::error::CaResult;
use crate::material::{CaMaterial, SubjectFields, Validity};
use crate::wire::{AgentCertificateDataWire, AgentCertificateRequestWire};

pub const SUBJECT: &str = "certificates.agent.*";
pub const QUEUE: &str = "scnorion-cert-manager";

/// Unparseable payloads ack-and-drop for the agent subject (`spec.md`
/// §4.5) — there's no admin to notify, unlike the user-certificate path.
pub async fn handle(store: &Arc<dyn Store>, bus: &Arc<dyn Bus>, material: &Arc<CaMaterial>, msg: &mut IncomingMessage) {
    let request: Result<AgentCertificateRequestWire, _> = serde_json::from_slice(&msg.payload);
    let request = match request {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "could not unmarshal new agent certificate request");
            msg.ack();
            return;
        }
    };

    match issue_and_publish(store, bus, material, &request).await {
        Ok(()) => msg.ack(),
        Err(e) => {
            error!(error = %e, agent_id = %request.agent_id, "could not issue agent certificate");
            let _ = msg.nak_with_delay(Duration::from_secs(10 * 60)).await;
        }
    }
}

async fn issue_and_publish(
    store: &Arc<dyn Store>,
    bus: &Arc<dyn Bus>,
    material: &Arc<CaMaterial>,
    request: &AgentCertificateRequestWire,
) -> CaResult<()> {
    let subject = SubjectFields {
        organization: request.subject.organization.clone(),
        country: request.subject.country.clone(),
        province: request.subject.province.clone(),
        locality: request.subject.locality.clone(),
        street: request.subject.address.clone(),
        postal_code: request.subject.postal_code.clone(),
    };
    let validity = Validity {
        years: request.years_valid,
        months: request.months_valid,
        days: request.days_valid,
    };

    let issued = material.issue_agent_certificate(&request.dns_name, &subject, validity)?;

    // Revoke whatever previously held this description before publishing
    // the new certificate, per `spec.md` §4.5 ("Before publishing, also
    // revoke any prior Certificate with the same description") — the
    // opposite order from the source system, which revokes after.
    let description = format!("{} agent certificate", request.dns_name);
    if let Err(e) = store
        .revoke_certificates_by_description(&description, RevocationReason::Superseded)
        .await
    {
        warn!(error = %e, description = %description, "could not revoke previous agent certificate");
    }

    let cert_der = issued.x509.to_der()?;
    let key_der = issued.private_key.rsa()?.private_key_to_der()?;
    let envelope = AgentCertificateDataWire {
        cert_bytes: BASE64.encode(cert_der),
        private_key_bytes: BASE64.encode(key_der),
    };

    let publish_subject = format!("agent.certificate.{}", request.agent_id);
    bus.publish(&publish_subject, serde_json::to_vec(&envelope)?.into())
        .await?;

    store
        .save_certificate(&Certificate {
            id: 0,
            serial: issued.serial,
            cert_type: CertType::Agent,
            description,
            user_id: None,
            not_before: chrono::Utc::now(),
            not_after: issued.not_after,
        })
        .await?;

    info!(agent_id = %request.agent_id, serial = issued.serial, "issued agent certificate");
    Ok(())
}
