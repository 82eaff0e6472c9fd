//! `certificates.revoke` handler. Per `spec.md` §9's Open Question
//! ("`RevokeCertificateHandler` only acks and performs no revocation...
//! intent unclear: preserved as-is"), this subject is kept ack-only;
//! actual revocation-on-supersession happens inline during agent
//! re-issuance (see [`crate::agent_certificate`]).

use scnorion_bus::IncomingMessage;

pub const SUBJECT: &str = "certificates.revoke";
pub const QUEUE: &str = "scnorion-cert-manager";

pub async fn handle(msg: &mut IncomingMessage) {
    msg.ack();
}
