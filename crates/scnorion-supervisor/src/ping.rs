//! Health-check subjects (`ping.agentworker`, `ping.certmanagerworker`,
//! `ping.notificationworker`, `spec.md` §6): every role replies with an
//! empty payload so the CLI's `healthcheck` command can confirm a worker
//! is subscribed and responsive without touching the store or the CA.

use bytes::Bytes;
use scnorion_bus::IncomingMessage;

pub async fn handle(msg: &mut IncomingMessage) {
    msg.ack();
    let _ = msg.respond(Bytes::new()).await;
}
