use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{BusError, BusResult};
use crate::traits::Bus;

/// A message delivered to a queue-group subscriber.
///
/// Core NATS has no built-in redelivery, so the "at least once" guarantee
/// in the system's worker roles is implemented at this layer: a handler
/// that fails calls `nak_with_delay`, which republishes the same payload
/// to the same subject after the delay instead of dropping it. A handler
/// that succeeds calls `ack`, which is a no-op on the wire but documents
/// intent and lets tests assert a message was actually handled.
pub struct IncomingMessage {
    pub subject: String,
    pub reply_to: Option<String>,
    pub payload: Bytes,
    pub(crate) bus: Arc<dyn Bus>,
    pub(crate) acked: bool,
}

impl IncomingMessage {
    pub fn new(subject: String, reply_to: Option<String>, payload: Bytes, bus: Arc<dyn Bus>) -> Self {
        Self {
            subject,
            reply_to,
            payload,
            bus,
            acked: false,
        }
    }

    pub fn ack(&mut self) {
        self.acked = true;
    }

    pub async fn nak_with_delay(&self, delay: Duration) -> BusResult<()> {
        let subject = self.subject.clone();
        let payload = self.payload.clone();
        let bus = self.bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = bus.publish(&subject, payload).await;
        });
        Ok(())
    }

    pub async fn respond(&self, payload: Bytes) -> BusResult<()> {
        match &self.reply_to {
            Some(reply) => self.bus.publish(reply, payload).await,
            None => Err(BusError::NoReplySubject),
        }
    }
}
