//! In-process bus used by the worker crates' test suites. Publishing to a
//! subject fans out round-robin across whichever queue-group subscribers
//! are currently registered for it, mimicking NATS queue-group semantics
//! closely enough to exercise handler logic without a live server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::BusResult;
use crate::message::IncomingMessage;
use crate::traits::{Bus, Subscription};

struct Group {
    senders: Vec<mpsc::UnboundedSender<(Bytes, Option<String>)>>,
    next: AtomicUsize,
}

#[derive(Default)]
struct Inner {
    subjects: Mutex<HashMap<String, Group>>,
    broadcasts: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<(Bytes, Option<String>)>>>>,
}

/// Cheap to clone: every clone shares the same subject table, so a message
/// handed out by one handle can `respond`/`nak_with_delay` back through
/// the same routing the test set up.
#[derive(Clone, Default)]
pub struct FakeBus {
    inner: Arc<Inner>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bus(&self) -> Arc<dyn Bus> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl Bus for FakeBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> BusResult<()> {
        let mut guard = self.inner.subjects.lock().unwrap();
        if let Some(group) = guard.get_mut(subject) {
            if !group.senders.is_empty() {
                let idx = group.next.fetch_add(1, Ordering::Relaxed) % group.senders.len();
                let _ = group.senders[idx].send((payload.clone(), None));
            }
        }
        drop(guard);

        let broadcasts = self.inner.broadcasts.lock().unwrap();
        if let Some(subscribers) = broadcasts.get(subject) {
            for sender in subscribers {
                let _ = sender.send((payload.clone(), None));
            }
        }
        Ok(())
    }

    async fn queue_subscribe(&self, subject: &str, _queue: &str) -> BusResult<Box<dyn Subscription>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut guard = self.inner.subjects.lock().unwrap();
        guard
            .entry(subject.to_owned())
            .or_insert_with(|| Group {
                senders: Vec::new(),
                next: AtomicUsize::new(0),
            })
            .senders
            .push(tx);
        drop(guard);
        Ok(Box::new(FakeSubscription {
            subject: subject.to_owned(),
            rx,
            bus: self.clone(),
        }))
    }

    async fn subscribe(&self, subject: &str) -> BusResult<Box<dyn Subscription>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut guard = self.inner.broadcasts.lock().unwrap();
        guard.entry(subject.to_owned()).or_default().push(tx);
        drop(guard);
        Ok(Box::new(FakeSubscription {
            subject: subject.to_owned(),
            rx,
            bus: self.clone(),
        }))
    }
}

struct FakeSubscription {
    subject: String,
    rx: mpsc::UnboundedReceiver<(Bytes, Option<String>)>,
    bus: FakeBus,
}

#[async_trait]
impl Subscription for FakeSubscription {
    async fn next(&mut self) -> Option<IncomingMessage> {
        let (payload, reply_to) = self.rx.recv().await?;
        Some(IncomingMessage::new(
            self.subject.clone(),
            reply_to,
            payload,
            self.bus.as_bus(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_round_robins_across_queue_group_members() {
        let bus = FakeBus::new();
        let mut sub_a = bus.queue_subscribe("agent.report", "ingest").await.unwrap();
        let mut sub_b = bus.queue_subscribe("agent.report", "ingest").await.unwrap();

        bus.publish("agent.report", Bytes::from_static(b"one")).await.unwrap();
        bus.publish("agent.report", Bytes::from_static(b"two")).await.unwrap();

        let first = sub_a.next().await.unwrap();
        let second = sub_b.next().await.unwrap();
        assert_eq!(first.payload, Bytes::from_static(b"one"));
        assert_eq!(second.payload, Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn nak_with_delay_republishes_onto_the_same_bus() {
        let bus = FakeBus::new();
        let mut sub = bus.queue_subscribe("deployresult", "ingest").await.unwrap();

        bus.publish("deployresult", Bytes::from_static(b"retry-me"))
            .await
            .unwrap();
        let msg = sub.next().await.unwrap();
        msg.nak_with_delay(std::time::Duration::from_millis(10))
            .await
            .unwrap();

        let redelivered = sub.next().await.unwrap();
        assert_eq!(redelivered.payload, Bytes::from_static(b"retry-me"));
    }
}
