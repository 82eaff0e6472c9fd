use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BusResult;
use crate::message::IncomingMessage;

/// A handle to a live queue subscription. Each call to `next` yields the
/// next message delivered to this queue group member; with N subscribers
/// in the same group, each message goes to exactly one of them.
#[async_trait]
pub trait Subscription: Send {
    async fn next(&mut self) -> Option<IncomingMessage>;
}

/// Transport-agnostic publish/subscribe bus. Implementations must be safe
/// to share behind an `Arc` across every handler task in a worker process.
#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, subject: &str, payload: Bytes) -> BusResult<()>;

    /// Subscribe to `subject` as a member of `queue`. NATS load-balances
    /// delivery across every subscriber sharing the same queue name, which
    /// is how a worker role scales to multiple replicas without duplicate
    /// processing.
    async fn queue_subscribe(&self, subject: &str, queue: &str) -> BusResult<Box<dyn Subscription>>;

    /// Subscribe to `subject` without a queue group: every subscriber gets
    /// every message, used only for `notification.reload_settings` so
    /// each worker replica refreshes its own cache independently.
    async fn subscribe(&self, subject: &str) -> BusResult<Box<dyn Subscription>>;
}
