//! Spawns one subscription loop per bus subject.
//!
//! The supervisor hands back a single `WorkerHandles`; each role then
//! subscribes to however many subjects it owns (`spec.md` §6's subject
//! table) rather than funnelling everything through one dispatch loop, so
//! a panic or a slow handler in one subject's task never blocks another's.

/// Spawns a task that queue-subscribes to `$subject` under `$queue` and
/// runs `$body` for every message until the shared shutdown signal fires.
/// `$body` receives ownership of a `mut` `IncomingMessage` bound to the
/// name given as `$msg`, and may use `$store`/`$bus`/etc. captured from
/// the surrounding scope by reference.
use scnorion_bus::{Bus, Subscription};

macro_rules! spawn_queue_task {
    ($bus:expr, $shutdown:expr, $subject:expr, $queue:expr, |$msg:ident| $body:expr) => {{
        let bus = ::std::sync::Arc::clone(&$bus);
        let mut shutdown = $shutdown.clone();
        ::tokio::spawn(async move {
            let mut sub = match bus.queue_subscribe($subject, $queue).await {
                Ok(sub) => sub,
                Err(e) => {
                    ::tracing::error!(subject = $subject, error = %e, "could not subscribe");
                    return;
                }
            };
            ::tracing::info!(subject = $subject, queue = $queue, "subscribed");
            loop {
                ::tokio::select! {
                    next = sub.next() => {
                        match next {
                            Some(mut $msg) => $body,
                            None => break,
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }};
}

pub(crate) use spawn_queue_task;
