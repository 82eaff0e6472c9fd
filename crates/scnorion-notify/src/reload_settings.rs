//! `notification.reload_settings` (`spec.md` §4.6, §6): a plain
//! (non-queue-group) subscribe, so every notification-worker replica
//! reloads its own cache independently, matching
//! `SubscribeToNotificationWorkerQueues`'s use of `Subscribe` (not
//! `QueueSubscribe`) for this one subject.

use std::sync::Arc;

use scnorion_bus::IncomingMessage;
use scnorion_store::Store;

use crate::settings_cache::SettingsCache;

pub const SUBJECT: &str = "notification.reload_settings";

pub async fn handle(store: &Arc<dyn Store>, cache: &Arc<SettingsCache>, msg: &mut IncomingMessage) {
    cache.reload(store).await;
    msg.ack();
}
