//! The worker's `SMTPSettings` cache (`spec.md` §5): read by every send
//! handler, rewritten only by `reload_settings`. An
//! `arc_swap::ArcSwapOption` gives readers/writer last-write-wins
//! semantics without a lock readers have to contend for, the same shape
//! `aof-runtime` uses for its own read-mostly/write-rarely state.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use scnorion_core::Settings;
use scnorion_store::Store;
use tracing::{info, warn};

pub struct SettingsCache {
    current: ArcSwapOption<Settings>,
}

impl SettingsCache {
    pub fn empty() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    pub fn get(&self) -> Option<Arc<Settings>> {
        self.current.load_full()
    }

    /// Reloads the global SMTP settings row. A not-found row is not an
    /// error — the worker simply has nothing to send with yet, matching
    /// `SubscribeToNotificationWorkerQueues`'s `ent.IsNotFound` branch.
    pub async fn reload(&self, store: &Arc<dyn Store>) {
        match store.get_smtp_settings(None).await {
            Ok(settings) => {
                self.current.store(Some(Arc::new(settings)));
                info!("SMTP settings have been reloaded");
            }
            Err(e) if e.is_not_found() => {
                self.current.store(None);
                info!("no SMTP settings found");
            }
            Err(e) => warn!(error = %e, "could not get settings from DB"),
        }
    }
}
