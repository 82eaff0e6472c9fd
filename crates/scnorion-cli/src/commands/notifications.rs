//! Notifications worker role (`spec.md` §4.6, §6, queue group
//! `scnorion-notification`): templated mail dispatch plus the
//! broadcast-subscribed settings cache reload.

use std::sync::Arc;

use scnorion_bus::{Bus, Subscription};
use scnorion_notify::{reload_settings, send, template, SettingsCache};
use scnorion_supervisor::{Supervisor, WorkerConfig, WorkerHandles};

use crate::subscribe::spawn_queue_task;

pub async fn start(config: WorkerConfig) {
    WorkerConfig::load_dotenv();
    scnorion_supervisor::init_tracing(&config.log_level);

    let mut supervisor = Supervisor::new(config);
    let WorkerHandles { store, bus, shutdown } = supervisor.start().await;

    let cache = Arc::new(SettingsCache::empty());
    cache.reload(&store).await;
    let hb = Arc::new(template::registry());

    let confirm_email_task = {
        let cache = cache.clone();
        let hb = hb.clone();
        spawn_queue_task!(bus, shutdown, send::CONFIRM_EMAIL_SUBJECT, send::QUEUE, |msg| {
            send::handle(&cache, &hb, &mut msg).await;
        })
    };

    let send_certificate_task = {
        let cache = cache.clone();
        let hb = hb.clone();
        spawn_queue_task!(bus, shutdown, send::SEND_CERTIFICATE_SUBJECT, send::QUEUE, |msg| {
            send::handle(&cache, &hb, &mut msg).await;
        })
    };

    // Non-queue-group subscribe: every replica reloads its own cache,
    // matching `reload_settings`'s doc comment.
    let reload_task = {
        let bus_for_sub = bus.clone();
        let store = store.clone();
        let cache = cache.clone();
        let mut shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut sub = match bus_for_sub.subscribe(reload_settings::SUBJECT).await {
                Ok(sub) => sub,
                Err(e) => {
                    tracing::error!(subject = reload_settings::SUBJECT, error = %e, "could not subscribe");
                    return;
                }
            };
            loop {
                tokio::select! {
                    next = sub.next() => {
                        match next {
                            Some(mut msg) => reload_settings::handle(&store, &cache, &mut msg).await,
                            None => break,
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    };

    let ping_task = spawn_queue_task!(bus, shutdown, scnorion_notify::PING_SUBJECT, send::QUEUE, |msg| {
        scnorion_supervisor::ping::handle(&mut msg).await;
    });

    tracing::info!("notifications worker is ready");
    let _ = tokio::join!(confirm_email_task, send_certificate_task, reload_task, ping_task);

    supervisor.begin_draining();
    supervisor.stop();
    tracing::info!("notifications worker has been shutdown");
}
