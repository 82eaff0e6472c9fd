//! Agents worker role (`spec.md` §6, queue group `scnorion-agents`):
//! report ingestion, deployment state, profile compilation, agent config
//! and the release-info ping, each on its own subscription task.

use std::sync::Arc;
use std::time::Duration;

use scnorion_ingest::{agentconfig, application_report, deployresult, profiles, report};
use scnorion_ingest::{HttpReleaseDirectory, ReleaseDirectory};
use scnorion_supervisor::{Supervisor, WorkerConfig, WorkerHandles};
use tracing::error;

use crate::subscribe::spawn_queue_task;

const NAK_DELAY: Duration = Duration::from_secs(5 * 60);

pub async fn start(config: WorkerConfig) {
    WorkerConfig::load_dotenv();
    scnorion_supervisor::init_tracing(&config.log_level);

    let bus_url = config.nats_servers.first().cloned().unwrap_or_default();
    let mut supervisor = Supervisor::new(config);
    let WorkerHandles { store, bus, shutdown } = supervisor.start().await;
    let releases: Arc<dyn ReleaseDirectory> = Arc::new(HttpReleaseDirectory::new());

    let report_task = {
        let store = store.clone();
        let releases = releases.clone();
        let bus_url = bus_url.clone();
        spawn_queue_task!(bus, shutdown, report::SUBJECT, report::QUEUE, |msg| {
            report::handle(&store, &releases, &bus_url, &mut msg).await;
        })
    };

    let deployresult_task = {
        let store = store.clone();
        spawn_queue_task!(bus, shutdown, deployresult::RESULT_SUBJECT, deployresult::QUEUE, |msg| {
            match deployresult::handle_result(&store, &msg.payload).await {
                Ok(()) => msg.ack(),
                Err(e) => {
                    error!(error = %e, "could not apply deployresult");
                    let _ = msg.nak_with_delay(NAK_DELAY).await;
                }
            }
        })
    };

    let wingetcfg_deploy_task = {
        let store = store.clone();
        spawn_queue_task!(bus, shutdown, deployresult::DEPLOY_SUBJECT, deployresult::QUEUE, |msg| {
            match deployresult::handle_deploy(&store, &msg.payload).await {
                Ok(()) => msg.ack(),
                Err(e) => {
                    error!(error = %e, "could not apply wingetcfg.deploy");
                    let _ = msg.nak_with_delay(NAK_DELAY).await;
                }
            }
        })
    };

    let wingetcfg_exclude_task = {
        let store = store.clone();
        spawn_queue_task!(bus, shutdown, deployresult::EXCLUDE_SUBJECT, deployresult::QUEUE, |msg| {
            match deployresult::handle_exclude(&store, &msg.payload).await {
                Ok(()) => msg.ack(),
                Err(e) => {
                    error!(error = %e, "could not apply wingetcfg.exclude");
                    let _ = msg.nak_with_delay(NAK_DELAY).await;
                }
            }
        })
    };

    let wingetcfg_report_task = {
        let store = store.clone();
        spawn_queue_task!(bus, shutdown, application_report::SUBJECT, application_report::QUEUE, |msg| {
            match application_report::handle(&store, &msg.payload).await {
                Ok(()) => msg.ack(),
                Err(e) => {
                    error!(error = %e, "could not record application report");
                    let _ = msg.nak_with_delay(NAK_DELAY).await;
                }
            }
        })
    };

    let agentconfig_task = {
        let store = store.clone();
        spawn_queue_task!(bus, shutdown, agentconfig::SUBJECT, agentconfig::QUEUE, |msg| {
            let response = agentconfig::handle(&store, &msg.payload).await;
            if let Ok(payload) = serde_json::to_vec(&response) {
                let _ = msg.respond(payload.into()).await;
            }
            msg.ack();
        })
    };

    let wingetcfg_profiles_task = {
        let store = store.clone();
        spawn_queue_task!(bus, shutdown, profiles::WINGETCFG_SUBJECT, profiles::QUEUE, |msg| {
            match profiles::handle_windows(&store, &msg.payload).await {
                Ok(yaml) => {
                    let _ = msg.respond(yaml.into_bytes().into()).await;
                    msg.ack();
                }
                Err(e) => {
                    error!(error = %e, "could not compile windows profiles");
                    let _ = msg.nak_with_delay(NAK_DELAY).await;
                }
            }
        })
    };

    let ansiblecfg_profiles_task = {
        let store = store.clone();
        spawn_queue_task!(bus, shutdown, profiles::ANSIBLECFG_SUBJECT, profiles::QUEUE, |msg| {
            match profiles::handle_unix(&store, &msg.payload).await {
                Ok(yaml) => {
                    let _ = msg.respond(yaml.into_bytes().into()).await;
                    msg.ack();
                }
                Err(e) => {
                    error!(error = %e, "could not compile unix profiles");
                    let _ = msg.nak_with_delay(NAK_DELAY).await;
                }
            }
        })
    };

    let ping_task = spawn_queue_task!(bus, shutdown, scnorion_ingest::PING_SUBJECT, report::QUEUE, |msg| {
        scnorion_supervisor::ping::handle(&mut msg).await;
    });

    tracing::info!("agents worker is ready");
    let _ = tokio::join!(
        report_task,
        deployresult_task,
        wingetcfg_deploy_task,
        wingetcfg_exclude_task,
        wingetcfg_report_task,
        agentconfig_task,
        wingetcfg_profiles_task,
        ansiblecfg_profiles_task,
        ping_task,
    );

    supervisor.begin_draining();
    supervisor.stop();
    tracing::info!("agents worker has been shutdown");
}
