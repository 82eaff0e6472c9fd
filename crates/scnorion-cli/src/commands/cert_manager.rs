//! Cert-Manager worker role (`spec.md` §4.5, §6, queue group
//! `scnorion-cert-manager`): user/agent certificate issuance, revocation,
//! and the periodic `config.ini` regeneration job.

use std::sync::Arc;

use scnorion_ca::{agent_certificate, revoke, user_certificate, CaMaterial};
use scnorion_supervisor::{CaConfigSnapshot, CertManagerConfig, Supervisor, WorkerHandles, PIDFILE_NAME};

use crate::subscribe::spawn_queue_task;

pub async fn start(config: CertManagerConfig) {
    scnorion_supervisor::WorkerConfig::load_dotenv();
    scnorion_supervisor::init_tracing(&config.worker.log_level);

    let ca_cert_pem = match std::fs::read(&config.worker.cacert) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, path = %config.worker.cacert.display(), "could not read CA certificate");
            std::process::exit(1);
        }
    };
    let ca_key_pem = match std::fs::read(&config.cakey) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, path = %config.cakey.display(), "could not read CA private key");
            std::process::exit(1);
        }
    };
    let material = match CaMaterial::load(&ca_cert_pem, &ca_key_pem, config.ocsp.clone()) {
        Ok(material) => Arc::new(material),
        Err(e) => {
            tracing::error!(error = %e, "could not load CA material");
            std::process::exit(1);
        }
    };

    if let Some(dir) = config.config_dir.clone() {
        let snapshot = CaConfigSnapshot {
            nats_url: config.worker.nats_url(),
            database_host_masked: mask_host(&config.worker.dburl),
            pidfile: PIDFILE_NAME.to_owned(),
        };
        tokio::spawn(scnorion_supervisor::run_config_regeneration_job(dir, snapshot));
    }

    let mut supervisor = Supervisor::new(config.worker.clone());
    let WorkerHandles { store, bus, shutdown } = supervisor.start().await;

    let user_task = {
        let store = store.clone();
        let bus_handle = bus.clone();
        let material = material.clone();
        spawn_queue_task!(bus, shutdown, user_certificate::SUBJECT, user_certificate::QUEUE, |msg| {
            user_certificate::handle(&store, &bus_handle, &material, &mut msg).await;
        })
    };

    let agent_task = {
        let store = store.clone();
        let bus_handle = bus.clone();
        let material = material.clone();
        spawn_queue_task!(bus, shutdown, agent_certificate::SUBJECT, agent_certificate::QUEUE, |msg| {
            agent_certificate::handle(&store, &bus_handle, &material, &mut msg).await;
        })
    };

    let revoke_task = spawn_queue_task!(bus, shutdown, revoke::SUBJECT, revoke::QUEUE, |msg| {
        revoke::handle(&mut msg).await;
    });

    let ping_task = spawn_queue_task!(bus, shutdown, scnorion_ca::PING_SUBJECT, user_certificate::QUEUE, |msg| {
        scnorion_supervisor::ping::handle(&mut msg).await;
    });

    tracing::info!("cert manager worker is ready");
    let _ = tokio::join!(user_task, agent_task, revoke_task, ping_task);

    supervisor.begin_draining();
    supervisor.stop();
    tracing::info!("cert manager worker has been shutdown");
}

/// Redacts the credentials portion of a Postgres URL before it lands in
/// `config.ini`, which external tooling may read without the same access
/// controls as the process environment.
fn mask_host(dburl: &str) -> String {
    match dburl.rsplit_once('@') {
        Some((_, host_and_db)) => host_and_db.to_owned(),
        None => dburl.to_owned(),
    }
}
