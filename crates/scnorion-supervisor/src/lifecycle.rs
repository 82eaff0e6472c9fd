use std::path::Path;
use std::sync::Arc;

use scnorion_bus::{Bus, NatsBus};
use scnorion_store::{PgStore, Store};
use tracing::info;

use crate::config::{WorkerConfig, PIDFILE_NAME};
use crate::pidfile;
use crate::retry::connect_with_retry;
use crate::signals::shutdown_signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Init,
    ConfiguringFromCli,
    ConnectingDb,
    ConnectingBus,
    Subscribed,
    Draining,
    Stopped,
}

/// Assembles the store and bus connections every worker role needs, and
/// carries the stage through startup so logs make the sequence legible.
/// Deliberately not a single wide `Worker` struct: role-specific handler
/// state is built by the caller from these handles rather than living
/// inside the supervisor.
pub struct WorkerHandles {
    pub store: Arc<dyn Store>,
    pub bus: Arc<dyn Bus>,
    pub shutdown: tokio::sync::watch::Receiver<bool>,
}

pub struct Supervisor {
    stage: LifecycleStage,
    config: WorkerConfig,
}

impl Supervisor {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            stage: LifecycleStage::Init,
            config,
        }
    }

    pub fn stage(&self) -> LifecycleStage {
        self.stage
    }

    /// Connects store and bus (retrying indefinitely on failure), writes
    /// the pidfile, and installs the shutdown signal handler. Returns the
    /// handles a role-specific main loop subscribes with.
    pub async fn start(&mut self) -> WorkerHandles {
        self.stage = LifecycleStage::ConfiguringFromCli;

        self.stage = LifecycleStage::ConnectingDb;
        let database_url = self.config.dburl.clone();
        let store: Arc<dyn Store> = connect_with_retry("postgres", || {
            let database_url = database_url.clone();
            async move { PgStore::connect(&database_url).await.map(|s| Arc::new(s) as Arc<dyn Store>) }
        })
        .await;

        self.stage = LifecycleStage::ConnectingBus;
        let nats_url = self.config.nats_url();
        let client_cert = self.config.cert.clone();
        let client_key = self.config.key.clone();
        let ca_cert = self.config.cacert.clone();
        let bus: Arc<dyn Bus> = connect_with_retry("nats", || {
            let nats_url = nats_url.clone();
            let client_cert = client_cert.clone();
            let client_key = client_key.clone();
            let ca_cert = ca_cert.clone();
            async move {
                NatsBus::connect_with_mtls(&nats_url, &client_cert, &client_key, &ca_cert)
                    .await
                    .map(NatsBus::into_bus)
            }
        })
        .await;

        pidfile::write(Path::new(PIDFILE_NAME)).expect("failed to write pidfile");
        info!(pidfile = PIDFILE_NAME, "wrote pidfile");

        let shutdown = shutdown_signal();
        self.stage = LifecycleStage::Subscribed;

        WorkerHandles { store, bus, shutdown }
    }

    pub fn begin_draining(&mut self) {
        self.stage = LifecycleStage::Draining;
    }

    pub fn stop(&mut self) {
        pidfile::remove(Path::new(PIDFILE_NAME));
        self.stage = LifecycleStage::Stopped;
    }
}
