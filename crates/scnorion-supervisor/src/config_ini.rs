//! The cert-manager role keeps a secondary INI-formatted copy of its
//! active configuration on disk, so operators and external tooling can
//! inspect the CA's current settings without having to parse structured
//! logs or query the database directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ConfigIniError {
    #[error("ini error: {0}")]
    Ini(#[from] ini::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct CaConfigSnapshot {
    pub nats_url: String,
    pub database_host_masked: String,
    pub pidfile: String,
}

/// Regenerates `config.ini` under `dir` from the worker's live
/// configuration. Called once at startup and again whenever the
/// supervisor reconnects, so the file always reflects what the running
/// process is actually using rather than what was passed at launch.
pub fn regenerate(dir: &Path, snapshot: &CaConfigSnapshot) -> Result<(), ConfigIniError> {
    let mut conf = Ini::new();
    conf.with_section(Some("bus"))
        .set("url", snapshot.nats_url.clone());
    conf.with_section(Some("database"))
        .set("host", snapshot.database_host_masked.clone());
    conf.with_section(Some("process"))
        .set("pidfile", snapshot.pidfile.clone());

    std::fs::create_dir_all(dir)?;
    conf.write_to_file(dir.join("config.ini"))?;
    Ok(())
}

/// Interval between regeneration attempts, matching `StartGenerateWorkerConfigJob`'s
/// one-minute cadence in the source this role is ported from.
const REGENERATION_INTERVAL: Duration = Duration::from_secs(60);

/// Retries [`regenerate`] on a fixed interval until it succeeds, then exits
/// for good. Exists because the cert-manager role may come up before its
/// config directory is mounted by configuration management; once the
/// directory is there, there's nothing left for this job to do.
pub async fn run_config_regeneration_job(dir: PathBuf, snapshot: CaConfigSnapshot) {
    let mut interval = tokio::time::interval(REGENERATION_INTERVAL);
    loop {
        interval.tick().await;
        match regenerate(&dir, &snapshot) {
            Ok(()) => {
                info!("worker's config has been successfully generated");
                return;
            }
            Err(e) => error!(error = %e, "could not generate config for worker"),
        }
    }
}
